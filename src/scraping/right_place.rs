use std::collections::HashSet;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{base, SourceScraper};
use crate::classify;
use crate::config::{SourceConfig, RIGHT_PLACE};
use crate::models::{Category, Event, Location};
use crate::normalize;

const DEFAULT_DESCRIPTION: &str =
    "Business and economic development event hosted by The Right Place.";

static EVENT_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/events/"]"#).expect("right place link"));
static H3_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("right place h3"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("right place paragraph"));

static PAGINATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/events/p\d+").expect("right place pagination regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2})(?:–\d{1,2})?,?\s+(\d{4})")
        .expect("right place date regex")
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(AM|PM)").expect("right place time regex")
});
static VENUE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(Frederik Meijer Gardens)",
        r"(?i)(Amway Grand Plaza)",
        r"(?i)(JW Marriott Grand Rapids)",
        r"(?i)(Bamboo Grand Rapids)",
        r"(?i)(DeVos Place)",
        r"(?i)(GVSU)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("right place venue regex"))
    .collect()
});

const NAV_TITLES: [&str; 8] = [
    "Events",
    "News",
    "Contact",
    "About Us",
    "Home",
    "Upcoming Events",
    "Past Events",
    "Filter",
];
const CONTAINER_TAGS: [&str; 4] = ["div", "article", "section", "li"];
const WIDE_CONTAINER_TAGS: [&str; 3] = ["div", "article", "section"];

pub struct RightPlace;

impl SourceScraper for RightPlace {
    fn config(&self) -> &'static SourceConfig {
        &RIGHT_PLACE
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(RIGHT_PLACE.url)?;
        self.parse_document(&html)
    }
}

impl RightPlace {
    pub(crate) fn parse_document(&self, html: &str) -> Result<Vec<Event>> {
        let document = Html::parse_document(html);
        let scraped_at = Utc::now().to_rfc3339();
        let mut seen_links: HashSet<String> = HashSet::new();
        let mut events = Vec::new();

        for link in document.select(&EVENT_LINK_SELECTOR) {
            let href = link.value().attr("href").unwrap_or("").to_string();
            if href.is_empty()
                || href == "/events"
                || href == "/events/"
                || href.ends_with("/events")
            {
                continue;
            }
            if seen_links.contains(&href) {
                continue;
            }
            if PAGINATION_RE.is_match(&href) {
                continue;
            }

            let full_url = base::absolute_url(RIGHT_PLACE.url, Some(href.clone()))
                .unwrap_or_else(|| RIGHT_PLACE.url.to_string());

            let container = event_container(&link);
            let container_text = container
                .map(|element| base::inner_text(element))
                .unwrap_or_default();

            let mut title = base::first_text(&link, &H3_SELECTOR)
                .or_else(|| container.and_then(|element| base::first_text(&element, &H3_SELECTOR)))
                .unwrap_or_else(|| base::inner_text(link));
            if title.len() < 5 {
                continue;
            }
            if title.len() > 200 {
                title = title.chars().take(200).collect();
            }
            if NAV_TITLES.contains(&title.as_str()) {
                continue;
            }
            if title.starts_with("View ") || title.contains("Sponsorship") {
                continue;
            }

            let date = match parse_container_date(&container_text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => continue,
            };
            if container_text.to_lowercase().contains("past event") {
                continue;
            }

            let time = TIME_RE
                .captures(&container_text)
                .map(|caps| normalize::parse_time(&format!("{}:{} {}", &caps[1], &caps[2], &caps[3])))
                .unwrap_or_else(|| "TBD".to_string());

            let description = container
                .and_then(|element| base::first_text(&element, &PARAGRAPH_SELECTOR))
                .unwrap_or_default();

            let location_text = venue_from_text(&container_text);

            seen_links.insert(href);

            let category = categorize(&title, &description);
            let description = if description.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                description
            };

            events.push(Event {
                id: normalize::generate_event_id(RIGHT_PLACE.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                category: Some(category),
                is_recurring: classify::detect_recurring_event(&title, &description, &container_text),
                is_free: classify::detect_free_event(&title, &description, &container_text),
                location: Location {
                    name: if location_text.is_empty() {
                        "The Right Place".to_string()
                    } else {
                        location_text
                    },
                    address: Some("25 Ottawa Ave SW, Suite 400".to_string()),
                    city: "Grand Rapids".to_string(),
                    state: "MI".to_string(),
                    zip: Some("49503".to_string()),
                    lat: None,
                    lng: None,
                },
                title,
                description,
                date,
                time,
                url: full_url,
                source: RIGHT_PLACE.id.to_string(),
                scraped_at: scraped_at.clone(),
            });
        }

        Ok(base::dedupe_by(events, |event| {
            (event.title.clone(), event.date.clone())
        }))
    }
}

/// Nearest enclosing card-like element; widened one level when the match
/// is too small to hold the event details.
fn event_container<'a>(link: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let container = closest(link, &CONTAINER_TAGS)?;
    if base::inner_text(container).len() >= 50 {
        return Some(container);
    }
    closest(&container, &WIDE_CONTAINER_TAGS).or(Some(container))
}

fn closest<'a>(element: &ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    for node in element.ancestors() {
        if let Some(candidate) = ElementRef::wrap(node) {
            if tags.contains(&candidate.value().name()) {
                return Some(candidate);
            }
        }
    }
    None
}

fn parse_container_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text)?;
    let month = normalize::month_number(&caps[1])?;
    let day = caps[2].parse::<u32>().ok()?;
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn venue_from_text(text: &str) -> String {
    for pattern in VENUE_RES.iter() {
        if let Some(caps) = pattern.captures(text) {
            return normalize::clean_text(&caps[1]);
        }
    }
    if text.contains("TBD") {
        return "TBD".to_string();
    }
    String::new()
}

fn categorize(title: &str, description: &str) -> Category {
    let text = format!("{title} {description}").to_lowercase();
    if text.contains("network")
        || text.contains("mixer")
        || text.contains("coffee")
        || text.contains("exchange")
    {
        return Category::Networking;
    }
    if text.contains("workshop")
        || text.contains("training")
        || text.contains("candid conversation")
    {
        return Category::Workshop;
    }
    if text.contains("conference")
        || text.contains("summit")
        || text.contains("forum")
        || text.contains("outlook")
    {
        return Category::Conference;
    }
    if text.contains("meetup") || text.contains("connect") {
        return Category::Meetup;
    }
    if text.contains("pitch") || text.contains("startup") || text.contains("entrepreneur") {
        return Category::Pitch;
    }
    if text.contains("developer") || text.contains("tech") || text.contains("go beyond") {
        return Category::Workshop;
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
    <div class="events-grid">
        <div class="event-card">
            <a href="/events/economic-outlook-2026">
                <h3>West Michigan Economic Outlook</h3>
            </a>
            <span class="event-date">February 12, 2026</span>
            <span class="event-time">7:30AM–10:00AM</span>
            <span class="event-venue">JW Marriott Grand Rapids</span>
            <p>The region's annual look ahead with economists and industry leaders.</p>
        </div>
        <div class="event-card">
            <a href="/events/economic-outlook-2026">
                <h3>West Michigan Economic Outlook</h3>
            </a>
            <span class="event-date">February 12, 2026</span>
        </div>
        <div class="event-card">
            <a href="/events/leadership-retreat">
                <h3>Leadership Retreat</h3>
            </a>
            <span>Past Event - March 3, 2025</span>
        </div>
        <a href="/events/">All events</a>
        <a href="/events/p2">Next page</a>
    </div>
    "#;

    #[test]
    fn parses_event_detail_links() {
        let events = RightPlace
            .parse_document(SAMPLE_HTML)
            .expect("parse right place html");
        assert_eq!(
            events.len(),
            1,
            "duplicate links, past events, and navigation links drop out"
        );

        let event = &events[0];
        assert_eq!(event.title, "West Michigan Economic Outlook");
        assert_eq!(event.date, "2026-02-12");
        assert_eq!(event.time, "7:30 AM");
        assert_eq!(event.start_date_time, "2026-02-12T07:30:00");
        assert_eq!(event.category, Some(Category::Conference));
        assert_eq!(event.location.name, "JW Marriott Grand Rapids");
        assert_eq!(
            event.url,
            "https://www.rightplace.org/events/economic-outlook-2026"
        );
        assert_eq!(
            event.description,
            "The region's annual look ahead with economists and industry leaders."
        );
    }

    #[test]
    fn date_ranges_use_the_first_day() {
        assert_eq!(
            parse_container_date("RevConnect March 3–4, 2026 at DeVos Place"),
            NaiveDate::from_ymd_opt(2026, 3, 3)
        );
    }
}
