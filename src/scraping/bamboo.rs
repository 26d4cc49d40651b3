use std::collections::HashSet;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{base, SourceScraper};
use crate::classify;
use crate::config::{SourceConfig, BAMBOO};
use crate::models::{Event, Location};
use crate::normalize;

static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article.cms-event").expect("bamboo card selector"));
static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[fs-cmsfilter-field="name"]"#).expect("bamboo name"));
static NAME_FALLBACK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h4.heading-xsmall").expect("bamboo name fallback"));
static TITLE_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.blog1_title-link").expect("bamboo title link"));
static LOCATION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[fs-cmsfilter-field="location"]"#).expect("bamboo location"));
static INFO_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".cms-event-card_info").expect("bamboo info"));
static TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".cms-event-card_tag").expect("bamboo tag"));
static BUTTON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".button-tertiary").expect("bamboo button"));
static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("bamboo div"));

static DATE_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]{3,9}\s+\d{1,2},?\s+\d{4}").expect("bamboo date-like regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})").expect("bamboo date regex")
});
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(am|pm)").expect("bamboo time regex"));

const NAV_TITLES: [&str; 5] = ["Events", "Filters", "View details", "Book a tour", "Contact us"];

pub struct Bamboo;

impl SourceScraper for Bamboo {
    fn config(&self) -> &'static SourceConfig {
        &BAMBOO
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(BAMBOO.url)?;
        self.parse_document(&html)
    }
}

impl Bamboo {
    pub(crate) fn parse_document(&self, html: &str) -> Result<Vec<Event>> {
        let document = Html::parse_document(html);
        let scraped_at = Utc::now().to_rfc3339();
        let mut seen_links: HashSet<String> = HashSet::new();
        let mut events = Vec::new();

        for card in document.select(&CARD_SELECTOR) {
            let title = base::first_text(&card, &NAME_SELECTOR)
                .or_else(|| base::first_text(&card, &NAME_FALLBACK_SELECTOR))
                .unwrap_or_default();
            if title.len() < 3 || title.len() > 200 {
                continue;
            }

            let link = base::first_attr(&card, &TITLE_LINK_SELECTOR, "href").unwrap_or_default();
            if !link.is_empty() && !seen_links.insert(link.clone()) {
                continue;
            }

            if NAV_TITLES.contains(&title.as_str()) {
                continue;
            }

            let location_text = base::first_text(&card, &LOCATION_SELECTOR).unwrap_or_default();
            let (venue_name, city) = parse_location_text(&location_text);

            let date_text = date_cell_text(&card);
            let date = match parse_card_date(&date_text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => continue,
            };
            let time = TIME_RE
                .captures(&date_text)
                .map(|caps| normalize::parse_time(&format!("{}:{} {}", &caps[1], &caps[2], &caps[3])))
                .unwrap_or_else(|| "TBD".to_string());

            let full_text = base::inner_text(card);
            let description = card_description(&card);

            let event_type = visible_tag_text(&card);
            let button_text = base::first_text(&card, &BUTTON_SELECTOR).unwrap_or_default();

            // Badge and button text override the shared heuristics here:
            // membership and ticket signals are explicit on this site.
            let event_type_lower = event_type.to_lowercase();
            let button_lower = button_text.to_lowercase();
            let is_free = !event_type_lower.contains("members only")
                && !event_type_lower.contains("private")
                && !button_lower.contains("get tickets")
                && !button_lower.contains("buy tickets");

            let url = if link.is_empty() {
                BAMBOO.url.to_string()
            } else {
                base::absolute_url(BAMBOO.url, Some(link.clone()))
                    .unwrap_or_else(|| BAMBOO.url.to_string())
            };

            events.push(Event {
                id: normalize::generate_event_id(BAMBOO.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                is_recurring: classify::detect_recurring_event(&title, &description, &full_text),
                is_free,
                location: Location {
                    name: venue_name,
                    address: if city == "Grand Rapids" {
                        Some("38 Commerce Ave SW".to_string())
                    } else {
                        None
                    },
                    city,
                    state: "MI".to_string(),
                    zip: None,
                    lat: None,
                    lng: None,
                },
                title,
                description,
                date,
                time,
                url,
                source: BAMBOO.id.to_string(),
                category: None,
                scraped_at: scraped_at.clone(),
            });
        }

        // Only the Grand Rapids locations belong in this dataset.
        let events = events
            .into_iter()
            .filter(|event| event.location.city.eq_ignore_ascii_case("grand rapids"))
            .collect();

        Ok(events)
    }
}

fn parse_location_text(location_text: &str) -> (String, String) {
    let lower = location_text.to_lowercase().trim().to_string();
    match lower.as_str() {
        "grand rapids" => ("Bamboo Grand Rapids".to_string(), "Grand Rapids".to_string()),
        "ann arbor" => ("Bamboo Ann Arbor".to_string(), "Ann Arbor".to_string()),
        "downtown detroit" => ("Bamboo Downtown Detroit".to_string(), "Detroit".to_string()),
        "midtown detroit" => ("Bamboo Midtown Detroit".to_string(), "Detroit".to_string()),
        "royal oak" => ("Bamboo Royal Oak".to_string(), "Royal Oak".to_string()),
        "" => ("Bamboo Cowork".to_string(), "Unknown".to_string()),
        _ => ("Bamboo Cowork".to_string(), location_text.trim().to_string()),
    }
}

// The date lives in an info cell that carries no filter-field attribute;
// the attributed cells hold the location.
fn date_cell_text(card: &ElementRef<'_>) -> String {
    for info in card.select(&INFO_SELECTOR) {
        if info.value().attr("fs-cmsfilter-field").is_some() {
            continue;
        }
        if has_class(&info, "w-condition-invisible") {
            continue;
        }
        let text = base::inner_text(info);
        if DATE_LIKE_RE.is_match(&text) {
            return text;
        }
    }
    String::new()
}

fn parse_card_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text)?;
    let month = normalize::month_number(&caps[1])?;
    let day = caps[2].parse::<u32>().ok()?;
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// Free-standing description div: unclassed, unattributed, mid-length,
// and not one of the action labels.
fn card_description(card: &ElementRef<'_>) -> String {
    let mut description = String::new();
    for div in card.select(&DIV_SELECTOR) {
        if div.value().attr("class").is_some() || div.value().attr("fs-cmsfilter-field").is_some() {
            continue;
        }
        let text = base::inner_text(div);
        if text.len() > 30
            && text.len() < 1000
            && !text.contains("RSVP")
            && !text.contains("View details")
        {
            description = text;
        }
    }
    description
}

fn visible_tag_text(card: &ElementRef<'_>) -> String {
    card.select(&TAG_SELECTOR)
        .find(|tag| !has_class(tag, "w-condition-invisible"))
        .map(|tag| base::inner_text(tag))
        .unwrap_or_default()
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element
        .value()
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}
