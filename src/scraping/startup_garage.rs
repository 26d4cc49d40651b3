use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{base, SourceScraper};
use crate::config::{SourceConfig, STARTUP_GARAGE};
use crate::models::{Category, Event, Location};
use crate::normalize;

static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h4").expect("garage heading selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("garage paragraph selector"));
static RSVP_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="eventbrite"], a[href*="event"]"#).expect("garage rsvp selector")
});

static SERIES_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)speaker series|workshop").expect("garage title regex"));
static MONTH_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)")
        .expect("garage month regex")
});
// The page often runs the day into the time with no separator
// ("March 46:30pm" is March 4, 6:30pm; "February 116:30pm" is the 11th).
// Day-vs-time is settled by which split leaves a valid clock reading.
static TWO_DIGIT_DAY_BEFORE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s(\d{2})[1-9]:\d{2}\s*(?:am|pm)").expect("garage two-digit day regex")
});
static PLAIN_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(\d{1,2})(\s|,|$)").expect("garage plain day regex"));
static SINGLE_DAY_BEFORE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s(\d)\d{1,2}:\d{2}\s*(?:am|pm)").expect("garage single day regex")
});
// Hour capped at 12 so the day digits are never mistaken for the hour.
static TIME_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(1[0-2]|[1-9]):(\d{2})\s*(am|pm)\s*-\s*\d{1,2}:\d{2}\s*(?:am|pm)")
        .expect("garage time range regex")
});
static SINGLE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(1[0-2]|[1-9]):(\d{2})\s*(am|pm)").expect("garage single time regex")
});
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+[\w\s\.]+(?:Ave|St|Blvd|Dr|Rd)[\w\s\.]*),?\s*Grand Rapids,?\s*MI\s*(\d{5})")
        .expect("garage address regex")
});
static FALLBACK_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:speaker series|workshop):[^\n]+").expect("garage fallback title regex")
});
static FALLBACK_DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\n([A-Z][^\n]+(?:\n[^\n]+){0,3})").expect("garage fallback description regex")
});

const KNOWN_VENUES: [(&str, &str, &str); 3] = [
    ("Calvin School of Business", "Calvin School of Business", "1810 E Beltline Ave SE"),
    ("Grace Christian University", "Grace Christian University", "1011 Aldon St SW"),
    ("Cornerstone University", "Cornerstone University", "1001 E Beltline Ave NE"),
];

pub struct StartupGarage;

impl SourceScraper for StartupGarage {
    fn config(&self) -> &'static SourceConfig {
        &STARTUP_GARAGE
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(STARTUP_GARAGE.url)?;
        self.parse_document(&html, Local::now().year())
    }
}

impl StartupGarage {
    pub(crate) fn parse_document(&self, html: &str, current_year: i32) -> Result<Vec<Event>> {
        let document = Html::parse_document(html);
        let scraped_at = Utc::now().to_rfc3339();
        let mut events = Vec::new();

        for heading in document.select(&HEADING_SELECTOR) {
            let title = base::inner_text(heading);
            if title.len() < 3 || !SERIES_TITLE_RE.is_match(&title) {
                continue;
            }

            let block = heading_block(&heading);
            let block_text = if block.is_empty() {
                heading
                    .parent()
                    .and_then(ElementRef::wrap)
                    .map(base::inner_text)
                    .unwrap_or_default()
            } else {
                block
                    .iter()
                    .map(|element| base::inner_text(*element))
                    .collect::<Vec<_>>()
                    .join(" ")
            };

            let date = match parse_block_date(&block_text, current_year) {
                Some(date) => date,
                None => continue,
            };
            let time = parse_block_time(&block_text);

            let description = block
                .iter()
                .find_map(|element| base::first_text(element, &PARAGRAPH_SELECTOR))
                .unwrap_or_default();
            let description = if description.is_empty() {
                format!("Startup Garage event: {title}")
            } else {
                description
            };

            let url = rsvp_link(&block).unwrap_or_else(|| STARTUP_GARAGE.url.to_string());
            let (location_name, address) = resolve_venue(&block_text);

            events.push(Event {
                id: normalize::generate_event_id(STARTUP_GARAGE.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                category: Some(categorize(&title)),
                is_recurring: false,
                is_free: true,
                location: Location {
                    name: location_name,
                    address,
                    city: "Grand Rapids".to_string(),
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
                source: STARTUP_GARAGE.id.to_string(),
                scraped_at: scraped_at.clone(),
            });
        }

        // Markup changes have flattened the headings before; fall back to
        // carving the raw page text into title/RSVP blocks.
        if events.is_empty() {
            events = self.parse_full_text(&document, current_year, &scraped_at);
        }

        Ok(base::dedupe_by(events, |event| {
            (event.title.clone(), event.date.clone())
        }))
    }

    fn parse_full_text(
        &self,
        document: &Html,
        current_year: i32,
        scraped_at: &str,
    ) -> Vec<Event> {
        let full_text: String = document.root_element().text().collect();
        let mut events = Vec::new();

        for title_match in FALLBACK_TITLE_RE.find_iter(&full_text) {
            let title = normalize::clean_text(title_match.as_str());
            let start = title_match.start();
            let end = match full_text[start..].find("RSVP") {
                Some(offset) => start + offset + 20,
                None => start + 800,
            };
            let block_text = slice_at_char_boundary(&full_text, start, end);

            let date = match parse_block_date(block_text, current_year) {
                Some(date) => date,
                None => continue,
            };
            let time = parse_block_time(block_text);
            let (location_name, address) = resolve_venue(block_text);

            let description = FALLBACK_DESCRIPTION_RE
                .captures(block_text)
                .map(|caps| {
                    let text: String = caps[1].replace('\n', " ").chars().take(500).collect();
                    normalize::clean_text(&text)
                })
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("Startup Garage event: {title}"));

            events.push(Event {
                id: normalize::generate_event_id(STARTUP_GARAGE.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                category: Some(categorize(&title)),
                is_recurring: false,
                is_free: true,
                location: Location {
                    name: location_name,
                    address,
                    city: "Grand Rapids".to_string(),
                    state: "MI".to_string(),
                    zip: None,
                    lat: None,
                    lng: None,
                },
                title,
                description,
                date,
                time,
                url: STARTUP_GARAGE.url.to_string(),
                source: STARTUP_GARAGE.id.to_string(),
                scraped_at: scraped_at.to_string(),
            });
        }

        events
    }
}

/// Sibling elements between this heading and the next one.
fn heading_block<'a>(heading: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut block = Vec::new();
    for sibling in heading.next_siblings() {
        if let Some(element) = ElementRef::wrap(sibling) {
            if element.value().name() == "h4" {
                break;
            }
            block.push(element);
        }
    }
    block
}

fn parse_block_date(text: &str, current_year: i32) -> Option<String> {
    let month_match = MONTH_NAME_RE.find(text)?;
    let month = normalize::month_number(month_match.as_str())?;
    let after_month = &text[month_match.end()..];

    let day_str = TWO_DIGIT_DAY_BEFORE_TIME_RE
        .captures(after_month)
        .map(|caps| caps[1].to_string())
        .or_else(|| {
            PLAIN_DAY_RE
                .captures(after_month)
                .map(|caps| caps[1].to_string())
        })
        .or_else(|| {
            SINGLE_DAY_BEFORE_TIME_RE
                .captures(after_month)
                .map(|caps| caps[1].to_string())
        })?;

    let day = day_str.parse::<u32>().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(current_year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn parse_block_time(text: &str) -> String {
    if let Some(caps) = TIME_RANGE_RE.captures(text) {
        return normalize::parse_time(&format!("{}:{} {}", &caps[1], &caps[2], &caps[3]));
    }
    if let Some(caps) = SINGLE_TIME_RE.captures(text) {
        return normalize::parse_time(&format!("{}:{} {}", &caps[1], &caps[2], &caps[3]));
    }
    "TBD".to_string()
}

fn rsvp_link(block: &[ElementRef<'_>]) -> Option<String> {
    for element in block {
        for link in element.select(&RSVP_LINK_SELECTOR) {
            let href = link.value().attr("href").unwrap_or("");
            if href.is_empty() {
                continue;
            }
            let text = base::inner_text(link).to_lowercase();
            if href.contains("eventbrite") || (href.contains("startupgarage") && text.contains("rsvp"))
            {
                return base::absolute_url(STARTUP_GARAGE.url, Some(href.to_string()));
            }
        }
    }
    None
}

fn resolve_venue(block_text: &str) -> (String, Option<String>) {
    for (needle, name, address) in KNOWN_VENUES {
        if block_text.to_lowercase().contains(&needle.to_lowercase()) {
            return (name.to_string(), Some(address.to_string()));
        }
    }
    if let Some(caps) = ADDRESS_RE.captures(block_text) {
        let address = normalize::clean_text(&caps[1]);
        let name = if address.is_empty() {
            "Grand Rapids".to_string()
        } else {
            address.clone()
        };
        return (name, Some(address));
    }
    ("Grand Rapids".to_string(), None)
}

fn categorize(title: &str) -> Category {
    let upper = title.to_uppercase();
    if upper.contains("WORKSHOP") {
        return Category::Workshop;
    }
    if upper.contains("PITCH") {
        return Category::Pitch;
    }
    Category::Other
}

fn slice_at_char_boundary(text: &str, start: usize, end: usize) -> &str {
    let mut end = end.min(text.len());
    while end > start && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[start..end]
}
