use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{base, SourceScraper};
use crate::classify;
use crate::config::{SourceConfig, GRAND_RAPIDS_ORG};
use crate::models::{Category, Event, Location};
use crate::normalize;

static CARD_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".event",
        ".event-item",
        ".event-card",
        r#"[class*="event-"]"#,
        ".listing-item",
        "article.event",
        ".tribe-events-calendar-list__event",
    ]
    .iter()
    .map(|selector| Selector::parse(selector).expect("chamber card selector"))
    .collect()
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h2, h3, h4, .event-title, .title, [itemprop="name"]"#)
        .expect("chamber title")
});
static DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"p, .description, .event-description, [itemprop="description"]"#)
        .expect("chamber description")
});
static START_DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[itemprop="startDate"]"#).expect("chamber start date"));
static DATETIME_ATTR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[datetime]").expect("chamber datetime attr"));
static DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".date, time, [class*="date"]"#).expect("chamber date")
});
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#".time, [class*="time"]"#).expect("chamber time"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("chamber link"));
static LOCATION_NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[itemprop="location"], .venue, .location-name"#).expect("chamber venue")
});
static LOCATION_ADDRESS_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[itemprop="address"], .address, .location-address"#)
        .expect("chamber address")
});

pub struct GrandRapidsOrg;

impl SourceScraper for GrandRapidsOrg {
    fn config(&self) -> &'static SourceConfig {
        &GRAND_RAPIDS_ORG
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(GRAND_RAPIDS_ORG.url)?;
        self.parse_document(&html)
    }
}

impl GrandRapidsOrg {
    pub(crate) fn parse_document(&self, html: &str) -> Result<Vec<Event>> {
        let document = Html::parse_document(html);
        let scraped_at = Utc::now().to_rfc3339();
        let mut events = Vec::new();

        for card in candidate_cards(&document) {
            let title = match base::first_text(&card, &TITLE_SELECTOR) {
                Some(title) if title.len() >= 3 => title,
                _ => continue,
            };

            let description = base::first_text(&card, &DESCRIPTION_SELECTOR).unwrap_or_default();

            let date_text = base::first_attr(&card, &START_DATE_SELECTOR, "content")
                .or_else(|| base::first_attr(&card, &DATETIME_ATTR_SELECTOR, "datetime"))
                .or_else(|| base::first_text(&card, &DATE_SELECTOR))
                .unwrap_or_default();
            let time_text = base::first_text(&card, &TIME_SELECTOR).unwrap_or_default();

            let link = base::first_attr(&card, &LINK_SELECTOR, "href")
                .or_else(|| card.value().attr("href").map(str::to_string))
                .unwrap_or_default();

            let location_name = base::first_text(&card, &LOCATION_NAME_SELECTOR).unwrap_or_default();
            let location_address =
                base::first_text(&card, &LOCATION_ADDRESS_SELECTOR).unwrap_or_default();

            let date = match normalize::parse_date(&date_text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => continue,
            };
            let time = normalize::parse_time(&time_text);

            let url = base::absolute_url(GRAND_RAPIDS_ORG.url, Some(link))
                .unwrap_or_else(|| GRAND_RAPIDS_ORG.url.to_string());

            events.push(Event {
                id: normalize::generate_event_id(GRAND_RAPIDS_ORG.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                category: Some(categorize(&title, &description)),
                is_recurring: classify::detect_recurring_event(&title, &description, &time_text),
                is_free: classify::detect_free_event(&title, &description, ""),
                location: Location {
                    name: if location_name.is_empty() {
                        "Grand Rapids".to_string()
                    } else {
                        location_name
                    },
                    address: if location_address.is_empty() {
                        None
                    } else {
                        Some(location_address)
                    },
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
                source: GRAND_RAPIDS_ORG.id.to_string(),
                scraped_at: scraped_at.clone(),
            });
        }

        Ok(events)
    }
}

fn candidate_cards<'a>(document: &'a Html) -> Vec<ElementRef<'a>> {
    for selector in CARD_SELECTORS.iter() {
        let matches: Vec<ElementRef<'a>> = document.select(selector).collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

fn categorize(title: &str, description: &str) -> Category {
    let text = format!("{title} {description}").to_lowercase();
    if text.contains("network") || text.contains("mixer") {
        return Category::Networking;
    }
    if text.contains("workshop") || text.contains("training") {
        return Category::Workshop;
    }
    if text.contains("conference") || text.contains("summit") {
        return Category::Conference;
    }
    if text.contains("meetup") {
        return Category::Meetup;
    }
    if text.contains("pitch") || text.contains("startup") {
        return Category::Pitch;
    }
    Category::Other
}
