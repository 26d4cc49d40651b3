use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{base, SourceScraper};
use crate::classify;
use crate::config::{SourceConfig, START_GARDEN};
use crate::models::{Event, Location};
use crate::normalize;

// Tried in priority order until one yields candidates; the site has
// cycled through several markup generations.
static CARD_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".event",
        ".event-item",
        ".event-card",
        r#"[class*="event-"]"#,
        ".tribe-events-calendar-list__event",
        "article",
    ]
    .iter()
    .map(|selector| Selector::parse(selector).expect("start garden card selector"))
    .collect()
});
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, .title").expect("start garden heading"));
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, .event-title, .title").expect("start garden title")
});
static DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, .description, .event-description, .excerpt").expect("start garden desc")
});
static DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".date, time, [class*="date"], .event-date"#).expect("start garden date")
});
static DATETIME_ATTR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[datetime]").expect("start garden datetime attr"));
static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".time, [class*="time"], .event-time"#).expect("start garden time")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("start garden link"));
static LOCATION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".location, .venue, [class*="location"], .event-location"#)
        .expect("start garden location")
});

pub struct StartGarden;

impl SourceScraper for StartGarden {
    fn config(&self) -> &'static SourceConfig {
        &START_GARDEN
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(START_GARDEN.url)?;
        self.parse_document(&html)
    }
}

impl StartGarden {
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
            let date_text = base::first_text(&card, &DATE_SELECTOR)
                .or_else(|| base::first_attr(&card, &DATETIME_ATTR_SELECTOR, "datetime"))
                .unwrap_or_default();
            let time_text = base::first_text(&card, &TIME_SELECTOR).unwrap_or_default();
            let link = base::first_attr(&card, &LINK_SELECTOR, "href")
                .or_else(|| ancestor_link(&card))
                .unwrap_or_default();
            let location_text = base::first_text(&card, &LOCATION_SELECTOR).unwrap_or_default();

            let date = match normalize::parse_date(&date_text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => continue,
            };
            let time = normalize::parse_time(&time_text);

            let url = base::absolute_url(START_GARDEN.url, Some(link.clone()))
                .unwrap_or_else(|| START_GARDEN.url.to_string());

            events.push(Event {
                id: normalize::generate_event_id(START_GARDEN.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                is_recurring: classify::detect_recurring_event(&title, &description, &time_text),
                is_free: classify::detect_free_event(&title, &description, ""),
                location: Location {
                    name: if location_text.is_empty() {
                        "Start Garden".to_string()
                    } else {
                        location_text
                    },
                    address: Some("40 Pearl St NW".to_string()),
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
                url,
                source: START_GARDEN.id.to_string(),
                category: None,
                scraped_at: scraped_at.clone(),
            });
        }

        Ok(events)
    }
}

fn candidate_cards<'a>(document: &'a Html) -> Vec<ElementRef<'a>> {
    for selector in CARD_SELECTORS.iter() {
        let matches: Vec<ElementRef<'a>> = document
            .select(selector)
            .filter(|card| card.select(&HEADING_SELECTOR).next().is_some())
            .collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

fn ancestor_link(card: &ElementRef<'_>) -> Option<String> {
    for node in card.ancestors() {
        if let Some(element) = ElementRef::wrap(node) {
            if element.value().name() == "a" {
                return element.value().attr("href").map(str::to_string);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
    <div class="event-card">
        <h3 class="event-title">Pitch Night</h3>
        <p class="event-description">Five founders, five minutes each. Free event with refreshments.</p>
        <span class="event-date">Mar 4, 2026</span>
        <span class="event-time">6:30pm</span>
        <span class="event-location">Start Garden</span>
        <a href="/events/pitch-night">Details</a>
    </div>
    <div class="event-card">
        <h3 class="event-title">Untitled Placeholder</h3>
        <span class="event-date">sometime soon</span>
    </div>
    "#;

    #[test]
    fn parses_start_garden_events() {
        let events = StartGarden
            .parse_document(SAMPLE_HTML)
            .expect("parse start garden html");
        assert_eq!(events.len(), 1, "undated candidates drop out");

        let event = &events[0];
        assert_eq!(event.title, "Pitch Night");
        assert_eq!(event.date, "2026-03-04");
        assert_eq!(event.time, "6:30 PM");
        assert_eq!(event.start_date_time, "2026-03-04T18:30:00");
        assert_eq!(event.url, "https://startgarden.com/events/pitch-night");
        assert_eq!(event.location.name, "Start Garden");
        assert_eq!(event.location.address.as_deref(), Some("40 Pearl St NW"));
        assert!(event.is_free);
        assert!(!event.is_recurring);
        assert!(event.category.is_none());
        assert_eq!(
            event.id,
            "start-garden-pitch-night-2026-03-04"
        );
    }

    #[test]
    fn empty_page_yields_no_events() {
        let events = StartGarden
            .parse_document("<html><body><p>Nothing here</p></body></html>")
            .expect("parse empty html");
        assert!(events.is_empty());
    }
}
