use anyhow::Result;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{base, SourceScraper};
use crate::classify;
use crate::config::{SourceConfig, GR_JUNIOR_CHAMBER};
use crate::models::{Category, Event, Location};
use crate::normalize;

const DEFAULT_DESCRIPTION: &str =
    "Leadership development and networking event hosted by the Grand Rapids Junior Chamber";

// Wix Events widget markup; data-hook attributes are the stable handle,
// the obfuscated class names are the fallback.
static CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-hook="event-list-item"]"#).expect("junior chamber card")
});
static FALLBACK_CARD_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "li.FwdPeD",
        r#"[data-hook="events-card"]"#,
        r#"[data-testid="event-list-item"]"#,
    ]
    .iter()
    .map(|selector| Selector::parse(selector).expect("junior chamber fallback card"))
    .collect()
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-hook="ev-list-item-title"]"#).expect("junior chamber title")
});
static TITLE_CLASS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".noWi58").expect("junior chamber title class"));
static TITLE_ANY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="title"]"#).expect("junior chamber title any"));
static DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-hook="ev-list-item-description"]"#).expect("junior chamber desc")
});
static DESCRIPTION_CLASS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".aHRnBg").expect("junior chamber desc class"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-hook="date"]"#).expect("junior chamber date"));
static DATE_CLASS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".Ke8eTf").expect("junior chamber date class"));
static RSVP_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-hook="ev-rsvp-button"]"#).expect("junior chamber rsvp")
});
static EVENT_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="event"]"#).expect("junior chamber event link"));

// "Feb 12, 2026, 5:30 PM – 7:30 PM"
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})").expect("junior chamber date regex")
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(am|pm)").expect("junior chamber time regex")
});

pub struct JuniorChamber;

impl SourceScraper for JuniorChamber {
    fn config(&self) -> &'static SourceConfig {
        &GR_JUNIOR_CHAMBER
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(GR_JUNIOR_CHAMBER.url)?;
        self.parse_document(&html)
    }
}

impl JuniorChamber {
    pub(crate) fn parse_document(&self, html: &str) -> Result<Vec<Event>> {
        let document = Html::parse_document(html);
        let scraped_at = Utc::now().to_rfc3339();
        let mut events = Vec::new();

        for card in candidate_cards(&document) {
            let title = base::first_text(&card, &TITLE_SELECTOR)
                .or_else(|| base::first_text(&card, &TITLE_CLASS_SELECTOR))
                .or_else(|| base::first_text(&card, &TITLE_ANY_SELECTOR))
                .unwrap_or_default();
            if title.len() < 3 || title.len() > 300 {
                continue;
            }

            let description = base::first_text(&card, &DESCRIPTION_SELECTOR)
                .or_else(|| base::first_text(&card, &DESCRIPTION_CLASS_SELECTOR))
                .unwrap_or_default();

            let date_time_text = base::first_text(&card, &DATE_SELECTOR)
                .or_else(|| base::first_text(&card, &DATE_CLASS_SELECTOR))
                .unwrap_or_default();

            let date = match parse_full_date(&date_time_text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => continue,
            };
            let time = TIME_RE
                .captures(&date_time_text)
                .map(|caps| normalize::parse_time(&format!("{}:{} {}", &caps[1], &caps[2], &caps[3])))
                .unwrap_or_else(|| "TBD".to_string());

            let link = base::first_attr(&card, &RSVP_SELECTOR, "href")
                .or_else(|| base::first_attr(&card, &EVENT_LINK_SELECTOR, "href"))
                .unwrap_or_default();
            let url = if link.is_empty() {
                GR_JUNIOR_CHAMBER.url.to_string()
            } else {
                base::absolute_url(GR_JUNIOR_CHAMBER.url, Some(link))
                    .unwrap_or_else(|| GR_JUNIOR_CHAMBER.url.to_string())
            };

            // RSVP button wording is the paid/free signal on this widget.
            let button_text = base::first_text(&card, &RSVP_SELECTOR)
                .unwrap_or_default()
                .to_lowercase();
            let is_free = !button_text.contains("buy")
                && !button_text.contains("ticket")
                && !button_text.contains("register");

            // Category keys off the raw description; the default text only
            // backfills the record itself.
            let category = categorize(&title, &description);
            let description = if description.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                description
            };

            events.push(Event {
                id: normalize::generate_event_id(GR_JUNIOR_CHAMBER.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                category: Some(category),
                is_recurring: classify::detect_recurring_event(&title, &description, &date_time_text),
                is_free,
                location: Location {
                    name: "Grand Rapids Junior Chamber".to_string(),
                    address: Some("250 Monroe Ave NW Ste 150".to_string()),
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
                source: GR_JUNIOR_CHAMBER.id.to_string(),
                scraped_at: scraped_at.clone(),
            });
        }

        Ok(base::dedupe_by(events, |event| {
            (event.title.clone(), event.date.clone())
        }))
    }
}

fn candidate_cards<'a>(document: &'a Html) -> Vec<ElementRef<'a>> {
    let primary: Vec<ElementRef<'a>> = document.select(&CARD_SELECTOR).collect();
    if !primary.is_empty() {
        return primary;
    }
    for selector in FALLBACK_CARD_SELECTORS.iter() {
        let matches: Vec<ElementRef<'a>> = document.select(selector).collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

fn parse_full_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text)?;
    let month = normalize::month_number(&caps[1])?;
    let day = caps[2].parse::<u32>().ok()?;
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn categorize(title: &str, description: &str) -> Category {
    let text = format!("{title} {description}").to_lowercase();
    if text.contains("network")
        || text.contains("mixer")
        || text.contains("happy hour")
        || text.contains("exchange")
    {
        return Category::Networking;
    }
    if text.contains("workshop") || text.contains("training") || text.contains("leadership") {
        return Category::Workshop;
    }
    if text.contains("conference")
        || text.contains("summit")
        || text.contains("celebration")
        || text.contains("gala")
        || text.contains("awards")
    {
        return Category::Conference;
    }
    if text.contains("meetup") || text.contains("connect") {
        return Category::Meetup;
    }
    if text.contains("pitch") || text.contains("startup") || text.contains("entrepreneur") {
        return Category::Pitch;
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
    <ul>
        <li data-hook="event-list-item">
            <div data-hook="ev-list-item-title">Chamber Happy Hour: February</div>
            <div data-hook="date">Feb 12, 2026, 5:30 PM – 7:30 PM</div>
            <div data-hook="ev-list-item-description">Unwind with fellow young professionals.</div>
            <a data-hook="ev-rsvp-button" href="/event-details/happy-hour-february">RSVP</a>
        </li>
        <li data-hook="event-list-item">
            <div data-hook="ev-list-item-title">Annual Awards Gala</div>
            <div data-hook="date">Mar 20, 2026, 6:00 PM – 10:00 PM</div>
            <a data-hook="ev-rsvp-button" href="https://www.grjuniorchamber.com/gala">Buy Tickets</a>
        </li>
        <li data-hook="event-list-item">
            <div data-hook="ev-list-item-title">Chamber Happy Hour: February</div>
            <div data-hook="date">Feb 12, 2026, 5:30 PM – 7:30 PM</div>
            <a data-hook="ev-rsvp-button" href="/event-details/happy-hour-february">RSVP</a>
        </li>
    </ul>
    "#;

    #[test]
    fn parses_wix_events_and_dedupes() {
        let events = JuniorChamber
            .parse_document(SAMPLE_HTML)
            .expect("parse junior chamber html");
        assert_eq!(events.len(), 2, "repeated listing collapses by title+date");

        let first = &events[0];
        assert_eq!(first.title, "Chamber Happy Hour: February");
        assert_eq!(first.date, "2026-02-12");
        assert_eq!(first.time, "5:30 PM");
        assert_eq!(first.start_date_time, "2026-02-12T17:30:00");
        assert_eq!(first.category, Some(Category::Networking));
        assert!(first.is_free);
        assert_eq!(
            first.url,
            "https://www.grjuniorchamber.com/event-details/happy-hour-february"
        );
        assert!(
            first.is_recurring,
            "the happy hour series title is a known recurring event"
        );

        let second = &events[1];
        assert_eq!(second.title, "Annual Awards Gala");
        assert!(!second.is_free, "ticket wording on the button marks it paid");
        assert_eq!(second.description, DEFAULT_DESCRIPTION);
        assert_eq!(second.category, Some(Category::Conference));
    }
}
