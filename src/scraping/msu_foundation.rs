use std::collections::HashSet;

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{base, SourceScraper};
use crate::classify;
use crate::config::{SourceConfig, MSU_FOUNDATION};
use crate::models::{Event, Location};
use crate::normalize;

// The events calendar is an embedded Elfsight widget; its boot endpoint
// serves the structured data the page renders from.
const WIDGET_ID: &str = "b3ad2fe6-b56f-4b93-a321-654a85c4427b";
const BOOT_URL: &str = "https://core.service.elfsight.com/p/boot/";

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("iso date regex"));

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiEvent {
    name: String,
    start: EventStart,
    description: String,
    location: Vec<String>,
    #[serde(rename = "buttonLink")]
    button_link: ButtonLink,
    #[serde(rename = "buttonText")]
    button_text: String,
    #[serde(rename = "repeatPeriod")]
    repeat_period: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventStart {
    date: String,
    time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ButtonLink {
    value: String,
}

pub struct MsuFoundation;

impl SourceScraper for MsuFoundation {
    fn config(&self) -> &'static SourceConfig {
        &MSU_FOUNDATION
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let url = reqwest::Url::parse_with_params(
            BOOT_URL,
            [("page", MSU_FOUNDATION.url), ("w", WIDGET_ID)],
        )?;
        let payload: Value = base::fetch_json(url.as_str())?;
        self.parse_payload(&payload, Local::now().date_naive())
    }
}

impl MsuFoundation {
    pub(crate) fn parse_payload(&self, payload: &Value, today: NaiveDate) -> Result<Vec<Event>> {
        let widget_data = payload
            .pointer(&format!("/data/widgets/{WIDGET_ID}/data"))
            .and_then(|data| data.get("settings"));

        let api_events = match widget_data.and_then(|settings| settings.get("events")) {
            Some(Value::Array(events)) => events,
            _ => return Ok(Vec::new()),
        };
        let location_settings = widget_data
            .and_then(|settings| settings.get("locations"))
            .cloned()
            .unwrap_or(Value::Null);

        let scraped_at = Utc::now().to_rfc3339();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut events = Vec::new();

        for item in api_events {
            let api_event: ApiEvent = match serde_json::from_value(item.clone()) {
                Ok(api_event) => api_event,
                Err(_) => continue,
            };

            let title = normalize::clean_text(&api_event.name);
            if title.len() < 3 {
                continue;
            }

            let date = api_event.start.date.clone();
            if !ISO_DATE_RE.is_match(&date) {
                continue;
            }
            let event_date = match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
                Ok(event_date) => event_date,
                Err(_) => continue,
            };
            if event_date < today {
                continue;
            }

            if !seen.insert((title.clone(), date.clone())) {
                continue;
            }

            let time = format_start_time(&api_event.start.time);
            let description =
                normalize::clean_text(&normalize::decode_entities(&api_event.description));
            let location = location_from_ids(&api_event.location, &location_settings);

            let url = if api_event.button_link.value.is_empty() {
                MSU_FOUNDATION.url.to_string()
            } else {
                api_event.button_link.value.clone()
            };

            let button_text = api_event.button_text.to_lowercase();
            let is_free = classify::detect_free_event(&title, &description, "")
                || title.to_lowercase().contains("office hours")
                || description.to_lowercase().contains("free")
                || button_text.contains("register")
                || button_text.contains("learn more");

            events.push(Event {
                id: normalize::generate_event_id(MSU_FOUNDATION.id, &title, &date),
                start_date_time: normalize::to_iso_datetime(&date, &time),
                category: Some(classify::categorize(&title, &description)),
                is_recurring: api_event.repeat_period != "noRepeat",
                is_free,
                title,
                description,
                date,
                time,
                location,
                url,
                source: MSU_FOUNDATION.id.to_string(),
                scraped_at: scraped_at.clone(),
            });
        }

        Ok(events)
    }
}

// Widget times are 24-hour "HH:MM"; empty means unannounced.
fn format_start_time(raw: &str) -> String {
    if raw.is_empty() {
        return "TBD".to_string();
    }
    let mut parts = raw.splitn(3, ':');
    let hour = parts
        .next()
        .unwrap_or("")
        .parse::<u32>()
        .unwrap_or(0);
    let minute = parts.next().unwrap_or("00");
    let period = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = if hour > 12 {
        hour - 12
    } else if hour == 0 {
        12
    } else {
        hour
    };
    format!("{hour12}:{minute} {period}")
}

fn default_location() -> Location {
    Location {
        name: "MSU Research Foundation".to_string(),
        address: Some("325 E. Grand River Ave., Suite 275".to_string()),
        city: "East Lansing".to_string(),
        state: "MI".to_string(),
        zip: None,
        lat: None,
        lng: None,
    }
}

fn named_location(name: &str, address: &str, city: &str) -> Location {
    Location {
        name: name.to_string(),
        address: if address.is_empty() {
            None
        } else {
            Some(address.to_string())
        },
        city: city.to_string(),
        state: "MI".to_string(),
        zip: None,
        lat: None,
        lng: None,
    }
}

fn setting_field(setting: &Value, field: &str) -> String {
    setting
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Resolves the widget's location-id list against its location settings,
/// falling back to name-pattern inference per campus.
fn location_from_ids(ids: &[String], settings: &Value) -> Location {
    let location_id = match ids.first() {
        Some(location_id) => location_id,
        None => return default_location(),
    };

    let setting = settings.get(location_id);
    let setting = match setting {
        Some(setting) if setting.is_object() => setting,
        _ => {
            let id_lower = location_id.to_lowercase();
            if id_lower.contains("grand rapids") || id_lower.contains("bridge") {
                return named_location(
                    "The Bridge - MSU Research Foundation",
                    "109 Michigan St NW, Suite 414",
                    "Grand Rapids",
                );
            }
            if id_lower.contains("detroit") || id_lower.contains("newlab") {
                return named_location("Newlab - MSU Research Foundation", "2050 15th St.", "Detroit");
            }
            if id_lower.contains("traverse") {
                return named_location("MSU Foundation - Traverse City", "", "Traverse City");
            }
            return default_location();
        }
    };

    let name = setting_field(setting, "name");
    let value = setting_field(setting, "value");
    let address = setting_field(setting, "address");
    let display = if name.is_empty() { value.clone() } else { name.clone() };
    let venue_name = display.to_lowercase();

    if venue_name.contains("grand rapids") || venue_name.contains("bridge") {
        let label = if display.is_empty() {
            "The Bridge - MSU Research Foundation".to_string()
        } else {
            display
        };
        let address = if address.is_empty() {
            "109 Michigan St NW, Suite 414".to_string()
        } else {
            address
        };
        return named_location(&label, &address, "Grand Rapids");
    }

    if venue_name.contains("detroit") || venue_name.contains("newlab") {
        let label = if display.is_empty() {
            "Newlab - MSU Research Foundation".to_string()
        } else {
            display
        };
        let address = if address.is_empty() {
            "2050 15th St.".to_string()
        } else {
            address
        };
        return named_location(&label, &address, "Detroit");
    }

    if venue_name.contains("traverse") {
        let label = if display.is_empty() {
            "MSU Foundation - Traverse City".to_string()
        } else {
            display
        };
        return named_location(&label, &address, "Traverse City");
    }

    let fallback = default_location();
    let label = if display.is_empty() { fallback.name.clone() } else { display };
    let address = if address.is_empty() {
        fallback.address.clone().unwrap_or_default()
    } else {
        address
    };
    named_location(&label, &address, "East Lansing")
}
