use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One canonical event, shared by every source. Field names follow the
/// persisted JSON contract consumed by the display layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String, // stable slug: source-title-date
    pub title: String,
    pub description: String,
    pub date: String, // YYYY-MM-DD
    pub time: String, // "H:MM AM/PM" or "TBD"
    pub start_date_time: String,
    pub location: Location,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub is_recurring: bool,
    pub is_free: bool,
    pub scraped_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Location {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Networking,
    Workshop,
    Conference,
    Meetup,
    Pitch,
    Other,
}

/// Static reference data for one origin site, serialized into the
/// dataset's per-source report.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    pub color: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    #[serde(flatten)]
    pub source: SourceInfo,
    pub event_count: usize,
    pub last_scraped: String,
}

/// Per-source outcome. One source failing never blocks the others; the
/// failure rides along here instead.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub source: String,
    pub events: Vec<Event>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scraped_at: String,
}

/// The persisted artifact and sole hand-off to the display layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RunDataset {
    pub events: Vec<Event>,
    pub last_scraped: String,
    pub sources: BTreeMap<String, SourceReport>,
}
