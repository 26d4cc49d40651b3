use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::{Event, Location};
use crate::scraping::base::USER_AGENT;
use crate::utils;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// Most events recur at a handful of venues; resolving those from this
// table keeps the external service out of the hot path entirely.
const KNOWN_VENUES: [(&str, Coordinates); 22] = [
    ("start garden", Coordinates { lat: 42.9659, lng: -85.6716 }),
    ("bamboo grand rapids", Coordinates { lat: 42.9614, lng: -85.6726 }),
    ("the bridge incubator", Coordinates { lat: 42.9636, lng: -85.6617 }),
    ("grand rapids downtown market", Coordinates { lat: 42.9679, lng: -85.6731 }),
    ("devos place", Coordinates { lat: 42.9692, lng: -85.6772 }),
    ("jw marriott grand rapids", Coordinates { lat: 42.9679, lng: -85.6766 }),
    ("msu foundation", Coordinates { lat: 42.7323, lng: -84.5555 }),
    ("bamboo ann arbor", Coordinates { lat: 42.2776, lng: -83.7409 }),
    ("bamboo royal oak", Coordinates { lat: 42.4895, lng: -83.1446 }),
    ("gr junior chamber", Coordinates { lat: 42.9634, lng: -85.6681 }),
    ("grand rapids junior chamber", Coordinates { lat: 42.9634, lng: -85.6681 }),
    ("the right place", Coordinates { lat: 42.9634, lng: -85.6732 }),
    ("right place", Coordinates { lat: 42.9634, lng: -85.6732 }),
    ("frederik meijer gardens", Coordinates { lat: 42.9797, lng: -85.5889 }),
    ("amway grand plaza", Coordinates { lat: 42.9689, lng: -85.6772 }),
    ("junior achievement", Coordinates { lat: 42.9556, lng: -85.6544 }),
    ("gvsu", Coordinates { lat: 42.9631, lng: -85.8886 }),
    ("gvsu allendale", Coordinates { lat: 42.9631, lng: -85.8886 }),
    ("calvin school of business", Coordinates { lat: 42.9242, lng: -85.5875 }),
    ("calvin university", Coordinates { lat: 42.9242, lng: -85.5875 }),
    ("grace christian university", Coordinates { lat: 42.9234, lng: -85.7056 }),
    ("cornerstone university", Coordinates { lat: 42.9875, lng: -85.5872 }),
];

/// Case-insensitive bidirectional substring match against the venue
/// table, so "Bamboo Grand Rapids - Rooftop" and "Bamboo" both resolve.
pub fn known_venue_coords(venue_name: &str) -> Option<Coordinates> {
    let normalized = venue_name.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    for (name, coords) in KNOWN_VENUES {
        if normalized.contains(name) || name.contains(&normalized) {
            return Some(coords);
        }
    }
    None
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Persistent lookup cache, keyed by normalized `address|city|state`.
/// `None` values record confirmed not-found results so they are never
/// retried; transport failures are deliberately not stored.
pub struct GeoCache {
    path: PathBuf,
    entries: BTreeMap<String, Option<Coordinates>>,
}

impl GeoCache {
    pub fn load(path: &Path) -> Self {
        let entries = fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn key(address: &str, city: &str, state: &str) -> String {
        format!("{address}|{city}|{state}").trim().to_lowercase()
    }

    pub fn get(&self, key: &str) -> Option<&Option<Coordinates>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write-through: every new entry is persisted immediately, so a
    /// crash mid-run loses at most the in-flight lookup. A failed write
    /// is logged and the cache keeps working in memory.
    pub fn insert(&mut self, key: String, value: Option<Coordinates>) {
        self.entries.insert(key, value);
        if let Err(err) = self.save() {
            warn!("failed to persist geocode cache: {err}");
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        utils::ensure_parent(&self.path);
        let contents = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// Seam for the external geocoding service; tests swap in a counter.
pub trait GeocodeService {
    fn search(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

pub struct Nominatim;

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent(USER_AGENT)
        .build()
        .expect("geocode http client")
});

impl GeocodeService for Nominatim {
    fn search(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let url = reqwest::Url::parse_with_params(
            NOMINATIM_URL,
            [("q", query), ("format", "json"), ("limit", "1")],
        )
        .map_err(|err| GeocodeError::Http(err.to_string()))?;

        let response = CLIENT
            .get(url)
            .send()
            .map_err(|err| GeocodeError::Http(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Http(format!("status {status}")));
        }

        let hits: Vec<SearchHit> = response
            .json()
            .map_err(|err| GeocodeError::Parse(err.to_string()))?;

        match hits.into_iter().next() {
            None => Ok(None),
            Some(hit) => {
                let lat = hit
                    .lat
                    .parse::<f64>()
                    .map_err(|err| GeocodeError::Parse(err.to_string()))?;
                let lng = hit
                    .lon
                    .parse::<f64>()
                    .map_err(|err| GeocodeError::Parse(err.to_string()))?;
                Ok(Some(Coordinates { lat, lng }))
            }
        }
    }
}

pub struct Geocoder<S: GeocodeService> {
    service: S,
    cache: GeoCache,
    pause: Duration,
    api_calls: usize,
}

impl<S: GeocodeService> Geocoder<S> {
    pub fn new(service: S, cache: GeoCache, pause: Duration) -> Self {
        Self {
            service,
            cache,
            pause,
            api_calls: 0,
        }
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls
    }

    /// One cached lookup. Cache hits (including cached not-found) never
    /// reach the network; transport errors resolve to no coordinates
    /// without poisoning the cache, so a later run retries them.
    fn lookup(&mut self, address: &str, city: &str, state: &str) -> Option<Coordinates> {
        let key = GeoCache::key(address, city, state);
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let query = [address, city, state, "USA"]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        self.api_calls += 1;
        match self.service.search(&query) {
            Ok(Some(coords)) => {
                self.cache.insert(key, Some(coords));
                Some(coords)
            }
            Ok(None) => {
                self.cache.insert(key, None);
                None
            }
            Err(err) => {
                warn!("geocoding error for \"{query}\": {err}");
                None
            }
        }
    }

    /// Short-circuits on already-present coordinates, then the known
    /// venue table, then the cache; only a full miss reaches the
    /// service. Address-level misses get one city-level retry.
    pub fn resolve_location(&mut self, location: &mut Location) {
        if location.lat.is_some() && location.lng.is_some() {
            return;
        }

        if let Some(coords) = known_venue_coords(&location.name) {
            location.lat = Some(coords.lat);
            location.lng = Some(coords.lng);
            return;
        }

        let address = location.address.clone().unwrap_or_default();
        if let Some(coords) = self.lookup(&address, &location.city, &location.state) {
            location.lat = Some(coords.lat);
            location.lng = Some(coords.lng);
            return;
        }

        if let Some(coords) = self.lookup("", &location.city, &location.state) {
            location.lat = Some(coords.lat);
            location.lng = Some(coords.lng);
        }
    }

    /// In-order batch pass. The courtesy pause applies only after events
    /// whose resolution actually reached the network.
    pub fn geocode_events<F>(&mut self, events: &mut [Event], mut on_progress: F)
    where
        F: FnMut(usize, usize),
    {
        let total = events.len();
        for (index, event) in events.iter_mut().enumerate() {
            let calls_before = self.api_calls;
            self.resolve_location(&mut event.location);
            on_progress(index + 1, total);

            if self.api_calls > calls_before && index + 1 < total && !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingService {
        calls: Cell<usize>,
        result: Option<Coordinates>,
        fail: bool,
    }

    impl CountingService {
        fn returning(result: Option<Coordinates>) -> Self {
            Self {
                calls: Cell::new(0),
                result,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Cell::new(0),
                result: None,
                fail: true,
            }
        }
    }

    impl GeocodeService for &CountingService {
        fn search(&self, _query: &str) -> Result<Option<Coordinates>, GeocodeError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(GeocodeError::Http("status 503".to_string()));
            }
            Ok(self.result)
        }
    }

    fn temp_cache(dir: &tempfile::TempDir) -> GeoCache {
        GeoCache::load(&dir.path().join("geocache.json"))
    }

    fn unknown_location() -> Location {
        Location {
            name: "Some New Venue".to_string(),
            address: Some("123 Ionia Ave SW".to_string()),
            city: "Grand Rapids".to_string(),
            state: "MI".to_string(),
            zip: None,
            lat: None,
            lng: None,
        }
    }

    #[test]
    fn known_venues_match_bidirectionally() {
        assert!(known_venue_coords("Start Garden").is_some());
        assert!(known_venue_coords("Bamboo Grand Rapids - Rooftop").is_some());
        // table name contains the venue name
        assert!(known_venue_coords("right place").is_some());
        assert!(known_venue_coords("Unknown Warehouse").is_none());
        assert!(known_venue_coords("").is_none());
    }

    #[test]
    fn known_venue_skips_the_service_entirely() {
        let dir = tempfile::tempdir().expect("temp dir");
        let service = CountingService::returning(None);
        let mut geocoder = Geocoder::new(&service, temp_cache(&dir), Duration::ZERO);

        let mut location = unknown_location();
        location.name = "Start Garden".to_string();
        geocoder.resolve_location(&mut location);

        assert_eq!(location.lat, Some(42.9659));
        assert_eq!(service.calls.get(), 0);
        assert_eq!(geocoder.api_calls(), 0);
    }

    #[test]
    fn successful_lookups_are_cached_and_persisted() {
        let dir = tempfile::tempdir().expect("temp dir");
        let coords = Coordinates { lat: 42.96, lng: -85.67 };
        let service = CountingService::returning(Some(coords));
        let mut geocoder = Geocoder::new(&service, temp_cache(&dir), Duration::ZERO);

        let mut first = unknown_location();
        geocoder.resolve_location(&mut first);
        assert_eq!(first.lat, Some(42.96));
        assert_eq!(service.calls.get(), 1);

        let mut second = unknown_location();
        geocoder.resolve_location(&mut second);
        assert_eq!(second.lat, Some(42.96));
        assert_eq!(service.calls.get(), 1, "second lookup is served by the cache");

        // The write-through file survives a fresh load.
        let reloaded = temp_cache(&dir);
        let key = GeoCache::key("123 Ionia Ave SW", "Grand Rapids", "MI");
        assert_eq!(reloaded.get(&key), Some(&Some(coords)));
    }

    #[test]
    fn confirmed_not_found_is_never_retried() {
        let dir = tempfile::tempdir().expect("temp dir");
        let service = CountingService::returning(None);
        let mut geocoder = Geocoder::new(&service, temp_cache(&dir), Duration::ZERO);

        let mut location = unknown_location();
        geocoder.resolve_location(&mut location);
        assert!(location.lat.is_none());
        // address attempt + city fallback
        assert_eq!(service.calls.get(), 2);

        let mut again = unknown_location();
        geocoder.resolve_location(&mut again);
        assert_eq!(
            service.calls.get(),
            2,
            "both not-found keys are cached, no further network calls"
        );
    }

    #[test]
    fn transport_errors_are_not_cached() {
        let dir = tempfile::tempdir().expect("temp dir");
        let service = CountingService::failing();
        let mut geocoder = Geocoder::new(&service, temp_cache(&dir), Duration::ZERO);

        let mut location = unknown_location();
        geocoder.resolve_location(&mut location);
        assert!(location.lat.is_none());
        let calls_after_first = service.calls.get();

        let mut again = unknown_location();
        geocoder.resolve_location(&mut again);
        assert!(
            service.calls.get() > calls_after_first,
            "a transient failure is retried on the next resolution"
        );
    }

    #[test]
    fn batch_pass_reports_progress_and_counts_api_calls() {
        let dir = tempfile::tempdir().expect("temp dir");
        let coords = Coordinates { lat: 42.96, lng: -85.67 };
        let service = CountingService::returning(Some(coords));
        let mut geocoder = Geocoder::new(&service, temp_cache(&dir), Duration::ZERO);

        let base_event = |name: &str| Event {
            id: format!("test-{name}"),
            title: name.to_string(),
            description: String::new(),
            date: "2026-03-04".to_string(),
            time: "TBD".to_string(),
            start_date_time: "2026-03-04T00:00:00".to_string(),
            location: Location {
                name: name.to_string(),
                address: None,
                city: "Grand Rapids".to_string(),
                state: "MI".to_string(),
                zip: None,
                lat: None,
                lng: None,
            },
            url: String::new(),
            source: "start-garden".to_string(),
            category: None,
            is_recurring: false,
            is_free: true,
            scraped_at: String::new(),
        };

        let mut events = vec![base_event("Start Garden"), base_event("Mystery Venue")];
        let mut progress = Vec::new();
        geocoder.geocode_events(&mut events, |done, total| progress.push((done, total)));

        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        assert_eq!(events[0].location.lat, Some(42.9659), "known venue path");
        assert_eq!(events[1].location.lat, Some(42.96), "service path");
        assert_eq!(geocoder.api_calls(), 1);
    }
}
