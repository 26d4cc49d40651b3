use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::aggregate;
use crate::dataset;
use crate::geocode::{GeoCache, GeocodeService, Geocoder, Nominatim};
use crate::models::RunDataset;
use crate::scraping::{self, SourceScraper};

const MIN_INTERVAL_HOURS: f64 = 24.0;
const SOURCE_PAUSE: Duration = Duration::from_secs(1);
const GEOCODE_PAUSE: Duration = Duration::from_millis(1500);

pub struct RunOptions {
    pub force: bool,
    pub data_file: PathBuf,
    pub cache_file: PathBuf,
}

/// A run either completes and persists, is gated into a deliberate
/// no-op, or fails; the gate outcome is distinct from both success and
/// failure so callers can exit 0 without claiming fresh data.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Completed {
        events: usize,
        sources: usize,
        api_calls: usize,
    },
    Skipped {
        hours_remaining: i64,
    },
}

pub fn run(options: &RunOptions) -> Result<Outcome> {
    let scrapers = scraping::active_scrapers();
    let cache = GeoCache::load(&options.cache_file);
    let geocoder = Geocoder::new(Nominatim, cache, GEOCODE_PAUSE);
    execute(options, &scrapers, geocoder, SOURCE_PAUSE)
}

/// The orchestration sequence with its collaborators injected; `run`
/// wires in the real registry and service.
pub fn execute<S: GeocodeService>(
    options: &RunOptions,
    scrapers: &[Box<dyn SourceScraper>],
    mut geocoder: Geocoder<S>,
    source_pause: Duration,
) -> Result<Outcome> {
    if options.force {
        println!("Force flag set - bypassing the {MIN_INTERVAL_HOURS:.0}-hour limit");
    } else if let Some(hours_remaining) = gate_hours_remaining(dataset::load(&options.data_file)) {
        let elapsed = MIN_INTERVAL_HOURS as i64 - hours_remaining;
        println!("Last scrape was about {elapsed} hour(s) ago.");
        println!("Scraping is limited to once per day to avoid excessive requests.");
        println!("Next scrape allowed in ~{hours_remaining} hour(s); use --force to override.");
        return Ok(Outcome::Skipped { hours_remaining });
    }

    println!("Starting scrape...");
    let output = aggregate::run_scrapers(scrapers, source_pause);
    println!(
        "Total: {} unique events from {} sources",
        output.events.len(),
        output.sources.len()
    );

    println!("Geocoding events...");
    let mut events = output.events;
    geocoder.geocode_events(&mut events, |done, total| {
        if done % 10 == 0 || done == total {
            print!("  Progress: {done}/{total}\r");
            let _ = io::stdout().flush();
        }
    });
    println!();
    println!("  Geocoding complete: {} API calls made", geocoder.api_calls());

    let data = RunDataset {
        last_scraped: Utc::now().to_rfc3339(),
        sources: output.sources,
        events,
    };
    dataset::save(&options.data_file, &data).context("failed to write dataset")?;

    println!(
        "✓ Scrape complete! {} events -> {}",
        data.events.len(),
        options.data_file.display()
    );

    Ok(Outcome::Completed {
        events: data.events.len(),
        sources: data.sources.len(),
        api_calls: geocoder.api_calls(),
    })
}

/// `Some(hours)` when the previous run is still fresh enough that this
/// invocation should be a no-op.
fn gate_hours_remaining(previous: Option<RunDataset>) -> Option<i64> {
    let last_scraped = DateTime::parse_from_rfc3339(&previous?.last_scraped).ok()?;
    let elapsed = Utc::now().signed_duration_since(last_scraped.with_timezone(&Utc));
    let elapsed_hours = elapsed.num_seconds() as f64 / 3600.0;
    if elapsed_hours >= 0.0 && elapsed_hours < MIN_INTERVAL_HOURS {
        Some((MIN_INTERVAL_HOURS - elapsed_hours).ceil() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn dataset_scraped_hours_ago(hours: i64) -> RunDataset {
        RunDataset {
            events: Vec::new(),
            last_scraped: (Utc::now() - chrono::Duration::hours(hours)).to_rfc3339(),
            sources: BTreeMap::new(),
        }
    }

    #[test]
    fn recent_runs_are_gated() {
        let remaining = gate_hours_remaining(Some(dataset_scraped_hours_ago(2)));
        assert_eq!(remaining, Some(22));
    }

    #[test]
    fn stale_runs_pass_the_gate() {
        assert_eq!(gate_hours_remaining(Some(dataset_scraped_hours_ago(25))), None);
    }

    #[test]
    fn missing_or_unparseable_history_passes_the_gate() {
        assert_eq!(gate_hours_remaining(None), None);
        let mut dataset = dataset_scraped_hours_ago(0);
        dataset.last_scraped = "never".to_string();
        assert_eq!(gate_hours_remaining(Some(dataset)), None);
    }
}
