use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use crate::models::{Event, ScrapeResult, SourceReport};
use crate::scraping::{self, base, SourceScraper};

pub struct AggregateOutput {
    pub events: Vec<Event>,
    pub sources: BTreeMap<String, SourceReport>,
    pub results: Vec<ScrapeResult>,
}

/// Runs every extractor in sequence, pausing between sources as a
/// courtesy to the target servers. A failing source contributes zero
/// events and is recorded for reporting; it never aborts the run.
pub fn run_scrapers(scrapers: &[Box<dyn SourceScraper>], pause: Duration) -> AggregateOutput {
    let mut all_events: Vec<Event> = Vec::new();
    let mut sources: BTreeMap<String, SourceReport> = BTreeMap::new();
    let mut results: Vec<ScrapeResult> = Vec::new();

    for scraper in scrapers {
        let config = scraper.config();
        println!("Scraping {}...", config.name);

        let mut result = scraping::scrape_source(scraper.as_ref());
        if result.success {
            println!("  ✓ {} events found", result.events.len());
        } else {
            println!(
                "  ✗ Error: {}",
                result.error.as_deref().unwrap_or("unknown")
            );
        }

        sources.insert(
            config.id.to_string(),
            SourceReport {
                source: config.info(),
                event_count: result.events.len(),
                last_scraped: result.scraped_at.clone(),
            },
        );

        all_events.append(&mut result.events);
        results.push(result);

        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }

    AggregateOutput {
        events: sort_events(dedupe_events(all_events)),
        sources,
        results,
    }
}

/// Global dedup by id. Ids depend only on (source, title, date), so a
/// collision is the same logical event and last-seen may win.
pub fn dedupe_events(events: Vec<Event>) -> Vec<Event> {
    base::dedupe_by(events, |event| event.id.clone())
}

/// Ascending by start timestamp; lexicographic ordering is exact since
/// every timestamp shares the same format.
pub fn sort_events(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| a.start_date_time.cmp(&b.start_date_time));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::models::Location;
    use crate::normalize;
    use anyhow::anyhow;
    use chrono::Utc;

    fn sample_event(source: &str, title: &str, date: &str, time: &str) -> Event {
        Event {
            id: normalize::generate_event_id(source, title, date),
            title: title.to_string(),
            description: String::new(),
            date: date.to_string(),
            time: time.to_string(),
            start_date_time: normalize::to_iso_datetime(date, time),
            location: Location {
                name: "Start Garden".to_string(),
                address: None,
                city: "Grand Rapids".to_string(),
                state: "MI".to_string(),
                zip: None,
                lat: None,
                lng: None,
            },
            url: "https://example.com".to_string(),
            source: source.to_string(),
            category: None,
            is_recurring: false,
            is_free: true,
            scraped_at: Utc::now().to_rfc3339(),
        }
    }

    struct Fixed {
        config: &'static SourceConfig,
        events: Vec<Event>,
    }

    impl SourceScraper for Fixed {
        fn config(&self) -> &'static SourceConfig {
            self.config
        }

        fn fetch(&self) -> anyhow::Result<Vec<Event>> {
            Ok(self.events.clone())
        }
    }

    struct Broken;

    impl SourceScraper for Broken {
        fn config(&self) -> &'static SourceConfig {
            &crate::config::BAMBOO
        }

        fn fetch(&self) -> anyhow::Result<Vec<Event>> {
            Err(anyhow!("503 from upstream"))
        }
    }

    #[test]
    fn partial_failure_keeps_the_run_alive() {
        let scrapers: Vec<Box<dyn SourceScraper>> = vec![
            Box::new(Fixed {
                config: &crate::config::START_GARDEN,
                events: vec![sample_event("start-garden", "Pitch Night", "2026-03-04", "6:30 PM")],
            }),
            Box::new(Broken),
        ];

        let output = run_scrapers(&scrapers, Duration::ZERO);

        assert_eq!(output.events.len(), 1);
        assert_eq!(output.sources["start-garden"].event_count, 1);
        assert_eq!(output.sources["bamboo"].event_count, 0);
        assert_eq!(output.results.len(), 2);
        assert!(output.results[0].success);
        assert!(!output.results[1].success);
        assert_eq!(
            output.results[1].error.as_deref(),
            Some("503 from upstream")
        );
    }

    #[test]
    fn dedup_is_stable_across_runs() {
        let run = || {
            vec![
                sample_event("start-garden", "Pitch Night", "2026-03-04", "6:30 PM"),
                sample_event("bamboo", "Open House", "2026-03-10", "TBD"),
            ]
        };

        let first = sort_events(dedupe_events(run()));

        // A second identical scrape merged with the persisted output must
        // collapse back to the same set.
        let mut merged = first.clone();
        merged.extend(run());
        let second = sort_events(dedupe_events(merged));

        let ids = |events: &[Event]| events.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn duplicate_ids_collapse_to_the_last_seen() {
        let mut stale = sample_event("start-garden", "Pitch Night", "2026-03-04", "6:30 PM");
        stale.description = "old copy".to_string();
        let mut fresh = stale.clone();
        fresh.description = "updated copy".to_string();

        let deduped = dedupe_events(vec![stale, fresh]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].description, "updated copy");
    }

    #[test]
    fn events_sort_by_start_timestamp() {
        let events = vec![
            sample_event("bamboo", "Later", "2026-03-10", "9:00 AM"),
            sample_event("start-garden", "Earlier", "2026-03-04", "6:30 PM"),
            sample_event("bamboo", "Same Day Morning", "2026-03-10", "8:00 AM"),
        ];
        let sorted = sort_events(events);
        let titles: Vec<&str> = sorted.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Earlier", "Same Day Morning", "Later"]);
    }
}
