use std::collections::BTreeMap;
use std::fs;

use chrono::{Duration, Utc};

use gr_event_scrape::dataset;
use gr_event_scrape::models::{RunDataset, SourceInfo, SourceReport};
use gr_event_scrape::pipeline::{run, Outcome, RunOptions};

fn recent_dataset() -> RunDataset {
    let mut sources = BTreeMap::new();
    sources.insert(
        "start-garden".to_string(),
        SourceReport {
            source: SourceInfo {
                id: "start-garden".to_string(),
                name: "Start Garden".to_string(),
                url: "https://startgarden.com/events/".to_string(),
                color: "#FF6B35".to_string(),
            },
            event_count: 0,
            last_scraped: Utc::now().to_rfc3339(),
        },
    );
    RunDataset {
        events: Vec::new(),
        last_scraped: (Utc::now() - Duration::hours(2)).to_rfc3339(),
        sources,
    }
}

#[test]
fn freshness_gate_short_circuits_without_scraping() {
    let dir = tempfile::tempdir().expect("temp dir");
    let data_file = dir.path().join("events.json");
    let cache_file = dir.path().join("geocache.json");

    dataset::save(&data_file, &recent_dataset()).expect("seed dataset");
    let before = fs::read_to_string(&data_file).expect("read seeded dataset");

    let outcome = run(&RunOptions {
        force: false,
        data_file: data_file.clone(),
        cache_file,
    })
    .expect("gated run succeeds");

    match outcome {
        Outcome::Skipped { hours_remaining } => {
            assert!(hours_remaining >= 21 && hours_remaining <= 22);
        }
        other => panic!("expected a gated no-op, got {other:?}"),
    }

    let after = fs::read_to_string(&data_file).expect("read dataset after run");
    assert_eq!(before, after, "a gated run leaves the dataset untouched");
}
