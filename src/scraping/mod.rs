pub mod bamboo;
pub mod base;
pub mod grand_rapids_org;
pub mod junior_chamber;
pub mod msu_foundation;
pub mod right_place;
pub mod start_garden;
pub mod startup_garage;

use chrono::Utc;

use crate::config::SourceConfig;
use crate::models::{Event, ScrapeResult};

/// One extractor per origin site. Implementations are free to encode
/// arbitrarily source-specific parsing; only the boundary is shared.
pub trait SourceScraper: Send + Sync {
    fn config(&self) -> &'static SourceConfig;
    fn fetch(&self) -> anyhow::Result<Vec<Event>>;
}

pub fn active_scrapers() -> Vec<Box<dyn SourceScraper>> {
    vec![
        Box::new(msu_foundation::MsuFoundation),
        Box::new(start_garden::StartGarden),
        Box::new(bamboo::Bamboo),
        Box::new(grand_rapids_org::GrandRapidsOrg),
        Box::new(junior_chamber::JuniorChamber),
        Box::new(startup_garage::StartupGarage),
        Box::new(right_place::RightPlace),
    ]
}

/// Runs one extractor to completion. Fetch and parse failures surface as
/// a failed `ScrapeResult`; nothing escapes this boundary.
pub fn scrape_source(scraper: &dyn SourceScraper) -> ScrapeResult {
    let source = scraper.config().id.to_string();
    let scraped_at = Utc::now().to_rfc3339();
    match scraper.fetch() {
        Ok(events) => ScrapeResult {
            source,
            events,
            success: true,
            error: None,
            scraped_at,
        },
        Err(err) => ScrapeResult {
            source,
            events: Vec::new(),
            success: false,
            error: Some(err.to_string()),
            scraped_at,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Failing;

    impl SourceScraper for Failing {
        fn config(&self) -> &'static SourceConfig {
            &crate::config::START_GARDEN
        }

        fn fetch(&self) -> anyhow::Result<Vec<Event>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn registry_covers_every_source() {
        let ids: Vec<&str> = active_scrapers()
            .iter()
            .map(|scraper| scraper.config().id)
            .collect();
        assert_eq!(ids.len(), 7);
        assert!(ids.contains(&"msu-foundation"));
        assert!(ids.contains(&"startup-garage"));
    }

    #[test]
    fn failures_become_failed_results() {
        let result = scrape_source(&Failing);
        assert!(!result.success);
        assert!(result.events.is_empty());
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert_eq!(result.source, "start-garden");
    }
}
