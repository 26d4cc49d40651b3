use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use scraper::{ElementRef, Selector};
use serde::de::DeserializeOwned;

use crate::normalize::clean_text;

pub const USER_AGENT: &str = "gr-event-scrape/0.1 (+https://github.com/mike/gr-event-scrape)";

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent(USER_AGENT)
        .build()
        .expect("http client")
});

pub fn fetch_html(url: &str) -> Result<String> {
    let response = CLIENT
        .get(url)
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("non-success status for {url}"))?;
    response
        .text()
        .with_context(|| format!("unable to read response body for {url}"))
}

pub fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T> {
    let response = CLIENT
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("non-success status for {url}"))?;
    response
        .json()
        .with_context(|| format!("unable to decode response body for {url}"))
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|node| {
            let cleaned = inner_text(node);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
        .flatten()
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href);
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(&href).ok().map(|u| u.to_string())
}

/// Collapses duplicates keyed by `key`, keeping the last-seen value in
/// first-seen order. Sources whose markup can surface the same listing
/// twice (list view + detail view) run their results through this.
pub fn dedupe_by<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let item_key = key(&item);
        match index.get(&item_key).copied() {
            Some(slot) => out[slot] = item,
            None => {
                index.insert(item_key, out.len());
                out.push(item);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolutizes_relative_links() {
        assert_eq!(
            absolute_url(
                "https://startgarden.com/events/",
                Some("/events/pitch-night".to_string())
            )
            .as_deref(),
            Some("https://startgarden.com/events/pitch-night")
        );
        assert_eq!(
            absolute_url(
                "https://startgarden.com/events/",
                Some("https://eventbrite.com/e/123".to_string())
            )
            .as_deref(),
            Some("https://eventbrite.com/e/123")
        );
        assert_eq!(absolute_url("https://startgarden.com/", None), None);
    }

    #[test]
    fn dedupe_keeps_last_value_in_first_seen_order() {
        let items = vec![("a", 1), ("b", 2), ("a", 3)];
        let deduped = dedupe_by(items, |item| item.0);
        assert_eq!(deduped, vec![("a", 3), ("b", 2)]);
    }
}
