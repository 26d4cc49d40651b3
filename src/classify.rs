use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Category;

// Titles of series that recur around town, matched as lowercase
// substrings. Tuned against the live source pages; extend rather than
// reorganize.
const KNOWN_RECURRING_EVENTS: [&str; 12] = [
    "chamber happy hour",
    "business exchange",
    "latina connect",
    "coffee connect",
    "networking lunch",
    "weekly meetup",
    "monthly meetup",
    "office hours",
    "open house",
    "coworking day",
    "first friday",
    "third thursday",
];

static RECURRING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bevery\s+(week|month|day|monday|tuesday|wednesday|thursday|friday|saturday|sunday)",
        r"(?i)\bweekly\b",
        r"(?i)\bmonthly\b",
        r"(?i)\bdaily\b",
        r"(?i)\brecurring\b",
        r"(?i)\bongoing\b",
        r"(?i)\b(first|second|third|fourth|last)\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)",
        r"(?i)\bevery\s+\d+(st|nd|rd|th)",
        r"(?i)\bthroughout\s+the\s+year\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("recurring pattern"))
    .collect()
});

static DOLLAR_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\d+").expect("dollar amount regex"));
static FREE_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfree\b").expect("free word regex"));

pub fn detect_recurring_event(title: &str, description: &str, extra_text: &str) -> bool {
    let text = format!("{title} {description} {extra_text}").to_lowercase();

    if KNOWN_RECURRING_EVENTS
        .iter()
        .any(|known| text.contains(known))
    {
        return true;
    }

    RECURRING_PATTERNS.iter().any(|pattern| pattern.is_match(&text))
}

/// Ordered rule cascade: paid signals are checked before free signals so
/// mixed text like "free parking, $10 admission" lands on not-free.
/// With no signal at all the answer is `true`; the optimistic default
/// is intentional and asserted by tests.
pub fn detect_free_event(title: &str, description: &str, extra_text: &str) -> bool {
    let text = format!("{title} {description} {extra_text}").to_lowercase();

    // Membership or invitation required
    if text.contains("members only") || text.contains("member only") {
        return false;
    }
    if text.contains("private event") {
        return false;
    }

    // Tickets or payment required
    if text.contains("get tickets") || text.contains("buy tickets") {
        return false;
    }
    if text.contains("purchase tickets") {
        return false;
    }
    if DOLLAR_AMOUNT_RE.is_match(&text) {
        return false;
    }
    if text.contains("registration fee") || text.contains("admission fee") {
        return false;
    }
    if text.contains("ticket price") || text.contains("event fee") {
        return false;
    }
    if text.contains("paid event") {
        return false;
    }

    // Explicitly free
    if text.contains("free event") || text.contains("free admission") {
        return true;
    }
    if text.contains("no cost") || text.contains("no charge") || text.contains("no fee") {
        return true;
    }
    if FREE_WORD_RE.is_match(&text) && !text.contains("free parking") {
        return true;
    }

    // Public events without ticket mentions are typically free
    if text.contains("public event") && !text.contains("ticket") {
        return true;
    }

    if text.contains("community coworking") {
        return true;
    }
    if text.contains("open house") && !text.contains("ticket") {
        return true;
    }

    true
}

/// Shared keyword classifier. Sources with their own tuned keyword sets
/// keep those private to their extractor instead of widening this one.
pub fn categorize(title: &str, description: &str) -> Category {
    let text = format!("{title} {description}").to_lowercase();
    if text.contains("pitch")
        || text.contains("startup")
        || text.contains("founder")
        || text.contains("venture")
    {
        return Category::Pitch;
    }
    if text.contains("workshop")
        || text.contains("training")
        || text.contains("session")
        || text.contains("101")
    {
        return Category::Workshop;
    }
    if text.contains("summit") || text.contains("conference") {
        return Category::Conference;
    }
    if text.contains("network")
        || text.contains("mixer")
        || text.contains("meetup")
        || text.contains("connection")
    {
        return Category::Networking;
    }
    if text.contains("office hours") || text.contains("mentorship") || text.contains("panel") {
        return Category::Meetup;
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_titles_are_recurring() {
        assert!(detect_recurring_event("Chamber Happy Hour", "", ""));
        assert!(detect_recurring_event("Coffee Connect: February", "", ""));
    }

    #[test]
    fn pattern_matches_are_recurring() {
        assert!(detect_recurring_event(
            "Founder Breakfast",
            "Join us every Tuesday at 8am",
            ""
        ));
        assert!(detect_recurring_event("Makers Market", "", "first Friday of the month"));
        assert!(detect_recurring_event("Art Walks", "held throughout the year", ""));
    }

    #[test]
    fn plain_events_are_not_recurring() {
        assert!(!detect_recurring_event(
            "Annual Gala 2026",
            "A one-night celebration",
            ""
        ));
    }

    #[test]
    fn paid_signals_dominate_free_signals() {
        assert!(!detect_free_event(
            "Free Networking Event",
            "Tickets $25 at the door",
            ""
        ));
        assert!(!detect_free_event("Happy Hour", "free parking, $10 admission", ""));
        assert!(!detect_free_event("Mixer", "Members only", ""));
    }

    #[test]
    fn explicit_free_signals() {
        assert!(detect_free_event("Open Studio", "Free admission all day", ""));
        assert!(detect_free_event("Town Hall", "public event, all welcome", ""));
    }

    #[test]
    fn free_parking_alone_is_not_a_free_signal() {
        // No paid signal either, so the optimistic default still applies.
        assert!(detect_free_event("Job Fair", "free parking available", ""));
    }

    #[test]
    fn defaults_to_free_without_signals() {
        assert!(detect_free_event("Lunch & Learn", "Bring your own lunch", ""));
    }

    #[test]
    fn categorizes_by_keyword() {
        assert_eq!(categorize("Pitch Night", ""), Category::Pitch);
        assert_eq!(categorize("Intro to SQL Workshop", ""), Category::Workshop);
        assert_eq!(categorize("West Michigan Tech Summit", ""), Category::Conference);
        assert_eq!(categorize("Networking Mixer", ""), Category::Networking);
        assert_eq!(categorize("Office Hours with SCORE", ""), Category::Meetup);
        assert_eq!(categorize("Ribbon Cutting", ""), Category::Other);
    }
}
