use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static MONTH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})").expect("month date regex"));
static SLASH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})").expect("slash date regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("iso date regex"));

static CANONICAL_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(\d{1,2}):(\d{2})\s+(am|pm)$").expect("canonical time regex"));
static NO_SPACE_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(\d{1,2}):(\d{2})(am|pm)$").expect("no-space time regex"));
static HOUR_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(\d{1,2})\s*(am|pm)$").expect("hour-only time regex"));
static MILITARY_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("24-hour time regex"));
static MERIDIEM_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(\d{1,2}):(\d{2})\s*(am|pm)$").expect("meridiem time regex"));

// Formats the generic last-resort pass accepts, tried in order.
const FALLBACK_DATE_FORMATS: [&str; 5] = [
    "%A, %B %d, %Y",
    "%a %b %d, %Y",
    "%a, %b %d, %Y",
    "%Y/%m/%d",
    "%d %B %Y",
];

pub fn clean_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Decodes the handful of HTML entities the source payloads actually emit.
pub fn decode_entities(input: &str) -> String {
    input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

pub fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" | "january" => Some(1),
        "feb" | "february" => Some(2),
        "mar" | "march" => Some(3),
        "apr" | "april" => Some(4),
        "may" => Some(5),
        "jun" | "june" => Some(6),
        "jul" | "july" => Some(7),
        "aug" | "august" => Some(8),
        "sep" | "september" => Some(9),
        "oct" | "october" => Some(10),
        "nov" | "november" => Some(11),
        "dec" | "december" => Some(12),
        _ => None,
    }
}

/// Parses the date formats the sources are known to emit, in priority
/// order. Returns `None` on total failure; callers drop the candidate.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }

    // "Jan 20, 2026" / "January 20 2026", optional period after the abbreviation
    if let Some(caps) = MONTH_DATE_RE.captures(&cleaned) {
        if let Some(month) = month_number(&caps[1]) {
            let day = caps[2].parse::<u32>().unwrap_or(0);
            let year = caps[3].parse::<i32>().unwrap_or(0);
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    // "1/5/2026"
    if let Some(caps) = SLASH_DATE_RE.captures(&cleaned) {
        let month = caps[1].parse::<u32>().unwrap_or(0);
        let day = caps[2].parse::<u32>().unwrap_or(0);
        let year = caps[3].parse::<i32>().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    // "2026-03-04", trailing text ignored
    if let Some(caps) = ISO_DATE_RE.captures(&cleaned) {
        let year = caps[1].parse::<i32>().unwrap_or(0);
        let month = caps[2].parse::<u32>().unwrap_or(0);
        let day = caps[3].parse::<u32>().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    for format in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }

    None
}

/// Normalizes a wall-clock string to `H:MM AM/PM`. Empty input yields
/// `TBD`; anything unrecognized passes through cleaned rather than being
/// discarded.
pub fn parse_time(text: &str) -> String {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return "TBD".to_string();
    }

    if let Some(caps) = CANONICAL_TIME_RE.captures(&cleaned) {
        return format!("{}:{} {}", &caps[1], &caps[2], caps[3].to_uppercase());
    }

    if let Some(caps) = NO_SPACE_TIME_RE.captures(&cleaned) {
        return format!("{}:{} {}", &caps[1], &caps[2], caps[3].to_uppercase());
    }

    if let Some(caps) = HOUR_ONLY_RE.captures(&cleaned) {
        return format!("{}:00 {}", &caps[1], caps[2].to_uppercase());
    }

    if let Some(caps) = MILITARY_TIME_RE.captures(&cleaned) {
        let mut hour = caps[1].parse::<u32>().unwrap_or(0);
        let minute = &caps[2];
        let period = if hour >= 12 { "PM" } else { "AM" };
        if hour > 12 {
            hour -= 12;
        }
        if hour == 0 {
            hour = 12;
        }
        return format!("{hour}:{minute} {period}");
    }

    cleaned
}

/// Combines a `YYYY-MM-DD` date and a normalized time into a local ISO
/// timestamp. Times that never normalized (`TBD`, passthrough text) fall
/// back to midnight instead of failing.
pub fn to_iso_datetime(date: &str, time: &str) -> String {
    let caps = match MERIDIEM_TIME_RE.captures(time) {
        Some(caps) => caps,
        None => return format!("{date}T00:00:00"),
    };

    let mut hour = caps[1].parse::<u32>().unwrap_or(0);
    let minute = &caps[2];
    let period = caps[3].to_uppercase();

    if period == "PM" && hour != 12 {
        hour += 12;
    }
    if period == "AM" && hour == 12 {
        hour = 0;
    }

    format!("{date}T{hour:02}:{minute}:00")
}

/// Stable identifier: lowercase slug of `source-title-date`, runs of
/// non-alphanumerics collapsed to single hyphens, capped at 64 chars.
/// Deterministic so re-scraping the same event yields the same id.
pub fn generate_event_id(source: &str, title: &str, date: &str) -> String {
    let combined = format!("{source}-{title}-{date}").to_lowercase();
    let mut slug = String::with_capacity(combined.len());
    let mut pending_hyphen = false;
    for ch in combined.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    slug.truncate(64);
    slug.trim_end_matches('-').to_string()
}
