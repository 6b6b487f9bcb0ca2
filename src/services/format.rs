//! Display formatting shared by the TUI, CLI tables and CSV export

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Placeholder for missing or unparseable values
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a number with thousand separators (e.g., 1234567 -> "1,234,567")
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);

    // Digits are ASCII, so byte indexing is safe
    for (i, ch) in s.bytes().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch as char);
    }

    result
}

/// Parse a gateway timestamp. Accepts RFC 3339, naive date-times and bare dates.
/// Zoned values are normalised to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    // Postgres renders offsets as "+00" which RFC 3339 rejects
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Short calendar date, e.g. "Feb 1, 2024"
pub fn format_day(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Format an optional gateway timestamp as a short date, "N/A" when absent or invalid
pub fn format_date(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|dt| format_day(dt.date()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Up to two uppercase initials ("Amna Osman" -> "AO"), "??" for blank names
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();
    if letters.is_empty() {
        "??".to_string()
    } else {
        letters
    }
}

/// Optional text field or "N/A"
pub fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}
