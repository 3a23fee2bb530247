//! Publication and modification date derivation.
//!
//! Candidate sources are ranked: meta tags, structured data, `<time>`
//! elements and date-classed text, then relative phrases ("3 hours ago").
//! Whatever parses first wins; everything is normalized to RFC-3339 UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::facts::RawFacts;
use crate::text::static_regex;

static RELATIVE: Lazy<Regex> =
    Lazy::new(|| static_regex(r"(?i)\b(\d{1,3})\s+(minute|hour|day|week|month)s?\s+ago\b"));
static ISO_DATE: Lazy<Regex> = Lazy::new(|| static_regex(r"\b(\d{4})-(\d{2})-(\d{2})\b"));

/// Meta keys consulted for the publication date, in priority order.
const PUBLISHED_META: &[&str] = &[
    "property:article:published_time",
    "name:article:published_time",
    "name:pubdate",
    "name:publishdate",
    "name:publish-date",
    "name:date",
    "name:dc.date",
    "name:dc.date.issued",
    "name:sailthru.date",
];

/// Meta keys consulted for the modification date, in priority order.
const MODIFIED_META: &[&str] = &[
    "property:article:modified_time",
    "property:og:updated_time",
    "name:last-modified",
    "name:lastmod",
    "name:revised",
];

/// Derives `(published, modified)` RFC-3339 dates from the raw facts.
#[must_use]
pub fn derive_dates(facts: &RawFacts) -> (Option<String>, Option<String>) {
    let published = meta_date(facts, PUBLISHED_META)
        .or_else(|| json_ld_date(facts, "datePublished"))
        .or_else(|| time_element_date(facts))
        .or_else(|| relative_date(facts));

    let modified = meta_date(facts, MODIFIED_META).or_else(|| json_ld_date(facts, "dateModified"));

    (published, modified)
}

fn meta_date(facts: &RawFacts, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| facts.meta.get(*key))
        .find_map(|raw| parse_date_string(raw))
}

fn json_ld_date(facts: &RawFacts, field: &str) -> Option<String> {
    facts
        .json_ld
        .iter()
        .filter_map(|value| json_ld_field(value, field))
        .find_map(|raw| parse_date_string(&raw))
}

/// Looks up a field on a JSON-LD value, descending into `@graph` arrays.
fn json_ld_field(value: &Value, field: &str) -> Option<String> {
    if let Some(direct) = value.get(field).and_then(Value::as_str) {
        return Some(direct.to_string());
    }
    if let Some(graph) = value.get("@graph").and_then(Value::as_array) {
        return graph
            .iter()
            .find_map(|entry| entry.get(field).and_then(Value::as_str).map(str::to_string));
    }
    None
}

fn time_element_date(facts: &RawFacts) -> Option<String> {
    facts.times.iter().find_map(|time| {
        time.datetime
            .as_deref()
            .and_then(parse_date_string)
            .or_else(|| parse_date_string(&time.text))
    })
}

fn relative_date(facts: &RawFacts) -> Option<String> {
    facts
        .times
        .iter()
        .find_map(|time| parse_relative_phrase(&time.text))
}

/// Parses "N units ago" into an absolute date.
fn parse_relative_phrase(text: &str) -> Option<String> {
    let caps = RELATIVE.captures(text)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();

    let delta = match unit.as_str() {
        "minute" => Duration::minutes(amount),
        "hour" => Duration::hours(amount),
        "day" => Duration::days(amount),
        "week" => Duration::weeks(amount),
        "month" => Duration::days(amount * 30),
        _ => return None,
    };

    Some((Utc::now() - delta).to_rfc3339())
}

/// Parses a date string in any supported format into RFC-3339 UTC.
#[must_use]
pub fn parse_date_string(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 64 {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc).to_rfc3339());
    }

    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&parsed).to_rfc3339());
        }
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d %B %Y",
        "%B %d, %Y",
        "%d %b %Y",
        "%b %d, %Y",
        "%d.%m.%Y",
    ];
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return date_to_rfc3339(parsed);
        }
    }

    // Last resort: an ISO date embedded in surrounding text.
    if let Some(caps) = ISO_DATE.captures(raw)
        && let Ok(parsed) = NaiveDate::parse_from_str(caps.get(0)?.as_str(), "%Y-%m-%d")
    {
        return date_to_rfc3339(parsed);
    }

    None
}

fn date_to_rfc3339(date: NaiveDate) -> Option<String> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::facts::TimeFact;
    use test_case::test_case;

    #[test_case("2025-03-04T10:00:00Z"; "rfc3339")]
    #[test_case("2025-03-04"; "iso date")]
    #[test_case("2025/03/04"; "slash date")]
    #[test_case("03/04/2025"; "us date")]
    #[test_case("4 March 2025"; "day month year")]
    #[test_case("March 4, 2025"; "month day year")]
    #[test_case("Mar 4, 2025"; "abbreviated month")]
    fn test_parse_date_formats(raw: &str) {
        let parsed = parse_date_string(raw).unwrap();
        assert!(parsed.starts_with("2025-03-04"));
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date_string("").is_none());
        assert!(parse_date_string("not a date at all").is_none());
        assert!(parse_date_string("99/99/9999").is_none());
    }

    #[test]
    fn test_parse_date_embedded_iso() {
        let parsed = parse_date_string("Posted on 2024-12-25 by staff").unwrap();
        assert!(parsed.starts_with("2024-12-25"));
    }

    #[test]
    fn test_meta_priority_over_time_elements() {
        let mut facts = RawFacts::default();
        facts.meta.insert(
            "property:article:published_time".to_string(),
            "2025-01-15T08:00:00Z".to_string(),
        );
        facts.times.push(TimeFact {
            datetime: Some("2023-01-01T00:00:00Z".to_string()),
            text: String::new(),
        });

        let (published, _) = derive_dates(&facts);
        assert!(published.unwrap().starts_with("2025-01-15"));
    }

    #[test]
    fn test_json_ld_date() {
        let mut facts = RawFacts::default();
        facts.json_ld.push(serde_json::json!({
            "@type": "Article",
            "datePublished": "2024-06-01",
            "dateModified": "2024-06-10"
        }));

        let (published, modified) = derive_dates(&facts);
        assert!(published.unwrap().starts_with("2024-06-01"));
        assert!(modified.unwrap().starts_with("2024-06-10"));
    }

    #[test]
    fn test_json_ld_graph_descend() {
        let mut facts = RawFacts::default();
        facts.json_ld.push(serde_json::json!({
            "@graph": [
                {"@type": "WebSite"},
                {"@type": "Article", "datePublished": "2024-02-02"}
            ]
        }));

        let (published, _) = derive_dates(&facts);
        assert!(published.unwrap().starts_with("2024-02-02"));
    }

    #[test]
    fn test_time_element_fallback() {
        let mut facts = RawFacts::default();
        facts.times.push(TimeFact {
            datetime: None,
            text: "March 4, 2025".to_string(),
        });

        let (published, modified) = derive_dates(&facts);
        assert!(published.unwrap().starts_with("2025-03-04"));
        assert!(modified.is_none());
    }

    #[test]
    fn test_relative_phrase() {
        let parsed = parse_relative_phrase("published 3 hours ago").unwrap();
        let when: DateTime<Utc> = parsed.parse().unwrap();
        let age = Utc::now() - when;
        assert!(age >= Duration::hours(3));
        assert!(age < Duration::hours(4));
    }

    #[test]
    fn test_relative_phrase_in_facts() {
        let mut facts = RawFacts::default();
        facts.times.push(TimeFact {
            datetime: None,
            text: "2 days ago".to_string(),
        });

        let (published, _) = derive_dates(&facts);
        assert!(published.is_some());
    }

    #[test]
    fn test_no_dates() {
        let (published, modified) = derive_dates(&RawFacts::default());
        assert!(published.is_none());
        assert!(modified.is_none());
    }
}
