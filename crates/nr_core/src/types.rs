use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Naive layouts the archive producer has been seen to emit, interpreted in local time.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Publish date as found in the archive entry, or the ingestion time in RFC 3339.
    pub published_at: String,
    pub category: String,
    pub url: String,
    /// Display markup, already escaped.
    pub content: String,
    /// Markdown body kept for narration.
    pub raw_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Article {
    pub fn published_in(&self, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.published_at, offset)
    }

    /// Calendar date of publication as seen in `offset`
    pub fn local_date(&self, offset: &FixedOffset) -> Option<NaiveDate> {
        self.published_in(offset).map(|ts| ts.date_naive())
    }

    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

pub fn parse_timestamp(raw: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(offset));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return offset.from_local_datetime(&naive).single();
        }
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    offset.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Sorts newest first. Unparsable dates go last; ties keep their order.
pub fn sort_newest_first(articles: &mut [Article], offset: &FixedOffset) {
    articles.sort_by_cached_key(|article| {
        Reverse(article.published_in(offset).map(|ts| ts.with_timezone(&Utc)))
    });
}

pub fn local_offset() -> FixedOffset {
    *Local::now().offset()
}
