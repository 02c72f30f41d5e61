use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use nr_core::Article;
use nr_storage::MarkSet;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Exact lower-case category name
    Exact(String),
}

impl CategoryFilter {
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Exact(name) => name == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Exact(s.to_lowercase()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "all"),
            CategoryFilter::Exact(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    On(NaiveDate),
}

impl DateFilter {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateFilter::All => None,
            DateFilter::On(date) => Some(*date),
        }
    }
}

impl FromStr for DateFilter {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(DateFilter::All);
        }
        Ok(DateFilter::On(NaiveDate::parse_from_str(s, "%Y-%m-%d")?))
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFilter::All => write!(f, "all"),
            DateFilter::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionFilter {
    pub category: CategoryFilter,
    pub date: DateFilter,
    pub hide_read: bool,
}

/// Indices into `collection` eligible for navigation, newest first.
///
/// With `hide_read`, read articles are left out unless they are also saved.
pub fn filter(
    collection: &[Article],
    filter: &SessionFilter,
    read: &MarkSet,
    saved: &MarkSet,
    offset: &FixedOffset,
) -> Vec<usize> {
    let mut selected: Vec<(usize, Option<DateTime<Utc>>)> = collection
        .iter()
        .enumerate()
        .filter(|(_, article)| filter.category.matches(&article.category))
        .filter(|(_, article)| match filter.date {
            DateFilter::All => true,
            DateFilter::On(date) => article.local_date(offset) == Some(date),
        })
        .filter(|(_, article)| {
            !filter.hide_read || !read.contains(&article.id) || saved.contains(&article.id)
        })
        .map(|(i, article)| (i, article.published_in(offset).map(|ts| ts.with_timezone(&Utc))))
        .collect();

    selected.sort_by_key(|(_, ts)| Reverse(*ts));
    selected.into_iter().map(|(i, _)| i).collect()
}

/// Distinct categories, sorted
pub fn categories(collection: &[Article]) -> Vec<String> {
    let mut names: Vec<String> = collection.iter().map(|a| a.category.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Distinct local publication dates, newest first
pub fn local_dates(collection: &[Article], offset: &FixedOffset) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = collection
        .iter()
        .filter_map(|a| a.local_date(offset))
        .collect();
    dates.sort_by(|a, b| b.cmp(a));
    dates.dedup();
    dates
}

/// Date selected when a collection is first populated: the most recent one present
pub fn default_date(collection: &[Article], offset: &FixedOffset) -> DateFilter {
    local_dates(collection, offset)
        .first()
        .map_or(DateFilter::All, |date| DateFilter::On(*date))
}
