use crate::markup;
use chrono::{DateTime, SecondsFormat, Utc};
use nr_core::markdown::first_link_target;
use nr_core::Article;
use thiserror::Error;

pub const UNKNOWN_TITLE: &str = "unknown title";
pub const DEFAULT_CATEGORY: &str = "general";

/// Why a package entry could not become an article. The entry is skipped; the batch goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("{path}: entry is not valid UTF-8")]
    Encoding { path: String },

    #[error("{path}: entry is empty")]
    Empty { path: String },

    #[error("{path}: entry has neither a title nor body text")]
    NoContent { path: String },
}

/// Header labels recognised in an entry, in any of the listed spellings.
#[derive(Debug, Clone)]
pub struct ParserLabels {
    pub date: Vec<String>,
    pub category: Vec<String>,
    pub url: Vec<String>,
    pub open_original: Vec<String>,
    pub summary: Vec<String>,
}

impl Default for ParserLabels {
    fn default() -> Self {
        fn owned(labels: &[&str]) -> Vec<String> {
            labels.iter().map(|l| l.to_string()).collect()
        }
        Self {
            date: owned(&["Date:", "Datum:"]),
            category: owned(&["Category:", "Kategorie:"]),
            url: owned(&["URL:"]),
            open_original: owned(&["Open original", "Original auf NZZ.ch öffnen"]),
            summary: owned(&["Summary:", "Zusammenfassung:"]),
        }
    }
}

#[derive(Default)]
struct Header {
    title: Option<String>,
    date: Option<String>,
    category: Option<String>,
    url: Option<String>,
    summary: Option<String>,
}

pub fn parse_bytes(
    raw: &[u8],
    path: &str,
    ingested_at: DateTime<Utc>,
    labels: &ParserLabels,
) -> Result<Article, ParseFailure> {
    let text = std::str::from_utf8(raw).map_err(|_| ParseFailure::Encoding {
        path: path.to_string(),
    })?;
    parse(text, path, ingested_at, labels)
}

pub fn parse(
    raw: &str,
    path: &str,
    ingested_at: DateTime<Utc>,
    labels: &ParserLabels,
) -> Result<Article, ParseFailure> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    if raw.trim().is_empty() {
        return Err(ParseFailure::Empty {
            path: path.to_string(),
        });
    }

    let lines: Vec<&str> = raw.lines().collect();
    let separator = lines.iter().position(|line| is_separator(line));
    let header_lines = match separator {
        Some(end) => &lines[..end],
        None => &lines[..],
    };
    let header = scan_header(header_lines, labels);

    let body_lines = match separator {
        Some(end) => &lines[end + 1..],
        None => &lines[..],
    };
    let body = clean_body(body_lines);

    if header.title.is_none() && body.trim().is_empty() {
        return Err(ParseFailure::NoContent {
            path: path.to_string(),
        });
    }

    let url = header.url.unwrap_or_default();
    let id = if url.is_empty() {
        sanitize_path(path)
    } else {
        url.clone()
    };

    Ok(Article {
        id,
        title: header.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        published_at: header
            .date
            .unwrap_or_else(|| ingested_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        category: header
            .category
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        url,
        content: markup::render(&body),
        raw_content: body,
        summary: header.summary,
    })
}

fn scan_header(lines: &[&str], labels: &ParserLabels) -> Header {
    let mut header = Header::default();
    for line in lines {
        if header.title.is_none() {
            if let Some(title) = line.strip_prefix("# ") {
                let title = title.trim();
                if !title.is_empty() {
                    header.title = Some(title.to_string());
                }
                continue;
            }
        }

        if header.date.is_none() {
            if let Some(value) = labelled_value(line, &labels.date) {
                header.date = Some(value);
                continue;
            }
        }
        if header.category.is_none() {
            if let Some(value) = labelled_value(line, &labels.category) {
                header.category = Some(value);
                continue;
            }
        }
        if header.summary.is_none() {
            if let Some(value) = labelled_value(line, &labels.summary) {
                header.summary = Some(value);
                continue;
            }
        }
        if header.url.is_none() {
            header.url = header_url(line, labels);
        }
    }
    header
}

/// Text after the first matching label on `line`, with emphasis wrappers removed
fn labelled_value(line: &str, labels: &[String]) -> Option<String> {
    labels.iter().find_map(|label| {
        let start = line.find(label.as_str())?;
        let value = trim_markers(&line[start + label.len()..]);
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn header_url(line: &str, labels: &ParserLabels) -> Option<String> {
    let mentions_link = labels
        .open_original
        .iter()
        .chain(labels.url.iter())
        .any(|label| line.contains(label.as_str()));
    if !mentions_link {
        return None;
    }

    if let Some(target) = first_link_target(line, |t| t.starts_with("http")) {
        return Some(target.to_string());
    }
    labelled_value(line, &labels.url)
}

fn trim_markers(value: &str) -> &str {
    value.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

fn clean_body(lines: &[&str]) -> String {
    let mut lines = lines;
    if lines.first().is_some_and(|line| line.starts_with("# ")) {
        lines = &lines[1..];
    }
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    lines[start..].join("\n").trim_end().to_string()
}

fn sanitize_path(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ingested() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 4, 6, 0, 0).unwrap()
    }

    fn parse_default(raw: &str, path: &str) -> Result<Article, ParseFailure> {
        parse(raw, path, ingested(), &ParserLabels::default())
    }

    const PRODUCER_ENTRY: &str = "# Zürich baut\n\n**Datum:** 2025-01-03T07:00:00\n\n**Kategorie:** Schweiz\n\n**URL:** https://example.org/zuerich\n\n---\n\nErster Absatz.\n\nZweiter **Absatz**.\n";

    #[test]
    fn test_producer_format() {
        let article = parse_default(PRODUCER_ENTRY, "2025-01-03/zuerich.md").unwrap();
        assert_eq!(article.title, "Zürich baut");
        assert_eq!(article.published_at, "2025-01-03T07:00:00");
        assert_eq!(article.category, "schweiz");
        assert_eq!(article.url, "https://example.org/zuerich");
        assert_eq!(article.id, "https://example.org/zuerich");
        assert_eq!(article.raw_content, "Erster Absatz.\n\nZweiter **Absatz**.");
        assert!(article.content.contains("<strong>Absatz</strong>"));
        assert_eq!(article.summary, None);
    }

    #[test]
    fn test_defaults() {
        let article = parse_default("Just a body line.", "2025-01-03/no header.md").unwrap();
        assert_eq!(article.title, UNKNOWN_TITLE);
        assert_eq!(article.category, DEFAULT_CATEGORY);
        assert_eq!(article.published_at, "2025-01-04T06:00:00Z");
        assert_eq!(article.url, "");
        assert_eq!(article.id, "2025_01_03_no_header_md");
        assert_eq!(article.raw_content, "Just a body line.");
    }

    #[test]
    fn test_english_labels_and_link_url() {
        let raw = "# Title\n*Date:* 2025-01-02\n*Category:* World\n[Open original](https://example.org/w)\nSummary: Short take.\n---\nBody";
        let article = parse_default(raw, "w.md").unwrap();
        assert_eq!(article.published_at, "2025-01-02");
        assert_eq!(article.category, "world");
        assert_eq!(article.url, "https://example.org/w");
        assert_eq!(article.summary.as_deref(), Some("Short take."));
        assert_eq!(article.raw_content, "Body");
    }

    #[test]
    fn test_no_separator_keeps_whole_document() {
        let raw = "# Heading\n\nText follows.";
        let article = parse_default(raw, "a.md").unwrap();
        assert_eq!(article.title, "Heading");
        assert_eq!(article.raw_content, "Text follows.");
    }

    #[test]
    fn test_separator_needs_only_dashes() {
        let raw = "# T\n--- not a separator\nbody";
        let article = parse_default(raw, "a.md").unwrap();
        assert!(article.raw_content.contains("--- not a separator"));
    }

    #[test]
    fn test_failures() {
        assert_eq!(
            parse_default("  \n\n", "e.md"),
            Err(ParseFailure::Empty {
                path: "e.md".to_string()
            })
        );
        assert_eq!(
            parse_default("**Datum:** 2025-01-01\n---\n\n", "n.md"),
            Err(ParseFailure::NoContent {
                path: "n.md".to_string()
            })
        );
        assert_eq!(
            parse_bytes(&[0xff, 0xfe, 0x00], "b.md", ingested(), &ParserLabels::default()),
            Err(ParseFailure::Encoding {
                path: "b.md".to_string()
            })
        );
    }

    #[test]
    fn test_title_only_is_accepted() {
        let article = parse_default("# Only a title\n---\n", "t.md").unwrap();
        assert_eq!(article.title, "Only a title");
        assert_eq!(article.raw_content, "");
    }
}
