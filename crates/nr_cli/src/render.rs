use chrono::FixedOffset;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::{cursor, queue, terminal};
use nr_core::SpeechEngine;
use nr_reader::narration::strip_markdown;
use nr_reader::{Direction, Phase, PlaybackState, Reader};
use std::io::{self, Write};

const HELP: &str = "←/→ move  * save  d delete  a audio  n newest  h hide read  c category  [/] date  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Normal,
    Title,
    Dim,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

impl Line {
    fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Everything drawn for one frame, captured from the reader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub position: Option<(usize, usize)>,
    pub category: String,
    pub date: String,
    pub hide_read: bool,
    pub title: String,
    pub meta: String,
    pub body: String,
    pub narration: Option<String>,
    pub notice: Option<String>,
    /// Horizontal displacement in columns, negative to the left
    pub shift: i32,
    pub faded: bool,
}

impl View {
    pub fn capture<E: SpeechEngine>(
        reader: &Reader<E>,
        now_ms: u64,
        offset: &FixedOffset,
        cell_width: f32,
        width: u16,
    ) -> Self {
        let filter = reader.filter();
        let (index, len) = reader.position();
        let mut view = View {
            position: index.map(|i| (i, len)),
            category: filter.category.to_string(),
            date: filter.date.to_string(),
            hide_read: filter.hide_read,
            notice: reader.notice().map(|n| n.to_string()),
            ..Default::default()
        };

        view.narration = match reader.playback() {
            PlaybackState::Speaking { chunk_index, .. } => Some(format!(
                "🔊 {}/{}",
                chunk_index + 1,
                reader.narrator().chunk_count()
            )),
            PlaybackState::Idle if reader.narrator().is_active() => Some("🔊 …".to_string()),
            PlaybackState::Idle => None,
        };

        match reader.current() {
            Some(article) => {
                view.title = article.title.clone();
                let published = article
                    .published_in(offset)
                    .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| article.published_at.clone());
                let mut meta = vec![published, article.category.clone()];
                if reader.is_saved(&article.id) {
                    meta.push("★ saved".to_string());
                }
                if reader.is_read(&article.id) {
                    meta.push("✓ read".to_string());
                }
                if article.has_summary() && !reader.summary_view() {
                    meta.push("summary: Enter Enter".to_string());
                }
                view.meta = meta.join(" · ");
                view.body = match (&article.summary, reader.summary_view()) {
                    (Some(summary), true) => summary.clone(),
                    _ => strip_markdown(&article.raw_content),
                };
                if !article.url.is_empty() {
                    view.body.push_str("\n\n");
                    view.body.push_str(&article.url);
                }
            }
            None => {
                view.title = "No articles".to_string();
                view.body =
                    "Nothing to show for this selection. Use [ and ] to change the date, c for the category or h to show read articles."
                        .to_string();
            }
        }

        let drag = reader.drag_visual();
        let mut shift = drag.offset / cell_width;
        let mut faded = drag.opacity < 0.6;
        if let Some((direction, phase, progress)) = reader.transition(now_ms) {
            let travel = width as f32 / 4.0;
            let sign = match direction {
                Direction::Forward => -1.0,
                Direction::Backward => 1.0,
            };
            shift = match phase {
                Phase::Exiting => sign * progress * travel,
                Phase::Entering => -sign * (1.0 - progress) * travel,
            };
            faded = match phase {
                Phase::Exiting => progress > 0.5,
                Phase::Entering => progress < 0.5,
            };
        }
        view.shift = shift.round() as i32;
        view.faded = faded;
        view
    }
}

/// Lays a view out as exactly `height` lines no wider than `width`
pub fn compose(view: &View, width: u16, height: u16) -> Vec<Line> {
    let width = width.max(10) as usize;
    let height = height as usize;

    let position = match view.position {
        Some((index, len)) => format!("{}/{}", index + 1, len),
        None => "0/0".to_string(),
    };
    let mut header = format!("{} │ {} │ {}", position, view.category, view.date);
    if view.hide_read {
        header.push_str(" │ hiding read");
    }
    if let Some(narration) = &view.narration {
        header.push_str(" │ ");
        header.push_str(narration);
    }

    let body_style = if view.faded {
        LineStyle::Dim
    } else {
        LineStyle::Normal
    };
    let title_style = if view.faded {
        LineStyle::Dim
    } else {
        LineStyle::Title
    };

    let mut content = Vec::new();
    content.extend(wrap(&view.title, width).into_iter().map(|l| Line::new(l, title_style)));
    content.extend(wrap(&view.meta, width).into_iter().map(|l| Line::new(l, LineStyle::Dim)));
    content.push(Line::new("", body_style));
    content.extend(wrap(&view.body, width).into_iter().map(|l| Line::new(l, body_style)));
    for line in &mut content {
        line.text = shift_line(&line.text, view.shift, width);
    }

    let footer = match &view.notice {
        Some(notice) => Line::new(truncate(notice, width), LineStyle::Notice),
        None => Line::new(truncate(HELP, width), LineStyle::Dim),
    };

    let mut lines = vec![
        Line::new(truncate(&header, width), LineStyle::Dim),
        Line::new("", LineStyle::Normal),
    ];
    let room = height.saturating_sub(lines.len() + 1);
    lines.extend(content.into_iter().take(room));
    while lines.len() + 1 < height {
        lines.push(Line::new("", LineStyle::Normal));
    }
    if height > 0 {
        lines.push(footer);
    }
    lines.truncate(height);
    lines
}

pub fn draw(out: &mut impl Write, view: &View) -> io::Result<()> {
    let (width, height) = terminal::size()?;
    queue!(out, terminal::Clear(terminal::ClearType::All))?;
    for (row, line) in compose(view, width, height).iter().enumerate() {
        queue!(out, cursor::MoveTo(0, row as u16))?;
        match line.style {
            LineStyle::Normal => queue!(out, Print(&line.text))?,
            LineStyle::Title => queue!(
                out,
                SetAttribute(Attribute::Bold),
                Print(&line.text),
                SetAttribute(Attribute::Reset)
            )?,
            LineStyle::Dim => queue!(
                out,
                SetAttribute(Attribute::Dim),
                Print(&line.text),
                SetAttribute(Attribute::Reset)
            )?,
            LineStyle::Notice => queue!(
                out,
                SetAttribute(Attribute::Reverse),
                Print(&line.text),
                SetAttribute(Attribute::Reset)
            )?,
        }
    }
    out.flush()
}

/// Word wrap preserving paragraph breaks; words longer than `width` are split
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        let mut line_len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(word.iter());
            line_len += word.len();
        }
        lines.push(line);
    }
    lines
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn shift_line(text: &str, shift: i32, width: usize) -> String {
    let shifted = if shift >= 0 {
        let mut padded = " ".repeat(shift as usize);
        padded.push_str(text);
        padded
    } else {
        text.chars().skip(shift.unsigned_abs() as usize).collect()
    };
    truncate(&shifted, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        View {
            position: Some((1, 3)),
            category: "all".to_string(),
            date: "2025-01-03".to_string(),
            title: "Zürich baut".to_string(),
            meta: "2025-01-03 07:00 · schweiz".to_string(),
            body: "Erster Absatz mit Text.\n\nZweiter Absatz.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("eins zwei drei", 9), vec!["eins zwei", "drei"]);
        assert_eq!(wrap("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap("abcdefghij xy", 4), vec!["abcd", "efgh", "ij", "xy"]);
        assert_eq!(wrap("ääää ö", 4), vec!["ääää", "ö"]);
    }

    #[test]
    fn test_compose_fills_screen() {
        let lines = compose(&view(), 40, 12);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0].text, "2/3 │ all │ 2025-01-03");
        assert_eq!(lines[2].text, "Zürich baut");
        assert_eq!(lines[2].style, LineStyle::Title);
        assert_eq!(lines[11].style, LineStyle::Dim);
        assert!(lines.iter().all(|l| l.text.chars().count() <= 40));
    }

    #[test]
    fn test_notice_replaces_help() {
        let mut v = view();
        v.notice = Some("No more articles.".to_string());
        v.hide_read = true;
        v.narration = Some("🔊 1/4".to_string());
        let lines = compose(&v, 60, 8);
        assert_eq!(lines[7], Line::new("No more articles.", LineStyle::Notice));
        assert_eq!(lines[0].text, "2/3 │ all │ 2025-01-03 │ hiding read │ 🔊 1/4");
    }

    #[test]
    fn test_shift_moves_content() {
        let mut v = view();
        v.shift = 3;
        let lines = compose(&v, 40, 8);
        assert_eq!(lines[2].text, "   Zürich baut");

        v.shift = -3;
        let lines = compose(&v, 40, 8);
        assert_eq!(lines[2].text, "ich baut");
        assert_eq!(lines[0].text, "2/3 │ all │ 2025-01-03");
    }

    #[test]
    fn test_tiny_terminal() {
        assert!(compose(&view(), 40, 0).is_empty());
        let lines = compose(&view(), 40, 1);
        assert_eq!(lines.len(), 1);
    }
}
