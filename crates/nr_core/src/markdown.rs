//! Inline markdown scanner shared by the display renderer and the narration text cleaner.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Text(&'a str),
    Strong(&'a str),
    Emphasis(&'a str),
    /// `[text](target)`; images (`![alt](src)`) are reported as links too
    Link { text: &'a str, target: &'a str },
}

/// Splits one line into inline spans. Unmatched markers stay literal text.
pub fn inline_spans(line: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < line.len() {
        let rest = &line[i..];
        let found = if rest.starts_with("![") {
            link_at(&rest[1..]).map(|(span, len)| (span, len + 1))
        } else if rest.starts_with('[') {
            link_at(rest)
        } else if rest.starts_with("**") {
            delimited(rest, "**").map(|(inner, len)| (Span::Strong(inner), len))
        } else if rest.starts_with('*') {
            delimited(rest, "*").map(|(inner, len)| (Span::Emphasis(inner), len))
        } else {
            None
        };

        match found {
            Some((span, len)) => {
                if text_start < i {
                    spans.push(Span::Text(&line[text_start..i]));
                }
                spans.push(span);
                i += len;
                text_start = i;
            }
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }

    if text_start < line.len() {
        spans.push(Span::Text(&line[text_start..]));
    }
    spans
}

/// First link target in `line` matching `accept`
pub fn first_link_target<'a>(line: &'a str, accept: impl Fn(&str) -> bool) -> Option<&'a str> {
    inline_spans(line).into_iter().find_map(|span| match span {
        Span::Link { target, .. } if accept(target) => Some(target),
        _ => None,
    })
}

fn delimited<'a>(rest: &'a str, marker: &str) -> Option<(&'a str, usize)> {
    let body = &rest[marker.len()..];
    let end = body.find(marker)?;
    let inner = &body[..end];
    if inner.is_empty() || inner.starts_with(char::is_whitespace) || inner.ends_with(char::is_whitespace) {
        return None;
    }
    Some((inner, marker.len() * 2 + end))
}

fn link_at(rest: &str) -> Option<(Span<'_>, usize)> {
    let close = rest.find("](")?;
    let text = &rest[1..close];
    if text.contains('[') || text.contains(']') {
        return None;
    }
    let target_start = close + 2;
    let target_len = rest[target_start..].find(')')?;
    let target = rest[target_start..target_start + target_len].trim();
    if target.is_empty() || target.contains(char::is_whitespace) {
        return None;
    }
    Some((Span::Link { text, target }, target_start + target_len + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(inline_spans("just words"), vec![Span::Text("just words")]);
    }

    #[test]
    fn test_emphasis_and_strong() {
        assert_eq!(
            inline_spans("a **bold** and *soft* word"),
            vec![
                Span::Text("a "),
                Span::Strong("bold"),
                Span::Text(" and "),
                Span::Emphasis("soft"),
                Span::Text(" word"),
            ]
        );
    }

    #[test]
    fn test_unmatched_markers_stay_text() {
        assert_eq!(inline_spans("5 * 3 * 2"), vec![Span::Text("5 * 3 * 2")]);
        assert_eq!(inline_spans("[not a link]"), vec![Span::Text("[not a link]")]);
    }

    #[test]
    fn test_links() {
        assert_eq!(
            inline_spans("see [the source](https://example.org/a) now"),
            vec![
                Span::Text("see "),
                Span::Link {
                    text: "the source",
                    target: "https://example.org/a"
                },
                Span::Text(" now"),
            ]
        );
        assert_eq!(
            inline_spans("![chart](img.png)"),
            vec![Span::Link {
                text: "chart",
                target: "img.png"
            }]
        );
    }

    #[test]
    fn test_first_link_target() {
        let line = "[Original öffnen](/relative) [Open original](https://example.org/x)";
        assert_eq!(
            first_link_target(line, |t| t.starts_with("http")),
            Some("https://example.org/x")
        );
        assert_eq!(first_link_target("no links", |_| true), None);
    }

    #[test]
    fn test_multibyte_text() {
        let spans = inline_spans("Zürich *grüßt* Genève");
        assert_eq!(
            spans,
            vec![
                Span::Text("Zürich "),
                Span::Emphasis("grüßt"),
                Span::Text(" Genève"),
            ]
        );
    }
}
