use nr_core::markdown::{inline_spans, Span};
use nr_core::Article;

/// Markdown body reduced to speakable text. Heading and list markers are removed,
/// emphasis markers dropped, links reduced to their text, blank-line runs collapsed.
pub fn strip_markdown(body: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in body.lines() {
        let line = strip_block_marker(line.trim());
        if line.is_empty() {
            if lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.push(plain_inline(line));
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Text narrated for `article`: the summary in summary view, the title and body otherwise
pub fn narratable_text(article: &Article, summary_view: bool) -> String {
    if summary_view && article.has_summary() {
        if let Some(summary) = &article.summary {
            return summary.trim().to_string();
        }
    }

    let title = article.title.trim();
    let body = strip_markdown(&article.raw_content);
    let mut text = String::with_capacity(title.len() + body.len() + 3);
    text.push_str(title);
    if !title.ends_with(['.', '!', '?', ':']) {
        text.push('.');
    }
    if !body.is_empty() {
        text.push_str("\n\n");
        text.push_str(&body);
    }
    text
}

fn strip_block_marker(line: &str) -> &str {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes > 0 && line[hashes..].starts_with(' ') {
        return line[hashes..].trim_start();
    }
    for marker in ["* ", "- ", "+ ", "> "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    if line.trim_matches('-').is_empty() || line.trim_matches('*').is_empty() {
        return "";
    }
    line
}

fn plain_inline(line: &str) -> String {
    inline_spans(line)
        .into_iter()
        .map(|span| match span {
            Span::Text(t) => t.to_string(),
            Span::Strong(inner) | Span::Emphasis(inner) => plain_inline(inner),
            Span::Link { text, .. } => plain_inline(text),
        })
        .collect()
}
