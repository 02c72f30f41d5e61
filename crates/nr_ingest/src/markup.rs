//! Display markup for article bodies. Every source character is escaped before any tag is
//! emitted, so the output can be shown as trusted markup.

use nr_core::markdown::{inline_spans, Span};

const SAFE_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

pub fn render(body: &str) -> String {
    body.lines().map(render_line).collect::<Vec<_>>().join("<br>")
}

fn render_line(line: &str) -> String {
    if let Some(text) = line.strip_prefix("### ") {
        format!("<h3>{}</h3>", render_inline(text))
    } else if let Some(text) = line.strip_prefix("## ") {
        format!("<h2>{}</h2>", render_inline(text))
    } else if let Some(text) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        format!("<li>{}</li>", render_inline(text))
    } else {
        render_inline(line)
    }
}

fn render_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for span in inline_spans(text) {
        match span {
            Span::Text(t) => out.push_str(&escape(t)),
            Span::Strong(inner) => {
                out.push_str("<strong>");
                out.push_str(&render_inline(inner));
                out.push_str("</strong>");
            }
            Span::Emphasis(inner) => {
                out.push_str("<em>");
                out.push_str(&render_inline(inner));
                out.push_str("</em>");
            }
            Span::Link { text, target } if is_safe_target(target) => {
                out.push_str(&format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    escape(target),
                    render_inline(text)
                ));
            }
            Span::Link { text, .. } => out.push_str(&render_inline(text)),
        }
    }
    out
}

fn is_safe_target(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    SAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_constructs() {
        assert_eq!(
            render("## Lead\n### Sub\n* one\n- two\nplain"),
            "<h2>Lead</h2><br><h3>Sub</h3><br><li>one</li><br><li>two</li><br>plain"
        );
    }

    #[test]
    fn test_inline_constructs() {
        assert_eq!(
            render("**bold** and *soft* [src](https://example.org/a?x=1&y=2)"),
            "<strong>bold</strong> and <em>soft</em> <a href=\"https://example.org/a?x=1&amp;y=2\" target=\"_blank\" rel=\"noopener noreferrer\">src</a>"
        );
    }

    #[test]
    fn test_html_is_escaped() {
        let out = render("<script>alert('x')</script> **<b>**");
        assert!(!out.contains("<script>"));
        assert!(out.starts_with("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(out.ends_with("<strong>&lt;b&gt;</strong>"));
    }

    #[test]
    fn test_unsafe_link_keeps_text_only() {
        assert_eq!(render("[click](javascript:void)"), "click");
        assert_eq!(render("[img](data:text/html,x) tail"), "img tail");
        assert_eq!(
            render("[mail](mailto:desk@example.org)"),
            "<a href=\"mailto:desk@example.org\" target=\"_blank\" rel=\"noopener noreferrer\">mail</a>"
        );
    }

    #[test]
    fn test_blank_lines_become_breaks() {
        assert_eq!(render("a\n\nb"), "a<br><br>b");
    }
}
