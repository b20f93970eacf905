//! Markdown → HTML fragment via comrak.
//!
//! Three behaviours are switched on:
//!
//! - fenced code blocks (CommonMark core),
//! - syntax highlighting of fenced code through comrak's syntect adapter,
//! - table-of-contents anchors: every heading carries a stable `id`, and a
//!   paragraph containing only `[TOC]` is replaced by a nested list of links.
//!
//! Raw HTML in the source is passed through untouched.

use comrak::nodes::{AstNode, NodeValue};
use comrak::plugins::syntect::SyntectAdapter;
use comrak::{markdown_to_html_with_plugins, parse_document, Anchorizer, Arena, Options, Plugins};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Paragraph marker replaced by the generated table of contents.
pub const TOC_MARKER: &str = "<p>[TOC]</p>";

/// Options for the Markdown stage.
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    /// syntect theme name; `None` emits CSS classes instead of inline styles.
    pub highlight_theme: Option<String>,
}

/// One heading, as linked from the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    /// Anchor id, identical to the `id` comrak puts on the heading.
    pub id: String,
}

/// Output of [`render`].
#[derive(Debug, Clone)]
pub struct RenderedMarkdown {
    /// The HTML fragment, with any `[TOC]` marker expanded.
    pub html: String,
    pub toc: Vec<TocEntry>,
    /// The table of contents as HTML (empty when there are no headings).
    pub toc_html: String,
}

/// Render a Markdown body to an HTML fragment.
pub fn render(body: &str, options: &MarkdownOptions) -> RenderedMarkdown {
    let adapter = SyntectAdapter::new(options.highlight_theme.as_deref());
    let mut plugins = Plugins::default();
    plugins.render.codefence_syntax_highlighter = Some(&adapter);

    let mut html = markdown_to_html_with_plugins(body, &comrak_options(), &plugins);

    let toc = collect_headings(body);
    let toc_html = toc_to_html(&toc);
    if html.contains(TOC_MARKER) {
        html = html.replace(TOC_MARKER, toc_html.trim_end());
    }

    debug!(
        "Markdown rendered: {} bytes in, {} bytes out, {} heading(s)",
        body.len(),
        html.len(),
        toc.len()
    );

    RenderedMarkdown { html, toc, toc_html }
}

/// Collect every heading with the anchor id comrak assigns to it.
pub fn collect_headings(body: &str) -> Vec<TocEntry> {
    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, body, &options);

    let mut anchorizer = Anchorizer::new();
    let mut entries = Vec::new();

    for node in root.descendants() {
        let level = match node.data.borrow().value {
            NodeValue::Heading(ref heading) => heading.level,
            _ => continue,
        };
        let mut text = String::new();
        collect_text(node, &mut text);
        let id = anchorizer.anchorize(text.clone());
        entries.push(TocEntry {
            level,
            text: text.trim().to_string(),
            id,
        });
    }

    entries
}

fn comrak_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.header_ids = Some(String::new());
    options.render.unsafe_ = true; // raw HTML passes through unchanged
    options
}

/// Gather the text of a heading the same way comrak does for its anchor.
fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match node.data.borrow().value {
        NodeValue::Text(ref t) => out.push_str(t),
        NodeValue::Code(ref code) => out.push_str(&code.literal),
        NodeValue::LineBreak | NodeValue::SoftBreak => out.push(' '),
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Render headings as a nested `<ul>` inside `<div class="toc">`.
fn toc_to_html(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut html = String::from("<div class=\"toc\">\n");
    let mut open: Vec<u8> = Vec::new();

    for entry in entries {
        match open.last() {
            None => {
                html.push_str("<ul>\n");
                open.push(entry.level);
            }
            Some(&current) if entry.level > current => {
                html.push_str("\n<ul>\n");
                open.push(entry.level);
            }
            Some(_) => {
                html.push_str("</li>\n");
                while open.len() > 1 && open.last().is_some_and(|&l| entry.level < l) {
                    html.push_str("</ul>\n</li>\n");
                    open.pop();
                }
            }
        }
        html.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&entry.id),
            escape_html(&entry.text)
        ));
    }

    html.push_str("</li>\n");
    while open.pop().is_some() {
        html.push_str("</ul>\n");
        if !open.is_empty() {
            html.push_str("</li>\n");
        }
    }
    html.push_str("</div>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn themed() -> MarkdownOptions {
        MarkdownOptions {
            highlight_theme: Some("InspiredGitHub".into()),
        }
    }

    const CODE_DOC: &str = "# Demo\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n";

    #[test]
    fn fenced_code_gets_highlighting_markup() {
        let out = render(CODE_DOC, &themed());
        assert!(out.html.contains("<pre"), "got: {}", out.html);
        assert!(out.html.contains("language-rust"), "got: {}", out.html);
        assert!(out.html.contains("<span style=\""), "got: {}", out.html);
    }

    #[test]
    fn highlighting_is_deterministic() {
        let first = render(CODE_DOC, &themed()).html;
        let second = render(CODE_DOC, &themed()).html;
        assert_eq!(first, second);
    }

    #[test]
    fn class_based_highlighting_without_theme() {
        let out = render(CODE_DOC, &MarkdownOptions::default());
        assert!(out.html.contains("<span class=\""), "got: {}", out.html);
        assert!(!out.html.contains("<span style="), "got: {}", out.html);
    }

    #[test]
    fn headings_get_anchor_ids() {
        let out = render("## Getting Started\n\ntext", &themed());
        assert!(out.html.contains("id=\"getting-started\""), "got: {}", out.html);
        assert_eq!(out.toc[0].id, "getting-started");
        assert_eq!(out.toc[0].level, 2);
    }

    #[test]
    fn duplicate_headings_get_unique_ids() {
        let toc = collect_headings("# Intro\n\n# Intro\n\n# `code` *span*\n");
        let ids: Vec<&str> = toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["intro", "intro-1", "code-span"]);
        assert_eq!(toc[2].text, "code span");
    }

    #[test]
    fn toc_marker_is_replaced() {
        let md = "[TOC]\n\n# One\n\n## One point one\n\n# Two\n";
        let out = render(md, &themed());
        assert!(!out.html.contains("[TOC]"), "got: {}", out.html);
        assert!(out.html.contains("<div class=\"toc\">"));
        assert!(out.html.contains("<a href=\"#one-point-one\">One point one</a>"));
        assert_eq!(out.html.matches("<ul>").count(), 2);
        assert_eq!(out.html.matches("</ul>").count(), 2);
    }

    #[test]
    fn toc_html_is_empty_without_headings() {
        let out = render("just text", &themed());
        assert!(out.toc.is_empty());
        assert!(out.toc_html.is_empty());
    }

    #[test]
    fn nested_toc_is_balanced() {
        let entries = vec![
            TocEntry { level: 1, text: "A".into(), id: "a".into() },
            TocEntry { level: 2, text: "B".into(), id: "b".into() },
            TocEntry { level: 3, text: "C".into(), id: "c".into() },
            TocEntry { level: 1, text: "D & E".into(), id: "d--e".into() },
        ];
        let html = toc_to_html(&entries);
        assert_eq!(html.matches("<li>").count(), 4);
        assert_eq!(html.matches("</li>").count(), 4);
        assert_eq!(html.matches("<ul>").count(), html.matches("</ul>").count());
        assert!(html.contains("D &amp; E"));
    }

    #[test]
    fn raw_html_passes_through_unsanitised() {
        let out = render("<div class=\"note\"><script>x()</script></div>\n", &themed());
        assert!(out.html.contains("<div class=\"note\"><script>x()</script></div>"));
    }
}
