//! HTML → block model.
//!
//! The composed document is parsed with `tl` and flattened into a list of
//! [`Block`]s (headings, paragraphs, list items, preformatted text, rules,
//! table rows), each a sequence of styled [`Run`]s. This is the only input
//! the layout engine sees.
//!
//! Anything the PDF backend cannot draw is skipped and recorded as a
//! [`RenderWarning`]; parsing never fails.

use crate::error::RenderWarning;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Elements whose content never reaches the page.
const SKIPPED: &[&str] = &["head", "title", "meta", "link", "style", "script", "noscript", "template"];

/// Elements the PDF backend cannot draw.
pub const UNSUPPORTED: &[&str] = &[
    "img", "svg", "iframe", "video", "audio", "canvas", "object", "embed", "form", "input", "button", "select",
    "textarea", "math",
];

const CONTAINERS: &[&str] = &[
    "html", "body", "p", "div", "section", "article", "header", "footer", "main", "nav", "aside", "figure",
    "figcaption", "address", "details", "summary", "center", "dl", "dt", "dd", "table", "thead", "tbody", "tfoot",
    "caption",
];

const LINK_BLUE: Rgb = Rgb { r: 0, g: 51, b: 153 };

static RE_DOCTYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*<!doctype[^>]*>").unwrap());

// ── Model ────────────────────────────────────────────────────────────────

/// 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Inline formatting of a [`Run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub mono: bool,
    pub color: Option<Rgb>,
}

/// A stretch of text with one style. `'\n'` inside `text` is a hard break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `h1`–`h6`; the level is 1-based.
    Heading(u8),
    Paragraph,
    /// Whitespace-preserving text (`pre`).
    Preformatted,
    ListItem,
    TableRow,
    /// Horizontal rule; has no runs.
    Rule,
}

/// One vertically stacked unit of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Nesting depth from lists and blockquotes.
    pub indent: u8,
    /// List marker drawn in the gutter (`-`, `3.`).
    pub marker: Option<String>,
    pub runs: Vec<Run>,
}

impl Block {
    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Parsed document plus everything that could not be represented.
#[derive(Debug, Clone, Default)]
pub struct DocumentModel {
    pub blocks: Vec<Block>,
    pub warnings: Vec<RenderWarning>,
}

/// Parse a composed HTML document into blocks.
pub fn parse_document(html: &str) -> DocumentModel {
    let html = RE_DOCTYPE.replace(html, "");
    let dom = match tl::parse(&html, tl::ParserOptions::default()) {
        Ok(dom) => dom,
        Err(e) => {
            return DocumentModel {
                blocks: Vec::new(),
                warnings: vec![RenderWarning::UnparseableHtml { detail: e.to_string() }],
            }
        }
    };

    let parser = dom.parser();
    let mut builder = Builder::new(parser);
    for handle in dom.children() {
        builder.node(*handle);
    }
    builder.flush();

    debug!(
        "HTML model: {} block(s), {} warning(s)",
        builder.blocks.len(),
        builder.warnings.len()
    );

    DocumentModel {
        blocks: builder.blocks,
        warnings: builder.warnings,
    }
}

// ── Builder ──────────────────────────────────────────────────────────────

enum ListState {
    Unordered,
    Ordered(u32),
}

struct Builder<'p, 'a> {
    parser: &'p tl::Parser<'a>,
    blocks: Vec<Block>,
    warnings: Vec<RenderWarning>,
    runs: Vec<Run>,
    kind: BlockKind,
    marker: Option<String>,
    indent: u8,
    style: RunStyle,
    pre: bool,
    lists: Vec<ListState>,
    reported: HashSet<char>,
}

impl<'p, 'a> Builder<'p, 'a> {
    fn new(parser: &'p tl::Parser<'a>) -> Self {
        Self {
            parser,
            blocks: Vec::new(),
            warnings: Vec::new(),
            runs: Vec::new(),
            kind: BlockKind::Paragraph,
            marker: None,
            indent: 0,
            style: RunStyle::default(),
            pre: false,
            lists: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn node(&mut self, handle: tl::NodeHandle) {
        let parser = self.parser;
        let Some(node) = handle.get(parser) else {
            return;
        };
        match node {
            tl::Node::Tag(tag) => self.element(tag),
            tl::Node::Raw(bytes) => {
                let text = bytes.as_utf8_str();
                self.text(&text);
            }
            tl::Node::Comment(_) => {}
        }
    }

    fn children(&mut self, tag: &tl::HTMLTag) {
        for child in tag.children().top().iter() {
            self.node(*child);
        }
    }

    fn element(&mut self, tag: &tl::HTMLTag) {
        let name = tag.name().as_utf8_str().to_ascii_lowercase();
        let name = name.as_str();

        if name.starts_with('!') || SKIPPED.contains(&name) {
            return;
        }
        if UNSUPPORTED.contains(&name) {
            self.warnings.push(RenderWarning::UnsupportedElement { tag: name.to_string() });
            return;
        }

        let saved = self.style;
        if let Some(css) = attribute(tag, "style") {
            self.apply_css(&css);
        }

        match name {
            "br" => {
                self.hard_break();
                self.children(tag);
            }
            "hr" => {
                self.flush();
                self.blocks.push(Block {
                    kind: BlockKind::Rule,
                    indent: self.indent,
                    marker: None,
                    runs: Vec::new(),
                });
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                self.flush();
                self.kind = BlockKind::Heading(level);
                self.style.bold = true;
                self.children(tag);
                self.end_block();
            }
            "pre" => {
                self.flush();
                let was_pre = self.pre;
                self.pre = true;
                self.kind = BlockKind::Preformatted;
                self.style.mono = true;
                self.children(tag);
                self.end_block();
                self.pre = was_pre;
            }
            "ul" | "ol" => {
                self.flush();
                let state = if name == "ol" {
                    let start = attribute(tag, "start").and_then(|s| s.trim().parse().ok()).unwrap_or(1);
                    ListState::Ordered(start)
                } else {
                    ListState::Unordered
                };
                self.lists.push(state);
                self.indent = self.indent.saturating_add(1);
                self.children(tag);
                self.flush();
                self.indent = self.indent.saturating_sub(1);
                self.lists.pop();
            }
            "li" => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(ListState::Ordered(n)) => {
                        let m = format!("{n}.");
                        *n += 1;
                        m
                    }
                    _ => "-".to_string(),
                };
                self.kind = BlockKind::ListItem;
                self.marker = Some(marker);
                self.children(tag);
                self.end_block();
            }
            "blockquote" => {
                self.flush();
                self.indent = self.indent.saturating_add(1);
                self.style.italic = true;
                self.children(tag);
                self.flush();
                self.indent = self.indent.saturating_sub(1);
            }
            "tr" => {
                self.flush();
                self.kind = BlockKind::TableRow;
                self.row(tag);
                self.end_block();
            }
            "b" | "strong" => {
                self.style.bold = true;
                self.children(tag);
            }
            "i" | "em" | "cite" | "var" | "dfn" => {
                self.style.italic = true;
                self.children(tag);
            }
            "code" | "kbd" | "samp" | "tt" => {
                self.style.mono = true;
                self.children(tag);
            }
            "a" => {
                if attribute(tag, "href").is_some() && saved.color == self.style.color {
                    self.style.color = Some(LINK_BLUE);
                }
                self.children(tag);
            }
            _ if CONTAINERS.contains(&name) => {
                self.flush();
                self.children(tag);
                self.flush();
            }
            _ => self.children(tag),
        }

        self.style = saved;
    }

    /// One table row: cells joined with `|`, header cells in bold.
    fn row(&mut self, tag: &tl::HTMLTag) {
        let parser = self.parser;
        let mut first = true;
        for child in tag.children().top().iter() {
            let Some(tl::Node::Tag(cell)) = child.get(parser) else {
                continue;
            };
            let cell_name = cell.name().as_utf8_str().to_ascii_lowercase();
            if cell_name != "td" && cell_name != "th" {
                continue;
            }
            if !first {
                self.push(" | ".to_string());
            }
            first = false;
            let saved = self.style;
            self.style.bold |= cell_name == "th";
            self.children(cell);
            self.style = saved;
        }
    }

    fn hard_break(&mut self) {
        self.push("\n".to_string());
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        let text = if self.pre {
            decoded.replace("\r\n", "\n").replace('\t', "    ")
        } else {
            let mut collapsed = String::with_capacity(decoded.len());
            let mut at_space = self.ends_with_space();
            for c in decoded.chars() {
                if c.is_whitespace() {
                    if !at_space {
                        collapsed.push(' ');
                        at_space = true;
                    }
                } else {
                    collapsed.push(c);
                    at_space = false;
                }
            }
            collapsed
        };
        if !text.is_empty() {
            let clean = self.sanitize(&text);
            self.push(clean);
        }
    }

    /// Whether pending content is empty or ends in collapsible whitespace.
    fn ends_with_space(&self) -> bool {
        match self.runs.iter().rev().find(|r| !r.text.is_empty()) {
            None => true,
            Some(run) => run.text.ends_with(' ') || run.text.ends_with('\n'),
        }
    }

    fn push(&mut self, text: String) {
        if let Some(last) = self.runs.last_mut() {
            if last.style == self.style {
                last.text.push_str(&text);
                return;
            }
        }
        self.runs.push(Run { text, style: self.style });
    }

    /// Close the pending block, if it has any visible content.
    ///
    /// With nothing to emit, the pending kind and marker stay in place so a
    /// `<li>` whose text sits in a nested `<p>` keeps its marker.
    fn flush(&mut self) {
        if self.runs.iter().all(|r| r.text.trim().is_empty()) {
            self.runs.clear();
            return;
        }
        let mut runs = std::mem::take(&mut self.runs);
        let kind = std::mem::replace(&mut self.kind, BlockKind::Paragraph);
        let marker = self.marker.take();

        if kind == BlockKind::Preformatted {
            if let Some(first) = runs.first_mut() {
                if let Some(rest) = first.text.strip_prefix('\n') {
                    first.text = rest.to_string();
                }
            }
            if let Some(last) = runs.last_mut() {
                let trimmed = last.text.trim_end_matches('\n').len();
                last.text.truncate(trimmed);
            }
        } else if let Some(last) = runs.last_mut() {
            let trimmed = last.text.trim_end().len();
            last.text.truncate(trimmed);
        }
        runs.retain(|r| !r.text.is_empty());

        self.blocks.push(Block {
            kind,
            indent: self.indent,
            marker,
            runs,
        });
    }

    /// Flush, then drop any kind or marker an empty element left pending.
    fn end_block(&mut self) {
        self.flush();
        self.kind = BlockKind::Paragraph;
        self.marker = None;
    }

    // ── Styling ──────────────────────────────────────────────────────────

    fn apply_css(&mut self, css: &str) {
        for decl in css.split(';') {
            let Some((prop, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches("!important").trim();
            match prop.trim().to_ascii_lowercase().as_str() {
                "color" => match parse_color(value) {
                    Ok(Some(rgb)) => self.style.color = Some(rgb),
                    Ok(None) => {}
                    Err(warning) => self.warnings.push(warning),
                },
                "font-weight" => {
                    self.style.bold = matches!(value, "bold" | "bolder")
                        || value.parse::<u16>().is_ok_and(|w| w >= 600);
                }
                "font-style" => self.style.italic = matches!(value, "italic" | "oblique"),
                "font-family" => {
                    let family = value.to_ascii_lowercase();
                    if family.contains("mono") || family.contains("courier") {
                        self.style.mono = true;
                    }
                }
                _ => {}
            }
        }
    }

    // ── Encoding ─────────────────────────────────────────────────────────

    /// Map text onto what the built-in PDF fonts can encode.
    ///
    /// Typographic punctuation becomes its ASCII look-alike; anything else
    /// outside Latin-1 becomes `?` and is reported once per character.
    fn sanitize(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
                '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
                '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
                '\u{2026}' => out.push_str("..."),
                '\u{2022}' => out.push('*'),
                '\u{00A0}' | '\u{2002}'..='\u{200A}' => out.push(' '),
                '\u{200B}'..='\u{200D}' | '\u{FEFF}' => {}
                '\n' | ' ' => out.push(c),
                c if c.is_control() => {}
                c if (c as u32) <= 0xFF => out.push(c),
                c => {
                    out.push('?');
                    if self.reported.insert(c) {
                        self.warnings.push(RenderWarning::UnencodableCharacter { ch: c, code: c as u32 });
                    }
                }
            }
        }
        out
    }
}

fn attribute(tag: &tl::HTMLTag, name: &'static str) -> Option<String> {
    tag.attributes()
        .get(name)
        .flatten()
        .map(|v| decode_entities(&v.as_utf8_str()))
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Decode named and numeric character references.
///
/// Unknown names are left as written.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Parse a CSS colour.
///
/// `Ok(None)` for keywords that leave the colour unchanged (`inherit`,
/// `currentColor`, ...), [`RenderWarning::InvalidColor`] for anything
/// unrecognised.
pub fn parse_color(value: &str) -> Result<Option<Rgb>, RenderWarning> {
    let invalid = || RenderWarning::InvalidColor {
        value: value.trim().to_string(),
    };
    let v = value.trim().to_ascii_lowercase();
    if matches!(v.as_str(), "inherit" | "initial" | "unset" | "currentcolor" | "transparent") {
        return Ok(None);
    }

    if let Some(hex) = v.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;
        let rgb = match digits.len() {
            3 | 4 => Rgb {
                r: digits[0] * 17,
                g: digits[1] * 17,
                b: digits[2] * 17,
            },
            6 | 8 => Rgb {
                r: digits[0] * 16 + digits[1],
                g: digits[2] * 16 + digits[3],
                b: digits[4] * 16 + digits[5],
            },
            _ => return Err(invalid()),
        };
        return Ok(Some(rgb));
    }

    if let Some(args) = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<u8> = args
            .split([',', ' ', '/'])
            .filter(|p| !p.is_empty())
            .take(3)
            .map(|p| p.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;
        if parts.len() != 3 {
            return Err(invalid());
        }
        return Ok(Some(Rgb {
            r: parts[0],
            g: parts[1],
            b: parts[2],
        }));
    }

    let (r, g, b) = match v.as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "purple" => (128, 0, 128),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "olive" => (128, 128, 0),
        "orange" => (255, 165, 0),
        _ => return Err(invalid()),
    };
    Ok(Some(Rgb { r, g, b }))
}
