//! Block model → positioned text on pages.
//!
//! Greedy line filling with approximate metrics for the built-in Helvetica
//! and Courier faces. Positions are in millimetres measured from the top-left
//! corner of the page; [`crate::pipeline::render`] flips them into PDF space.

use crate::pipeline::html::{Block, BlockKind, Rgb, Run, RunStyle};
use tracing::debug;

/// Millimetres per typographic point.
pub const MM_PER_PT: f32 = 0.3528;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.35;

/// Font-size multipliers for `h1`–`h6`.
const HEADING_SCALE: [f32; 6] = [2.0, 1.6, 1.35, 1.15, 1.0, 0.9];

/// Horizontal offset per list/blockquote nesting level.
const INDENT_MM: f32 = 7.0;

/// Gap between a list marker and the item text.
const MARKER_GAP_MM: f32 = 1.5;

/// Page dimensions and base text size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    /// Body text size in points.
    pub font_size: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 20.0,
            font_size: 11.0,
        }
    }
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    /// Lowest y (from the top) a line may reach.
    pub fn content_bottom(&self) -> f32 {
        self.height_mm - self.margin_mm
    }
}

/// One of the eight built-in faces used for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
    MonoBold,
    MonoItalic,
    MonoBoldItalic,
}

impl FontFace {
    pub const ALL: [FontFace; 8] = [
        FontFace::Regular,
        FontFace::Bold,
        FontFace::Italic,
        FontFace::BoldItalic,
        FontFace::Mono,
        FontFace::MonoBold,
        FontFace::MonoItalic,
        FontFace::MonoBoldItalic,
    ];

    pub fn for_style(style: &RunStyle) -> Self {
        match (style.mono, style.bold, style.italic) {
            (false, false, false) => FontFace::Regular,
            (false, true, false) => FontFace::Bold,
            (false, false, true) => FontFace::Italic,
            (false, true, true) => FontFace::BoldItalic,
            (true, false, false) => FontFace::Mono,
            (true, true, false) => FontFace::MonoBold,
            (true, false, true) => FontFace::MonoItalic,
            (true, true, true) => FontFace::MonoBoldItalic,
        }
    }

    pub fn is_mono(self) -> bool {
        matches!(
            self,
            FontFace::Mono | FontFace::MonoBold | FontFace::MonoItalic | FontFace::MonoBoldItalic
        )
    }

    pub fn is_bold(self) -> bool {
        matches!(
            self,
            FontFace::Bold | FontFace::BoldItalic | FontFace::MonoBold | FontFace::MonoBoldItalic
        )
    }
}

/// Advance width of `c` in em.
pub fn char_width_em(c: char, face: FontFace) -> f32 {
    if face.is_mono() {
        return 0.6;
    }
    let base = match c {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' | ':' | ';' => 0.25,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.333,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.833,
        '0'..='9' => 0.556,
        c if c.is_uppercase() => 0.667,
        _ => 0.5,
    };
    if face.is_bold() {
        base * 1.06
    } else {
        base
    }
}

/// Width of `text` in millimetres at `size_pt`.
pub fn text_width_mm(text: &str, face: FontFace, size_pt: f32) -> f32 {
    text.chars().map(|c| char_width_em(c, face)).sum::<f32>() * size_pt * MM_PER_PT
}

/// A run of same-styled text at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub x_mm: f32,
    /// Baseline, measured from the top edge.
    pub y_mm: f32,
    pub text: String,
    pub face: FontFace,
    pub size_pt: f32,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    Text(PlacedText),
    /// Horizontal line from `x1_mm` to `x2_mm` at `y_mm` (from the top).
    Rule { x1_mm: f32, x2_mm: f32, y_mm: f32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<PageItem>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &PlacedText> {
        self.items.iter().filter_map(|item| match item {
            PageItem::Text(t) => Some(t),
            PageItem::Rule { .. } => None,
        })
    }
}

/// Lay out `blocks` onto pages. Always returns at least one page.
pub fn layout(blocks: &[Block], geometry: &PageGeometry) -> Vec<Page> {
    let mut cursor = Cursor::new(*geometry);

    for block in blocks {
        let indent = f32::from(block.indent) * INDENT_MM;
        let left = geometry.margin_mm + indent;
        let right = geometry.width_mm - geometry.margin_mm;
        let size = block_font_size(block.kind, geometry.font_size);
        let line_h = size * LINE_HEIGHT * MM_PER_PT;

        if block.kind == BlockKind::Rule {
            cursor.gap(line_h * 0.5);
            cursor.ensure_room(line_h * 0.5);
            let y = cursor.y;
            cursor.page().items.push(PageItem::Rule {
                x1_mm: left,
                x2_mm: right,
                y_mm: y,
            });
            cursor.advance(line_h * 0.5);
            continue;
        }

        let width = (right - left).max(size * MM_PER_PT);
        let lines = match block.kind {
            BlockKind::Preformatted => wrap_preformatted(&block.runs, width, size),
            _ => wrap_words(&block.runs, width, size),
        };

        cursor.gap(space_before(block.kind, line_h));

        for (i, line) in lines.into_iter().enumerate() {
            cursor.ensure_room(line_h);
            let baseline = cursor.y + line_h * 0.78;

            if i == 0 {
                if let Some(ref marker) = block.marker {
                    let face = FontFace::Regular;
                    let w = text_width_mm(marker, face, size);
                    cursor.page().items.push(PageItem::Text(PlacedText {
                        x_mm: (left - MARKER_GAP_MM - w).max(0.0),
                        y_mm: baseline,
                        text: marker.clone(),
                        face,
                        size_pt: size,
                        color: None,
                    }));
                }
            }

            for frag in line {
                cursor.page().items.push(PageItem::Text(PlacedText {
                    x_mm: left + frag.x,
                    y_mm: baseline,
                    text: frag.text,
                    face: frag.face,
                    size_pt: size,
                    color: frag.color,
                }));
            }
            cursor.advance(line_h);
        }

        cursor.gap(space_after(block.kind, line_h));
    }

    debug!("Layout: {} block(s) onto {} page(s)", blocks.len(), cursor.pages.len());
    cursor.pages
}

fn block_font_size(kind: BlockKind, base: f32) -> f32 {
    match kind {
        BlockKind::Heading(level) => {
            let idx = usize::from(level.clamp(1, 6)) - 1;
            base * HEADING_SCALE[idx]
        }
        BlockKind::Preformatted => base * 0.9,
        _ => base,
    }
}

fn space_before(kind: BlockKind, line_h: f32) -> f32 {
    match kind {
        BlockKind::Heading(_) => line_h * 0.6,
        BlockKind::Preformatted => line_h * 0.3,
        _ => 0.0,
    }
}

fn space_after(kind: BlockKind, line_h: f32) -> f32 {
    match kind {
        BlockKind::Heading(_) => line_h * 0.3,
        BlockKind::ListItem | BlockKind::TableRow => line_h * 0.15,
        _ => line_h * 0.5,
    }
}

// ── Pagination ───────────────────────────────────────────────────────────

struct Cursor {
    geometry: PageGeometry,
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
            y: geometry.margin_mm,
        }
    }

    fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn at_top(&self) -> bool {
        self.y <= self.geometry.margin_mm
    }

    /// Vertical whitespace; swallowed at the top of a page.
    fn gap(&mut self, mm: f32) {
        if !self.at_top() {
            self.y += mm;
        }
    }

    fn ensure_room(&mut self, mm: f32) {
        if self.y + mm > self.geometry.content_bottom() && !self.at_top() {
            self.pages.push(Page::default());
            self.y = self.geometry.margin_mm;
        }
    }

    fn advance(&mut self, mm: f32) {
        self.y += mm;
    }
}

// ── Line breaking ────────────────────────────────────────────────────────

/// Text positioned relative to the start of its line.
struct Fragment {
    x: f32,
    text: String,
    face: FontFace,
    color: Option<Rgb>,
}

struct LineBuilder {
    lines: Vec<Vec<Fragment>>,
    current: Vec<Fragment>,
    x: f32,
    width: f32,
    size: f32,
}

impl LineBuilder {
    fn new(width: f32, size: f32) -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            x: 0.0,
            width,
            size,
        }
    }

    fn fits(&self, w: f32) -> bool {
        self.x + w <= self.width + 0.01
    }

    fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn push(&mut self, text: &str, style: &RunStyle) {
        let face = FontFace::for_style(style);
        let w = text_width_mm(text, face, self.size);
        match self.current.last_mut() {
            Some(last) if last.face == face && last.color == style.color => last.text.push_str(text),
            _ => self.current.push(Fragment {
                x: self.x,
                text: text.to_string(),
                face,
                color: style.color,
            }),
        }
        self.x += w;
    }

    fn newline(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
        self.x = 0.0;
    }

    /// Place a word that is wider than the whole line, character by character.
    fn push_split(&mut self, word: &str, style: &RunStyle) {
        let face = FontFace::for_style(style);
        for c in word.chars() {
            let mut buf = [0u8; 4];
            let s = c.encode_utf8(&mut buf);
            if !self.is_empty() && !self.fits(text_width_mm(s, face, self.size)) {
                self.newline();
            }
            self.push(s, style);
        }
    }

    fn finish(mut self) -> Vec<Vec<Fragment>> {
        if !self.current.is_empty() || self.lines.is_empty() {
            self.newline();
        }
        self.lines
    }
}

/// Greedy word wrap; `'\n'` forces a break.
fn wrap_words(runs: &[Run], width: f32, size: f32) -> Vec<Vec<Fragment>> {
    let mut lb = LineBuilder::new(width, size);
    let mut pending_space: Option<RunStyle> = None;

    for run in runs {
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                lb.newline();
                pending_space = None;
            }
            let mut rest = segment;
            while !rest.is_empty() {
                if rest.starts_with(' ') {
                    if !lb.is_empty() {
                        pending_space = Some(run.style);
                    }
                    rest = rest.trim_start_matches(' ');
                    continue;
                }
                let end = rest.find(' ').unwrap_or(rest.len());
                let word = &rest[..end];
                rest = &rest[end..];

                let face = FontFace::for_style(&run.style);
                let word_w = text_width_mm(word, face, size);
                let space_w = pending_space
                    .map(|s| text_width_mm(" ", FontFace::for_style(&s), size))
                    .unwrap_or(0.0);

                if !lb.is_empty() && !lb.fits(space_w + word_w) {
                    lb.newline();
                } else if let Some(style) = pending_space {
                    lb.push(" ", &style);
                }
                pending_space = None;

                if lb.is_empty() && word_w > width {
                    lb.push_split(word, &run.style);
                } else {
                    lb.push(word, &run.style);
                }
            }
        }
    }

    lb.finish()
}

/// Keep every line as written; hard-wrap lines wider than `width`.
fn wrap_preformatted(runs: &[Run], width: f32, size: f32) -> Vec<Vec<Fragment>> {
    let mut lb = LineBuilder::new(width, size);
    for run in runs {
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                lb.newline();
            }
            if !segment.is_empty() {
                lb.push_split(segment, &run.style);
            }
        }
    }
    lb.finish()
}
