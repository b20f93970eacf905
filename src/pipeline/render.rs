//! PDF output: draw laid-out pages with printpdf's built-in fonts.
//!
//! ## Why built-in fonts?
//!
//! The 14 standard PDF fonts need no embedding, so output is small and the
//! crate ships no font files. The trade-off is the WinAnsi encoding:
//! characters outside Latin-1 are replaced upstream in [`crate::pipeline::html`]
//! and reported as warnings.
//!
//! ## Coordinate flip
//!
//! Layout measures y from the top edge; PDF measures from the bottom. Every
//! position is converted with `page_height - y` here and nowhere else.

use crate::error::Md2PdfError;
use crate::output::PdfReport;
use crate::pipeline::frontmatter::FrontMatter;
use crate::pipeline::html::{self, Rgb};
use crate::pipeline::layout::{self, FontFace, Page, PageGeometry, PageItem};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

const LAYER_NAME: &str = "Layer 1";
const RULE_GRAY: f32 = 0.6;

/// Document-info tags written into the PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfTags {
    pub author: String,
    pub subject: String,
    pub title: String,
}

impl PdfTags {
    /// Read `author`, `subject` and `title`, each defaulting to `""`.
    pub fn from_metadata(metadata: &FrontMatter) -> Self {
        let field = |key: &str| metadata.get_str(key).unwrap_or_default();
        Self {
            author: field("author"),
            subject: field("subject"),
            title: field("title"),
        }
    }
}

/// Render a composed HTML document into the PDF at `path`.
///
/// Unsupported content does not fail the call; it is reported in
/// [`PdfReport::warnings`]. Only I/O and serialisation problems are errors.
pub fn render_pdf(
    html: &str,
    path: &Path,
    tags: &PdfTags,
    geometry: &PageGeometry,
) -> Result<PdfReport, Md2PdfError> {
    let start = Instant::now();

    let model = html::parse_document(html);
    let pages = layout::layout(&model.blocks, geometry);
    write_pdf(&pages, tags, geometry, path)?;

    for w in &model.warnings {
        warn!("PDF render: {}", w);
    }
    info!(
        "Wrote {} page(s) to {} in {}ms ({} warning(s))",
        pages.len(),
        path.display(),
        start.elapsed().as_millis(),
        model.warnings.len()
    );

    Ok(PdfReport {
        pages: pages.len(),
        warnings: model.warnings,
    })
}

/// Draw `pages` and write the document to `path`, truncating any existing
/// file. An empty slice still produces one blank page.
pub fn write_pdf(
    pages: &[Page],
    tags: &PdfTags,
    geometry: &PageGeometry,
    path: &Path,
) -> Result<(), Md2PdfError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        tags.title.as_str(),
        Mm(geometry.width_mm),
        Mm(geometry.height_mm),
        LAYER_NAME,
    );
    let doc = doc
        .with_author(tags.author.as_str())
        .with_subject(tags.subject.as_str())
        .with_creator("md2pdf")
        .with_producer("md2pdf");

    let fonts = register_fonts(&doc)?;

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(Mm(geometry.width_mm), Mm(geometry.height_mm), LAYER_NAME);
            doc.get_page(p).get_layer(l)
        };
        draw_page(&layer, page, geometry, &fonts)?;
    }

    let file = File::create(path).map_err(|e| Md2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| Md2PdfError::PdfWrite(format!("{e:?}")))?;

    debug!("PDF saved to {}", path.display());
    Ok(())
}

fn register_fonts(doc: &PdfDocumentReference) -> Result<HashMap<FontFace, IndirectFontRef>, Md2PdfError> {
    let mut fonts = HashMap::new();
    for face in FontFace::ALL {
        let font = doc
            .add_builtin_font(builtin_for(face))
            .map_err(|e| Md2PdfError::PdfWrite(format!("cannot register {face:?} font: {e:?}")))?;
        fonts.insert(face, font);
    }
    Ok(fonts)
}

fn builtin_for(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::Regular => BuiltinFont::Helvetica,
        FontFace::Bold => BuiltinFont::HelveticaBold,
        FontFace::Italic => BuiltinFont::HelveticaOblique,
        FontFace::BoldItalic => BuiltinFont::HelveticaBoldOblique,
        FontFace::Mono => BuiltinFont::Courier,
        FontFace::MonoBold => BuiltinFont::CourierBold,
        FontFace::MonoItalic => BuiltinFont::CourierOblique,
        FontFace::MonoBoldItalic => BuiltinFont::CourierBoldOblique,
    }
}

fn draw_page(
    layer: &PdfLayerReference,
    page: &Page,
    geometry: &PageGeometry,
    fonts: &HashMap<FontFace, IndirectFontRef>,
) -> Result<(), Md2PdfError> {
    let flip = |y: f32| Mm(geometry.height_mm - y);

    for item in &page.items {
        match item {
            PageItem::Text(t) => {
                let font = fonts
                    .get(&t.face)
                    .ok_or_else(|| Md2PdfError::PdfWrite(format!("font {:?} not registered", t.face)))?;
                layer.set_fill_color(pdf_color(t.color.unwrap_or_default()));
                layer.use_text(t.text.as_str(), t.size_pt, Mm(t.x_mm), flip(t.y_mm), font);
            }
            PageItem::Rule { x1_mm, x2_mm, y_mm } => {
                layer.set_outline_color(Color::Rgb(printpdf::Rgb::new(RULE_GRAY, RULE_GRAY, RULE_GRAY, None)));
                layer.set_outline_thickness(0.5);
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm(*x1_mm), flip(*y_mm)), false),
                        (Point::new(Mm(*x2_mm), flip(*y_mm)), false),
                    ],
                    is_closed: false,
                });
            }
        }
    }
    Ok(())
}

fn pdf_color(rgb: Rgb) -> Color {
    let channel = |c: u8| f32::from(c) / 255.0;
    Color::Rgb(printpdf::Rgb::new(channel(rgb.r), channel(rgb.g), channel(rgb.b), None))
}
