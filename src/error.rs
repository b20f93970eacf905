//! Error types for the md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the conversion cannot proceed at all
//!   (missing input, malformed front matter, unknown template, unwritable
//!   output). Returned as `Err(Md2PdfError)` from the top-level `convert*`
//!   functions.
//!
//! * [`RenderWarning`] — **Non-fatal**: the PDF renderer met something it
//!   could not draw faithfully (an `<img>`, a character outside the font
//!   encoding). The PDF is still written; warnings are collected in
//!   [`crate::output::PdfReport`] and only their count is surfaced by the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2pdf library.
///
/// Rendering problems that still allow a PDF to be produced use
/// [`RenderWarning`] and are stored in [`crate::output::PdfReport`].
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The front-matter block is not valid YAML/TOML.
    #[error("Invalid front matter ({format}): {detail}")]
    InvalidFrontMatter { format: &'static str, detail: String },

    // ── Template errors ───────────────────────────────────────────────────
    /// Neither the front matter nor `--layout` named a layout template.
    #[error(
        "No layout template selected.\n\
Add `layout: <name>` to the document's front matter or pass --layout <name>."
    )]
    MissingLayout,

    /// The templates directory has no `<name>.html`.
    #[error("Template not found: '{name}' (looked in {dir:?})")]
    TemplateNotFound { name: String, dir: PathBuf },

    /// The template engine failed to load or render a template.
    #[error("Template rendering failed: {0}")]
    TemplateRender(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not write the trace HTML file.
    #[error("Failed to write trace file '{path}': {source}")]
    TraceWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF writer itself failed (font registration, serialisation).
    #[error("PDF generation failed: {0}")]
    PdfWrite(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<tera::Error> for Md2PdfError {
    fn from(e: tera::Error) -> Self {
        Md2PdfError::TemplateRender(tera_detail(&e))
    }
}

/// Flatten a tera error and its source chain into one line.
pub(crate) fn tera_detail(e: &tera::Error) -> String {
    // tera keeps the interesting part (line, missing variable) in the source chain
    let mut detail = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        detail.push_str(": ");
        detail.push_str(&inner.to_string());
        source = inner.source();
    }
    detail
}

/// A non-fatal problem met while rasterising the composed HTML.
///
/// The renderer keeps going after each of these; the PDF is produced with
/// the offending content skipped or substituted.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderWarning {
    /// An element the renderer cannot draw (images, media, forms, …).
    #[error("<{tag}> is not supported and was skipped")]
    UnsupportedElement { tag: String },

    /// A character the built-in PDF fonts cannot encode; drawn as `?`.
    #[error("character {ch:?} (U+{code:04X}) cannot be encoded and was replaced")]
    UnencodableCharacter { ch: char, code: u32 },

    /// An inline `color:` declaration that could not be parsed.
    #[error("invalid colour value '{value}'")]
    InvalidColor { value: String },

    /// The HTML could not be parsed at all; an empty page was produced.
    #[error("HTML could not be parsed: {detail}")]
    UnparseableHtml { detail: String },
}
