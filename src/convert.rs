//! Conversion entry points.
//!
//! [`convert`] runs all four stages and writes the PDF; [`compose`] stops
//! after the template stage and returns the HTML without touching the
//! filesystem. Both resolve the layout before anything is written, so a
//! missing layout never leaves a half-created output behind.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::output::{ComposedDocument, ConversionOutput, ConversionStats};
use crate::pipeline::frontmatter::{self, ParsedDocument};
use crate::pipeline::markdown::{self, MarkdownOptions};
use crate::pipeline::render::{self, PdfTags};
use crate::pipeline::template::{self, TemplateSet};
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert the Markdown file at `input` into a PDF at `output`.
///
/// # Returns
/// `Ok(ConversionOutput)` whenever the PDF was written, even if the renderer
/// had to skip content (check `output.pdf.warnings`).
///
/// # Errors
/// - [`Md2PdfError::MissingLayout`] when neither the front matter nor the
///   config names a layout; nothing is written in that case
/// - input, front-matter, template, trace and output failures
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let input = input.as_ref();
    info!("Starting conversion: {}", input.display());

    let static_dir = config.static_dir();
    let (doc, frontmatter_ms) = run_stage(config, Stage::FrontMatter, || {
        frontmatter::load(input, &static_dir)
    })?;
    finish(doc, output.as_ref(), config, frontmatter_ms)
}

/// Like [`convert`], with the Markdown source given as a string.
pub fn convert_str(
    source: &str,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let (doc, frontmatter_ms) = run_stage(config, Stage::FrontMatter, || parse_source(source, config))?;
    finish(doc, output.as_ref(), config, frontmatter_ms)
}

/// Run stages 1–3 on the file at `input` and return the composed HTML.
///
/// No file is written, not even the trace.
pub fn compose(input: impl AsRef<Path>, config: &ConversionConfig) -> Result<ComposedDocument, Md2PdfError> {
    let doc = frontmatter::load(input.as_ref(), &config.static_dir())?;
    let (composed, _, _) = compose_parsed(doc, config)?;
    Ok(composed)
}

/// Like [`compose`], with the Markdown source given as a string.
pub fn compose_str(source: &str, config: &ConversionConfig) -> Result<ComposedDocument, Md2PdfError> {
    let doc = parse_source(source, config)?;
    let (composed, _, _) = compose_parsed(doc, config)?;
    Ok(composed)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn parse_source(source: &str, config: &ConversionConfig) -> Result<ParsedDocument, Md2PdfError> {
    let mut doc = frontmatter::parse(source)?;
    frontmatter::inject_static_dir(&mut doc.metadata, &config.static_dir());
    Ok(doc)
}

/// Stages 2 and 3. Returns the document plus both stage durations.
fn compose_parsed(
    doc: ParsedDocument,
    config: &ConversionConfig,
) -> Result<(ComposedDocument, u64, u64), Md2PdfError> {
    // ── Step 2: Resolve layout ───────────────────────────────────────────
    // before any output exists
    let layout = template::resolve_layout(&doc.metadata, &config.layout)?;
    debug!("Using layout '{}'", layout);

    // ── Step 3: Markdown → HTML fragment ─────────────────────────────────
    let options = MarkdownOptions {
        highlight_theme: config.highlight_theme.clone(),
    };
    let (rendered, markdown_ms) = run_stage(config, Stage::Markdown, || Ok(markdown::render(&doc.body, &options)))?;

    // ── Step 4: Compose into the layout template ─────────────────────────
    let (html, template_ms) = run_stage(config, Stage::Template, || {
        let templates = TemplateSet::load(&config.templates_dir())?;
        debug!("Loaded templates: {:?}", templates.names());
        let context = template::build_context(&doc.metadata, &rendered)?;
        templates.render(&layout, &context)
    })?;

    Ok((
        ComposedDocument {
            layout,
            metadata: doc.metadata,
            html,
        },
        markdown_ms,
        template_ms,
    ))
}

fn finish(
    doc: ParsedDocument,
    output: &Path,
    config: &ConversionConfig,
    frontmatter_ms: u64,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();
    let (composed, markdown_ms, template_ms) = compose_parsed(doc, config)?;

    // ── Step 5: Trace ────────────────────────────────────────────────────
    if let Some(ref trace) = config.trace_path {
        std::fs::write(trace, &composed.html).map_err(|e| Md2PdfError::TraceWriteFailed {
            path: trace.clone(),
            source: e,
        })?;
        info!("Trace written to {}", trace.display());
    }

    // ── Step 6: Rasterise to PDF ─────────────────────────────────────────
    let tags = PdfTags::from_metadata(&composed.metadata);
    let geometry = config.geometry();
    let (report, pdf_ms) = run_stage(config, Stage::Pdf, || {
        render::render_pdf(&composed.html, output, &tags, &geometry)
    })?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(report.pages, report.error_count());
    }

    let stats = ConversionStats {
        frontmatter_duration_ms: frontmatter_ms,
        markdown_duration_ms: markdown_ms,
        template_duration_ms: template_ms,
        pdf_duration_ms: pdf_ms,
        total_duration_ms: frontmatter_ms + total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} page(s), {} warning(s), {}ms",
        report.pages,
        report.error_count(),
        stats.total_duration_ms
    );

    Ok(ConversionOutput {
        layout: composed.layout,
        metadata: composed.metadata,
        html: composed.html,
        pdf: report,
        stats,
    })
}

/// Run one stage, firing progress callbacks and timing it.
fn run_stage<T>(
    config: &ConversionConfig,
    stage: Stage,
    f: impl FnOnce() -> Result<T, Md2PdfError>,
) -> Result<(T, u64), Md2PdfError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    let value = f()?;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms);
    }
    debug!("Stage {}/4 ({}) finished in {}ms", stage.position(), stage, elapsed_ms);
    Ok((value, elapsed_ms))
}
