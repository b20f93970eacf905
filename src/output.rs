//! Result types produced by a conversion.

use crate::error::RenderWarning;
use crate::pipeline::frontmatter::FrontMatter;
use serde::{Deserialize, Serialize};

/// Outcome of the PDF stage.
///
/// Warnings are non-fatal: a report with warnings still describes a PDF that
/// was fully written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfReport {
    /// Number of pages written (always at least one).
    pub pages: usize,
    /// Problems met while rasterising, in document order.
    pub warnings: Vec<RenderWarning>,
}

impl PdfReport {
    /// How many rendering errors were accumulated.
    pub fn error_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// One-line summary printed after a run that accumulated warnings.
    pub fn summary(&self) -> String {
        format!("*** {} ERRORS OCCURRED", self.error_count())
    }
}

/// Output of stages 1–3: the document as it will be handed to the PDF stage.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedDocument {
    /// Layout template that was rendered (base name, no extension).
    pub layout: String,
    /// Front matter including the injected `static_dir`.
    pub metadata: FrontMatter,
    /// Complete HTML document.
    pub html: String,
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub frontmatter_duration_ms: u64,
    pub markdown_duration_ms: u64,
    pub template_duration_ms: u64,
    pub pdf_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a full conversion produced besides the PDF file itself.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Layout template that was rendered.
    pub layout: String,
    /// Front matter including the injected `static_dir`.
    pub metadata: FrontMatter,
    /// The exact HTML passed to the PDF stage (and to the trace file).
    pub html: String,
    /// PDF stage result.
    pub pdf: PdfReport,
    pub stats: ConversionStats,
}
