//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! when each of the four pipeline stages starts and finishes.
//!
//! # Example
//!
//! ```rust
//! use md2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl ConversionProgressCallback for StageLogger {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{} done in {elapsed_ms}ms", stage.label());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StageLogger))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One of the four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    FrontMatter,
    Markdown,
    Template,
    Pdf,
}

impl Stage {
    /// All stages in the order the pipeline runs them.
    pub const ALL: [Stage; 4] = [Stage::FrontMatter, Stage::Markdown, Stage::Template, Stage::Pdf];

    /// Short human-readable label used by the CLI spinner.
    pub fn label(self) -> &'static str {
        match self {
            Stage::FrontMatter => "Reading",
            Stage::Markdown => "Markdown",
            Stage::Template => "Layout",
            Stage::Pdf => "PDF",
        }
    }

    /// 1-based position of the stage in the pipeline.
    pub fn position(self) -> usize {
        match self {
            Stage::FrontMatter => 1,
            Stage::Markdown => 2,
            Stage::Template => 3,
            Stage::Pdf => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the conversion pipeline around each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, so calls never overlap.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called right before `stage` begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after `stage` finished successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once the PDF has been written.
    ///
    /// `warnings` is the number of non-fatal rendering problems.
    fn on_conversion_complete(&self, pages: usize, warnings: usize) {
        let _ = (pages, warnings);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
