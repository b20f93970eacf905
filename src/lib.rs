//! # md2pdf
//!
//! Convert a Markdown document with optional front matter into a PDF, by way
//! of an HTML layout template.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown file
//!  │
//!  ├─ 1. Front matter  split YAML (---) or TOML (+++) header from the body
//!  ├─ 2. Markdown      comrak → HTML fragment, syntect-highlighted code, heading ids
//!  ├─ 3. Template      tera layout from <install_root>/templates, chosen by
//!  │                   front-matter `layout` or the configured fallback
//!  ├─ 4. PDF           HTML → styled blocks → wrapped pages → printpdf
//!  └─ 5. Output        PDF file + report of anything that could not be drawn
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{convert, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .install_root("/usr/local/share/md2pdf")
//!         .layout("article")
//!         .build()?;
//!     let output = convert("notes.md", "notes.pdf", &config)?;
//!     if output.pdf.has_errors() {
//!         eprintln!("{}", output.pdf.summary());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Install Root
//!
//! Layouts and static assets are looked up relative to one directory, by
//! default the one holding the executable, or the crate's bundled assets
//! when no `templates/` sits next to it:
//!
//! ```text
//! <install_root>/
//!   templates/<layout>.html   Jinja2-style layouts
//!   static/                   stylesheets etc., exposed as {{ static_dir }}
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSize};
pub use convert::{compose, compose_str, convert, convert_str};
pub use error::{Md2PdfError, RenderWarning};
pub use output::{ComposedDocument, ConversionOutput, ConversionStats, PdfReport};
pub use pipeline::frontmatter::FrontMatter;
pub use pipeline::render::PdfTags;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
