//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! run can be logged and compared against another in full.

use crate::error::Md2PdfError;
use crate::pipeline::layout::PageGeometry;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Syntax-highlighting themes bundled with syntect's default theme set.
pub const HIGHLIGHT_THEMES: &[&str] = &[
    "InspiredGitHub",
    "Solarized (dark)",
    "Solarized (light)",
    "base16-eighties.dark",
    "base16-mocha.dark",
    "base16-ocean.dark",
    "base16-ocean.light",
];

/// Theme used when none is configured explicitly.
pub const DEFAULT_HIGHLIGHT_THEME: &str = "InspiredGitHub";

/// Configuration for a Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2pdf::{ConversionConfig, PageSize};
///
/// let config = ConversionConfig::builder()
///     .layout("article")
///     .page_size(PageSize::Letter)
///     .margin_mm(15.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Directory holding the bundled `templates/` and `static/` folders.
    /// Default: the directory containing the running executable.
    pub install_root: PathBuf,

    /// Fallback layout name, used only when the front matter has no `layout`
    /// key. Default: empty (no fallback).
    pub layout: String,

    /// Where to write the composed HTML before rasterisation. Default: `None`.
    pub trace_path: Option<PathBuf>,

    /// Paper size of every page. Default: A4.
    pub page_size: PageSize,

    /// Uniform page margin in millimetres. Range: 5–60. Default: 20.
    pub margin_mm: f32,

    /// Body text size in points; headings scale from it. Range: 6–24. Default: 11.
    pub font_size: f32,

    /// syntect theme for fenced code blocks. `None` emits CSS classes
    /// instead of inline colours. Default: `InspiredGitHub`.
    pub highlight_theme: Option<String>,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            layout: String::new(),
            trace_path: None,
            page_size: PageSize::default(),
            margin_mm: 20.0,
            font_size: 11.0,
            highlight_theme: Some(DEFAULT_HIGHLIGHT_THEME.to_string()),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("install_root", &self.install_root)
            .field("layout", &self.layout)
            .field("trace_path", &self.trace_path)
            .field("page_size", &self.page_size)
            .field("margin_mm", &self.margin_mm)
            .field("font_size", &self.font_size)
            .field("highlight_theme", &self.highlight_theme)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// `<install_root>/templates`: the only place layouts are looked up.
    pub fn templates_dir(&self) -> PathBuf {
        self.install_root.join("templates")
    }

    /// `<install_root>/static`: exposed to templates as `static_dir`.
    pub fn static_dir(&self) -> PathBuf {
        self.install_root.join("static")
    }

    /// Page dimensions and text size handed to the PDF layout engine.
    pub fn geometry(&self) -> PageGeometry {
        let (width_mm, height_mm) = self.page_size.dimensions_mm();
        PageGeometry {
            width_mm,
            height_mm,
            margin_mm: self.margin_mm,
            font_size: self.font_size,
        }
    }
}

/// Directory shipped with the bundled `templates/` and `static/`.
pub const BUNDLED_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// Directory of the running executable when it holds a `templates/`
/// directory, otherwise [`BUNDLED_ROOT`].
pub fn default_install_root() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    install_root_near(exe_dir.as_deref())
}

fn install_root_near(exe_dir: Option<&Path>) -> PathBuf {
    match exe_dir {
        Some(dir) if dir.join("templates").is_dir() => dir.to_path_buf(),
        _ => PathBuf::from(BUNDLED_ROOT),
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.install_root = root.into();
        self
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.config.layout = layout.into();
        self
    }

    pub fn trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.trace_path = Some(path.into());
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn margin_mm(mut self, mm: f32) -> Self {
        self.config.margin_mm = mm;
        self
    }

    pub fn font_size(mut self, pt: f32) -> Self {
        self.config.font_size = pt;
        self
    }

    /// `None` switches highlighting to class-based markup.
    pub fn highlight_theme(mut self, theme: Option<String>) -> Self {
        self.config.highlight_theme = theme;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        if !(5.0..=60.0).contains(&c.margin_mm) {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Margin must be 5–60 mm, got {}",
                c.margin_mm
            )));
        }
        if !(6.0..=24.0).contains(&c.font_size) {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Font size must be 6–24 pt, got {}",
                c.font_size
            )));
        }
        if let Some(ref theme) = c.highlight_theme {
            if !HIGHLIGHT_THEMES.contains(&theme.as_str()) {
                return Err(Md2PdfError::InvalidConfig(format!(
                    "Unknown highlight theme '{}'. Available: {}",
                    theme,
                    HIGHLIGHT_THEMES.join(", ")
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Paper size used for every page of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
    /// 8.5 × 14 in.
    Legal,
}

impl PageSize {
    /// `(width, height)` in millimetres, portrait orientation.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
        }
    }
}
