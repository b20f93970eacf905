//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::{convert, ConversionConfig, ConversionProgressCallback, Md2PdfError, PageSize, ProgressCallback, Stage};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// File name of the trace written by `--trace`, relative to the working directory.
const TRACE_FILE: &str = "trace.html";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current stage, with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Remove the spinner without printing anything (used on failure).
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.label());
        self.bar.set_message(dim(&format!("stage {}/{}", stage.position(), Stage::ALL.len())));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<9} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{elapsed_ms}ms"))
        ));
    }

    fn on_conversion_complete(&self, _pages: usize, _warnings: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Layout named in the document's front matter
  md2pdf -i report.md -o report.pdf

  # Fallback layout when the front matter has none
  md2pdf -i notes.md -o notes.pdf --layout article

  # Keep the composed HTML in ./trace.html for debugging
  md2pdf -i notes.md -o notes.pdf --trace

  # US Letter, tighter margins, no syntax colours
  md2pdf -i notes.md -o notes.pdf --page-size letter --margin 12 --highlight-theme none

FRONT MATTER:
  ---
  layout: article        # selects <home>/templates/article.html
  title: Quarterly report
  author: Ada Lovelace
  subject: Finance
  ---

  TOML front matter (+++ fences) is accepted as well. Every key is available
  to the template, plus {{ html_content }}, {{ toc }}, {{ metadata }} and
  {{ static_dir }}.

ENVIRONMENT VARIABLES:
  MD2PDF_HOME             Directory holding templates/ and static/
  MD2PDF_LAYOUT           Fallback layout name
  RUST_LOG                Override the log filter (e.g. md2pdf=debug)
"#;

/// Convert Markdown documents to PDF through HTML layout templates.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown documents to PDF through HTML layout templates",
    long_about = "Convert a Markdown document with optional YAML/TOML front matter to PDF. \
The Markdown is rendered to HTML, merged into a layout template from <home>/templates, \
and the result is laid out and written as a PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown source file.
    #[arg(short, long)]
    input: PathBuf,

    /// PDF file to write (overwritten if it exists).
    #[arg(short, long)]
    output: PathBuf,

    /// Layout template used when the front matter names none.
    #[arg(short, long, env = "MD2PDF_LAYOUT", default_value = "")]
    layout: String,

    /// Write the composed HTML to ./trace.html before rendering.
    #[arg(long, env = "MD2PDF_TRACE")]
    trace: bool,

    /// Install root holding templates/ and static/ [default: executable's directory
    /// if it has templates/, else the bundled assets].
    #[arg(long, env = "MD2PDF_HOME")]
    home: Option<PathBuf>,

    /// Paper size.
    #[arg(long, env = "MD2PDF_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Page margin in millimetres (5–60).
    #[arg(long, env = "MD2PDF_MARGIN", default_value_t = 20.0)]
    margin: f32,

    /// Body font size in points (6–24).
    #[arg(long, env = "MD2PDF_FONT_SIZE", default_value_t = 11.0)]
    font_size: f32,

    /// syntect theme for code blocks, or "none" for class-based markup.
    #[arg(long, env = "MD2PDF_HIGHLIGHT_THEME", default_value = "InspiredGitHub")]
    highlight_theme: String,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::Legal => PageSize::Legal,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);

    let config = match build_config(&cli, progress_cb) {
        Ok(config) => config,
        Err(e) => {
            if let Some(ref s) = spinner {
                s.clear();
            }
            return Err(e);
        }
    };

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert(&cli.input, &cli.output, &config);
    if let Some(ref s) = spinner {
        s.clear();
    }

    let output = match result {
        Ok(output) => output,
        Err(Md2PdfError::MissingLayout) => {
            // not a failure: report and exit 0 without creating anything
            println!("{}", Md2PdfError::MissingLayout);
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to convert {}", cli.input.display()));
        }
    };

    if !cli.quiet {
        eprintln!(
            "{}  {} page(s)  {}ms  →  {}",
            if output.pdf.has_errors() { yellow("⚠") } else { green("✔") },
            output.pdf.pages,
            output.stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if cli.trace {
            eprintln!("   {}", dim(&format!("trace: {TRACE_FILE}")));
        }
    }

    if output.pdf.has_errors() {
        println!("{}", output.pdf.summary());
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let theme = match cli.highlight_theme.trim() {
        t if t.eq_ignore_ascii_case("none") => None,
        t => Some(t.to_string()),
    };

    let mut builder = ConversionConfig::builder()
        .layout(cli.layout.clone())
        .page_size(cli.page_size.into())
        .margin_mm(cli.margin)
        .font_size(cli.font_size)
        .highlight_theme(theme);

    if let Some(ref home) = cli.home {
        builder = builder.install_root(home.clone());
    }
    if cli.trace {
        builder = builder.trace_path(TRACE_FILE);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
