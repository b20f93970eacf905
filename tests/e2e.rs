//! End-to-end tests for the md2pdf library.
//!
//! Every test builds its own install root (templates/ + static/) in a temp
//! directory, except the ones exercising the bundled templates at the crate
//! root.

use md2pdf::{compose_str, convert, convert_str, ConversionConfig, Md2PdfError, PdfTags, RenderWarning};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Temp install root holding the given templates.
fn install_root(templates: &[(&str, &str)]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("templates")).unwrap();
    std::fs::create_dir_all(root.path().join("static")).unwrap();
    for (name, body) in templates {
        std::fs::write(root.path().join("templates").join(name), body).unwrap();
    }
    root
}

fn config_for(root: &Path) -> ConversionConfig {
    ConversionConfig::builder().install_root(root).build().unwrap()
}

fn bundled_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn assert_pdf(path: &Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(!bytes.is_empty(), "{} is empty", path.display());
    assert!(bytes.starts_with(b"%PDF"), "{} is not a PDF", path.display());
}

const CODE_DOC: &str = "---\nlayout: page\n---\n# Code\n\n```rust\nfn main() {\n    let x = 1;\n}\n```\n";

// ── Layout selection ─────────────────────────────────────────────────────────

#[test]
fn front_matter_layout_beats_fallback() {
    let root = install_root(&[("a.html", "A:{{ html_content }}"), ("b.html", "B:{{ html_content }}")]);
    let config = ConversionConfig::builder()
        .install_root(root.path())
        .layout("b")
        .build()
        .unwrap();

    let doc = compose_str("---\nlayout: a\n---\ntext\n", &config).unwrap();
    assert_eq!(doc.layout, "a");
    assert!(doc.html.starts_with("A:"), "got: {}", doc.html);
}

#[test]
fn fallback_layout_used_without_front_matter() {
    let root = install_root(&[("b.html", "B:{{ html_content }}")]);
    let config = ConversionConfig::builder()
        .install_root(root.path())
        .layout("b")
        .build()
        .unwrap();

    let doc = compose_str("text\n", &config).unwrap();
    assert!(doc.html.starts_with("B:"));
}

#[test]
fn missing_layout_creates_no_output() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let input = root.path().join("doc.md");
    std::fs::write(&input, "# No front matter\n").unwrap();
    let output = root.path().join("doc.pdf");
    let trace = root.path().join("trace.html");
    let config = ConversionConfig::builder()
        .install_root(root.path())
        .trace_path(&trace)
        .build()
        .unwrap();

    let err = convert(&input, &output, &config).unwrap_err();
    assert!(matches!(err, Md2PdfError::MissingLayout), "got: {err:?}");
    assert!(!output.exists());
    assert!(!trace.exists());
}

#[test]
fn unknown_layout_is_fatal() {
    let root = install_root(&[("page.html", "x")]);
    let output = root.path().join("out.pdf");
    let err = convert_str("---\nlayout: nowhere\n---\nx", &output, &config_for(root.path())).unwrap_err();
    assert!(matches!(err, Md2PdfError::TemplateNotFound { .. }), "got: {err:?}");
    assert!(!output.exists());
}

#[test]
fn broken_sibling_template_is_ignored() {
    let root = install_root(&[("p.html", "{{ html_content }}"), ("broken.html", "{{ oops ")]);
    let doc = compose_str("---\nlayout: p\n---\nx", &config_for(root.path())).unwrap();
    assert_eq!(doc.html, "<p>x</p>\n");
}

// ── Trace ────────────────────────────────────────────────────────────────────

#[test]
fn trace_matches_html_given_to_pdf_stage() {
    let root = install_root(&[("page.html", "<html><body>{{ html_content }}</body></html>")]);
    let trace = root.path().join("trace.html");
    let output = root.path().join("out.pdf");
    let config = ConversionConfig::builder()
        .install_root(root.path())
        .trace_path(&trace)
        .build()
        .unwrap();

    let result = convert_str(CODE_DOC, &output, &config).unwrap();
    let traced = std::fs::read_to_string(&trace).unwrap();
    assert_eq!(traced, result.html);
    assert_pdf(&output);
}

// ── Markdown features ────────────────────────────────────────────────────────

#[test]
fn fenced_code_is_highlighted_deterministically() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let config = config_for(root.path());

    let first = compose_str(CODE_DOC, &config).unwrap().html;
    let second = compose_str(CODE_DOC, &config).unwrap().html;

    assert!(first.contains("<pre"), "got: {first}");
    assert!(first.contains("language-rust"), "got: {first}");
    assert!(first.contains("<span style="), "got: {first}");
    assert_eq!(first, second);
}

#[test]
fn toc_marker_expands_in_document() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let doc = compose_str(
        "---\nlayout: page\n---\n[TOC]\n\n# Alpha\n\n## Beta\n",
        &config_for(root.path()),
    )
    .unwrap();
    assert!(doc.html.contains("<a href=\"#alpha\">Alpha</a>"), "got: {}", doc.html);
    assert!(doc.html.contains("<a href=\"#beta\">Beta</a>"));
}

// ── Front matter & context ───────────────────────────────────────────────────

#[test]
fn static_dir_points_into_install_root() {
    let root = install_root(&[("page.html", "{{ static_dir }}")]);
    let doc = compose_str("---\nlayout: page\nstatic_dir: /elsewhere\n---\n", &config_for(root.path())).unwrap();
    let expected = std::path::absolute(root.path().join("static")).unwrap();
    assert_eq!(doc.html, expected.to_string_lossy());
}

#[test]
fn toml_front_matter_works_end_to_end() {
    let root = install_root(&[("page.html", "{{ title }} by {{ metadata.author }}")]);
    let doc = compose_str(
        "+++\nlayout = \"page\"\ntitle = \"Notes\"\nauthor = \"Ada\"\n+++\nbody\n",
        &config_for(root.path()),
    )
    .unwrap();
    assert_eq!(doc.html, "Notes by Ada");
}

#[test]
fn malformed_front_matter_is_fatal() {
    let root = install_root(&[("page.html", "x")]);
    let output = root.path().join("out.pdf");
    let err = convert_str("---\nlayout: [unclosed\n---\n", &output, &config_for(root.path())).unwrap_err();
    assert!(matches!(err, Md2PdfError::InvalidFrontMatter { .. }), "got: {err:?}");
}

#[test]
fn missing_input_is_fatal() {
    let root = install_root(&[]);
    let err = convert(
        root.path().join("absent.md"),
        root.path().join("out.pdf"),
        &config_for(root.path()),
    )
    .unwrap_err();
    assert!(matches!(err, Md2PdfError::InputNotFound { .. }));
}

// ── PDF stage ────────────────────────────────────────────────────────────────

#[test]
fn absent_tags_default_to_empty() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let output = root.path().join("out.pdf");
    let result = convert_str("---\nlayout: page\n---\nbody\n", &output, &config_for(root.path())).unwrap();

    let tags = PdfTags::from_metadata(&result.metadata);
    assert_eq!(tags.author, "");
    assert_eq!(tags.subject, "");
    assert_eq!(tags.title, "");
    assert_pdf(&output);

    let bytes = std::fs::read(&output).unwrap();
    assert!(contains_bytes(&bytes, b"/Author()"), "no empty /Author entry");
    assert!(contains_bytes(&bytes, b"/Subject()"), "no empty /Subject entry");
}

#[test]
fn present_tags_are_taken_from_front_matter() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let output = root.path().join("out.pdf");
    let md = "---\nlayout: page\nauthor: Ada\nsubject: Engines\ntitle: Notes\n---\nbody\n";
    let result = convert_str(md, &output, &config_for(root.path())).unwrap();

    let tags = PdfTags::from_metadata(&result.metadata);
    assert_eq!(
        tags,
        PdfTags {
            author: "Ada".into(),
            subject: "Engines".into(),
            title: "Notes".into(),
        }
    );
}

#[test]
fn render_warnings_keep_the_pdf() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let output = root.path().join("out.pdf");
    let md = "---\nlayout: page\n---\nSee ![logo](logo.png) \u{2192} here.\n\n<video src=\"a.mp4\"></video>\n";

    let result = convert_str(md, &output, &config_for(root.path())).unwrap();
    assert!(result.pdf.has_errors());
    assert!(result
        .pdf
        .warnings
        .contains(&RenderWarning::UnsupportedElement { tag: "img".into() }));
    assert!(result
        .pdf
        .warnings
        .iter()
        .any(|w| matches!(w, RenderWarning::UnencodableCharacter { ch: '\u{2192}', .. })));
    assert_eq!(result.pdf.summary(), format!("*** {} ERRORS OCCURRED", result.pdf.error_count()));
    assert_pdf(&output);
}

#[test]
fn existing_output_is_overwritten() {
    let root = install_root(&[("page.html", "{{ html_content }}")]);
    let output = root.path().join("out.pdf");
    std::fs::write(&output, "stale").unwrap();
    convert_str("---\nlayout: page\n---\nfresh\n", &output, &config_for(root.path())).unwrap();
    assert_pdf(&output);
}

// ── Bundled assets ───────────────────────────────────────────────────────────

#[test]
fn bundled_default_layout_renders() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");
    let config = ConversionConfig::builder().install_root(bundled_root()).build().unwrap();

    let md = "---\nlayout: default\ntitle: Bundled\n---\n# Section\n\nSome *text*.\n";
    let result = convert_str(md, &output, &config).unwrap();
    assert!(result.html.contains("<title>Bundled</title>"));
    assert!(result.html.contains("style.css"));
    assert!(!result.pdf.has_errors(), "warnings: {:?}", result.pdf.warnings);
    assert_pdf(&output);
}

#[test]
fn bundled_article_layout_renders_without_optional_keys() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");
    let config = ConversionConfig::builder().install_root(bundled_root()).build().unwrap();

    let result = convert_str("---\nlayout: article\n---\n# Only a heading\n", &output, &config).unwrap();
    assert!(result.html.contains("<div class=\"toc\">"));
    assert_pdf(&output);
}
