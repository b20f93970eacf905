//! Front-matter extraction: split a Markdown file into metadata and body.
//!
//! A front-matter block is a delimited header at the very top of the file:
//!
//! ```markdown
//! ---
//! title: Quarterly report
//! layout: article
//! ---
//! # Body starts here
//! ```
//!
//! YAML headers use `---` fences, TOML headers use `+++` fences (three or more
//! of the character, optional trailing spaces). Anything else, including an
//! opening fence that is never closed, means "no front matter": the metadata
//! is empty and the body is the whole file.
//!
//! After parsing, [`load`] injects one derived key, [`STATIC_DIR_KEY`], holding
//! the absolute path of the bundled static-assets directory so layouts can
//! reference stylesheets and fonts without knowing where md2pdf is installed.

use crate::error::Md2PdfError;
use crate::pipeline::input;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Key under which [`load`] exposes the static-assets directory.
pub const STATIC_DIR_KEY: &str = "static_dir";

static RE_YAML_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-{3,}[ \t]*$").unwrap());
static RE_TOML_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+{3,}[ \t]*$").unwrap());

/// Parsed front-matter fields, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: BTreeMap<String, Value>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Read a scalar field (string, number or boolean) as a string.
    ///
    /// Sequences, mappings and nulls yield `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(scalar_to_string)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for FrontMatter {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Result of splitting front matter from Markdown.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Header fields (empty when the file has no front matter).
    pub metadata: FrontMatter,
    /// The Markdown body (everything after the closing fence).
    pub body: String,
}

#[derive(Debug, Clone, Copy)]
enum HeaderFormat {
    Yaml,
    Toml,
}

impl HeaderFormat {
    fn detect(line: &str) -> Option<Self> {
        if RE_YAML_FENCE.is_match(line) {
            Some(HeaderFormat::Yaml)
        } else if RE_TOML_FENCE.is_match(line) {
            Some(HeaderFormat::Toml)
        } else {
            None
        }
    }

    fn is_fence(self, line: &str) -> bool {
        match self {
            HeaderFormat::Yaml => RE_YAML_FENCE.is_match(line),
            HeaderFormat::Toml => RE_TOML_FENCE.is_match(line),
        }
    }

    fn name(self) -> &'static str {
        match self {
            HeaderFormat::Yaml => "YAML",
            HeaderFormat::Toml => "TOML",
        }
    }

    fn parse_fields(self, header: &str) -> Result<FrontMatter, Md2PdfError> {
        if header.trim().is_empty() {
            return Ok(FrontMatter::default());
        }
        let invalid = |detail: String| Md2PdfError::InvalidFrontMatter {
            format: self.name(),
            detail,
        };
        match self {
            HeaderFormat::Yaml => {
                let value: Value =
                    serde_yaml::from_str(header).map_err(|e| invalid(e.to_string()))?;
                Ok(match value {
                    Value::Mapping(map) => map
                        .into_iter()
                        .filter_map(|(k, v)| scalar_to_string(&k).map(|k| (k, v)))
                        .collect(),
                    // a header that is not a mapping carries no usable fields
                    _ => FrontMatter::default(),
                })
            }
            HeaderFormat::Toml => {
                let table: toml::Table = header.parse().map_err(|e: toml::de::Error| {
                    invalid(e.message().to_string())
                })?;
                Ok(table
                    .into_iter()
                    .map(|(k, v)| (k, toml_to_yaml(v)))
                    .collect())
            }
        }
    }
}

/// Split `content` into front matter and Markdown body.
pub fn parse(content: &str) -> Result<ParsedDocument, Md2PdfError> {
    let unmarked = content.trim_start_matches('\u{feff}');
    let text = unmarked.trim_start();
    let mut lines = text.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return Ok(without_header(unmarked));
    };
    let Some(format) = HeaderFormat::detect(strip_eol(first)) else {
        return Ok(without_header(unmarked));
    };

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if format.is_fence(strip_eol(line)) {
            let metadata = format.parse_fields(&text[header_start..offset])?;
            let body = text[offset + line.len()..].to_string();
            debug!(
                "Front matter ({}): {} field(s), body {} bytes",
                format.name(),
                metadata.len(),
                body.len()
            );
            return Ok(ParsedDocument { metadata, body });
        }
        offset += line.len();
    }

    // opening fence without a closing one
    Ok(without_header(unmarked))
}

/// Read `path`, split its front matter and inject [`STATIC_DIR_KEY`].
///
/// The derived key overwrites a same-named key from the file.
pub fn load(path: &Path, static_dir: &Path) -> Result<ParsedDocument, Md2PdfError> {
    let content = input::read_source(path)?;
    let mut doc = parse(&content)?;
    inject_static_dir(&mut doc.metadata, static_dir);
    Ok(doc)
}

/// Insert the absolute static-assets path into `metadata`.
pub fn inject_static_dir(metadata: &mut FrontMatter, static_dir: &Path) {
    let absolute = std::path::absolute(static_dir).unwrap_or_else(|_| static_dir.to_path_buf());
    metadata.insert(
        STATIC_DIR_KEY,
        Value::String(absolute.to_string_lossy().into_owned()),
    );
}

fn without_header(content: &str) -> ParsedDocument {
    ParsedDocument {
        metadata: FrontMatter::default(),
        body: content.to_string(),
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn toml_to_yaml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Value::Number(f.into()),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => Value::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (Value::String(k), toml_to_yaml(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_no_frontmatter() {
        let content = "# Hello\n\nSome content";
        let doc = parse(content).unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn parse_simple_frontmatter() {
        let doc = parse("---\ntitle: Hello\nlayout: article\n---\n# Content").unwrap();
        assert_eq!(doc.metadata.get_str("title").as_deref(), Some("Hello"));
        assert_eq!(doc.metadata.get_str("layout").as_deref(), Some("article"));
        assert_eq!(doc.body, "# Content");
    }

    #[test]
    fn parse_keeps_blank_line_after_fence() {
        let doc = parse("---\ntitle: Test\n---\n\nBody").unwrap();
        assert_eq!(doc.body, "\nBody");
    }

    #[test]
    fn parse_crlf_frontmatter() {
        let doc = parse("---\r\nauthor: Ada\r\n---\r\nBody\r\n").unwrap();
        assert_eq!(doc.metadata.get_str("author").as_deref(), Some("Ada"));
        assert_eq!(doc.body, "Body\r\n");
    }

    #[test]
    fn parse_longer_fences_and_leading_whitespace() {
        let doc = parse("\n\n-----  \nsubject: Maths\n-----\ntext").unwrap();
        assert_eq!(doc.metadata.get_str("subject").as_deref(), Some("Maths"));
        assert_eq!(doc.body, "text");
    }

    #[test]
    fn parse_strips_bom() {
        let doc = parse("\u{feff}---\ntitle: BOM\n---\nx").unwrap();
        assert_eq!(doc.metadata.get_str("title").as_deref(), Some("BOM"));
    }

    #[test]
    fn bom_is_dropped_from_plain_body() {
        let doc = parse("\u{feff}    indented code\n").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "    indented code\n");
    }

    #[test]
    fn parse_empty_frontmatter() {
        let doc = parse("---\n---\n# Content").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "# Content");
    }

    #[test]
    fn unclosed_fence_is_not_frontmatter() {
        let content = "---\ntitle: never closed\n# Heading";
        let doc = parse(content).unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn thematic_break_later_in_file_is_not_frontmatter() {
        let content = "Intro\n\n---\n\nMore";
        let doc = parse(content).unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn non_mapping_header_yields_empty_metadata() {
        let doc = parse("---\n- a\n- b\n---\nBody").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn invalid_yaml_is_fatal() {
        let err = parse("---\ntitle: [unclosed\n---\nBody").unwrap_err();
        assert!(
            matches!(err, Md2PdfError::InvalidFrontMatter { format: "YAML", .. }),
            "got: {err:?}"
        );
    }

    #[test]
    fn scalar_values_read_as_strings() {
        let doc = parse("---\nversion: 3\ndraft: true\ntags: [a, b]\n---\n").unwrap();
        assert_eq!(doc.metadata.get_str("version").as_deref(), Some("3"));
        assert_eq!(doc.metadata.get_str("draft").as_deref(), Some("true"));
        assert_eq!(doc.metadata.get_str("tags"), None);
        assert!(doc.metadata.get("tags").unwrap().is_sequence());
    }

    #[test]
    fn parse_toml_frontmatter() {
        let doc = parse("+++\ntitle = \"Plus\"\npages = 4\n[extra]\nkey = \"v\"\n+++\nBody").unwrap();
        assert_eq!(doc.metadata.get_str("title").as_deref(), Some("Plus"));
        assert_eq!(doc.metadata.get_str("pages").as_deref(), Some("4"));
        assert!(doc.metadata.get("extra").unwrap().is_mapping());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn invalid_toml_is_fatal() {
        let err = parse("+++\ntitle = \n+++\nBody").unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidFrontMatter { format: "TOML", .. }));
    }

    #[test]
    fn load_injects_absolute_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "---\nstatic_dir: ignored\n---\nBody").unwrap();

        let doc = load(&path, Path::new("assets/static")).unwrap();
        let static_dir = doc.metadata.get_str(STATIC_DIR_KEY).unwrap();
        assert!(Path::new(&static_dir).is_absolute(), "got: {static_dir}");
        assert!(static_dir.ends_with("static"), "got: {static_dir}");
    }

    #[test]
    fn load_without_frontmatter_still_injects_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.md");
        std::fs::write(&path, "# Plain").unwrap();

        let doc = load(&path, dir.path()).unwrap();
        assert_eq!(doc.metadata.len(), 1);
        assert_eq!(doc.body, "# Plain");
    }
}
