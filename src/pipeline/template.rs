//! Template compositor: merge front matter and the HTML fragment into a
//! layout template.
//!
//! Layouts are Jinja2-style templates rendered with `tera`. They are loaded
//! only from `<install_root>/templates`, recursively, and autoescaping is
//! off so `html_content` is inserted verbatim.

use crate::error::{tera_detail, Md2PdfError};
use crate::pipeline::frontmatter::FrontMatter;
use crate::pipeline::markdown::RenderedMarkdown;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tera::{Context, Template, Tera};
use tracing::{debug, warn};

const TEMPLATE_EXT: &str = "html";

/// Pick the layout name: front matter first, then the fallback.
///
/// Empty or whitespace-only values count as absent. A trailing `.html` is
/// stripped, so `report` and `report.html` select the same template.
pub fn resolve_layout(metadata: &FrontMatter, fallback: &str) -> Result<String, Md2PdfError> {
    let from_front_matter = metadata.get_str("layout");
    let chosen = from_front_matter
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(fallback.trim()).filter(|s| !s.is_empty()))
        .ok_or(Md2PdfError::MissingLayout)?;

    let name = chosen.strip_suffix(".html").unwrap_or(chosen);
    Ok(name.to_string())
}

/// All layout templates found under one directory.
pub struct TemplateSet {
    tera: Tera,
    dir: PathBuf,
    /// Templates that failed to load, with the reason.
    broken: BTreeMap<String, String>,
}

impl TemplateSet {
    /// Load every `*.html` under `templates_dir`.
    ///
    /// A missing directory yields an empty set; the failure then surfaces
    /// as [`Md2PdfError::TemplateNotFound`] when a layout is rendered.
    /// Files that do not parse are skipped with a warning, together with
    /// anything extending or importing them, and only reported if that
    /// layout is the one rendered.
    pub fn load(templates_dir: &Path) -> Result<Self, Md2PdfError> {
        let mut files = Vec::new();
        if templates_dir.is_dir() {
            collect_templates(templates_dir, templates_dir, &mut files).map_err(|e| {
                Md2PdfError::TemplateRender(format!(
                    "cannot read templates directory {}: {e}",
                    templates_dir.display()
                ))
            })?;
        }
        files.sort();

        // ── Parse each file on its own ───────────────────────────────────
        let mut parsed: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
        let mut broken = BTreeMap::new();
        for (path, name) in files {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    broken.insert(name, format!("cannot read {}: {e}", path.display()));
                    continue;
                }
            };
            match Template::new(&name, Some(path.display().to_string()), &content) {
                Ok(tpl) => {
                    let deps = tpl
                        .parent
                        .clone()
                        .into_iter()
                        .chain(tpl.imported_macro_files.iter().map(|(file, _)| file.clone()))
                        .collect();
                    parsed.insert(name, (content, deps));
                }
                Err(e) => {
                    broken.insert(
                        name.clone(),
                        format!("Failed to parse '{name}': {}", tera_detail(&e)),
                    );
                }
            }
        }

        // ── Drop templates whose parent or macro file is unavailable ─────
        loop {
            let orphans: Vec<(String, String)> = parsed
                .iter()
                .filter_map(|(name, (_, deps))| {
                    deps.iter()
                        .find(|d| !parsed.contains_key(d.as_str()))
                        .map(|d| (name.clone(), d.clone()))
                })
                .collect();
            if orphans.is_empty() {
                break;
            }
            for (name, dep) in orphans {
                parsed.remove(&name);
                broken.insert(name.clone(), format!("'{name}' depends on '{dep}', which could not be loaded"));
            }
        }

        for (name, reason) in &broken {
            warn!("Skipping template {}: {}", name, reason);
        }

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(parsed.iter().map(|(name, (content, _))| (name.as_str(), content.as_str())))?;

        debug!(
            "Loaded {} template(s) from {}",
            parsed.len(),
            templates_dir.display()
        );

        Ok(Self {
            tera,
            dir: templates_dir.to_path_buf(),
            broken,
        })
    }

    /// Template names relative to the templates directory, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }

    pub fn contains(&self, layout: &str) -> bool {
        let file = template_file_name(layout);
        self.tera.get_template_names().any(|n| n == file)
    }

    /// Render `layout` (base name, no extension) with `context`.
    pub fn render(&self, layout: &str, context: &Context) -> Result<String, Md2PdfError> {
        let file = template_file_name(layout);
        if let Some(reason) = self.broken.get(&file) {
            return Err(Md2PdfError::TemplateRender(reason.clone()));
        }
        if !self.contains(layout) {
            return Err(Md2PdfError::TemplateNotFound {
                name: file,
                dir: self.dir.clone(),
            });
        }
        Ok(self.tera.render(&file, context)?)
    }
}

/// Build the render context.
///
/// Every front-matter key is exposed at top level, the whole mapping as
/// `metadata`, the fragment as `html_content` and the table of contents as
/// `toc`. The derived keys overwrite front-matter keys of the same name.
pub fn build_context(metadata: &FrontMatter, rendered: &RenderedMarkdown) -> Result<Context, Md2PdfError> {
    let to_json = |v: &serde_yaml::Value| {
        serde_json::to_value(v).map_err(|e| Md2PdfError::TemplateRender(format!("front matter is not representable: {e}")))
    };

    let mut map = Map::new();
    for (key, value) in metadata.iter() {
        map.insert(key.clone(), to_json(value)?);
    }

    let whole = serde_json::to_value(metadata)
        .map_err(|e| Md2PdfError::TemplateRender(format!("front matter is not representable: {e}")))?;
    map.insert("metadata".into(), whole);
    map.insert("html_content".into(), JsonValue::String(rendered.html.clone()));
    map.insert("toc".into(), JsonValue::String(rendered.toc_html.clone()));

    Ok(Context::from_value(JsonValue::Object(map))?)
}

fn template_file_name(layout: &str) -> String {
    format!("{layout}.{TEMPLATE_EXT}")
}

fn collect_templates(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, String)>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_templates(root, &path, out)?;
        } else if path.extension().is_some_and(|e| e == TEMPLATE_EXT) {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((path.clone(), name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn fm(pairs: &[(&str, &str)]) -> FrontMatter {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn rendered(html: &str) -> RenderedMarkdown {
        RenderedMarkdown {
            html: html.to_string(),
            toc: vec![],
            toc_html: "<div class=\"toc\"></div>".to_string(),
        }
    }

    fn templates(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        dir
    }

    #[test]
    fn front_matter_layout_wins_over_fallback() {
        let meta = fm(&[("layout", "letter")]);
        assert_eq!(resolve_layout(&meta, "report").unwrap(), "letter");
    }

    #[test]
    fn fallback_used_without_front_matter_layout() {
        assert_eq!(resolve_layout(&FrontMatter::default(), "report").unwrap(), "report");
    }

    #[test]
    fn empty_layout_values_are_missing() {
        let meta = fm(&[("layout", "  ")]);
        let err = resolve_layout(&meta, "").unwrap_err();
        assert!(matches!(err, Md2PdfError::MissingLayout));
    }

    #[test]
    fn html_suffix_is_tolerated() {
        let meta = fm(&[("layout", "report.html")]);
        assert_eq!(resolve_layout(&meta, "").unwrap(), "report");
    }

    #[test]
    fn renders_fragment_unescaped() {
        let dir = templates(&[("page.html", "<body>{{ title }}|{{ html_content }}</body>")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        let ctx = build_context(&fm(&[("title", "T & C")]), &rendered("<p>hi</p>")).unwrap();
        let out = set.render("page", &ctx).unwrap();
        assert_eq!(out, "<body>T & C|<p>hi</p></body>");
    }

    #[test]
    fn metadata_is_available_as_a_whole() {
        let dir = templates(&[("m.html", "{{ metadata.author }}/{{ toc }}")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        let ctx = build_context(&fm(&[("author", "Ada")]), &rendered("")).unwrap();
        assert_eq!(set.render("m", &ctx).unwrap(), "Ada/<div class=\"toc\"></div>");
    }

    #[test]
    fn derived_keys_overwrite_front_matter() {
        let dir = templates(&[("x.html", "{{ html_content }}")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        let ctx = build_context(&fm(&[("html_content", "user value")]), &rendered("<p>real</p>")).unwrap();
        assert_eq!(set.render("x", &ctx).unwrap(), "<p>real</p>");
    }

    #[test]
    fn unknown_layout_is_template_not_found() {
        let dir = templates(&[("page.html", "x")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        let err = set.render("nope", &Context::new()).unwrap_err();
        assert!(matches!(err, Md2PdfError::TemplateNotFound { ref name, .. } if name == "nope.html"));
    }

    #[test]
    fn missing_directory_loads_empty_set() {
        let set = TemplateSet::load(Path::new("/no/such/templates/dir")).unwrap();
        assert!(set.names().is_empty());
        assert!(set.render("page", &Context::new()).is_err());
    }

    #[test]
    fn nested_templates_and_inheritance() {
        let dir = templates(&[
            ("base.html", "<html>{% block body %}{% endblock %}</html>"),
            ("sub/child.html", "{% extends \"base.html\" %}{% block body %}{{ html_content }}{% endblock %}"),
            ("notes.txt", "ignored"),
        ]);
        let set = TemplateSet::load(dir.path()).unwrap();
        assert_eq!(set.names(), vec!["base.html", "sub/child.html"]);
        let ctx = build_context(&FrontMatter::default(), &rendered("<p>c</p>")).unwrap();
        assert_eq!(set.render("sub/child", &ctx).unwrap(), "<html><p>c</p></html>");
    }

    #[test]
    fn template_syntax_error_is_template_render() {
        let dir = templates(&[("bad.html", "{{ unclosed ")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        let err = set.render("bad", &Context::new()).unwrap_err();
        assert!(matches!(err, Md2PdfError::TemplateRender(ref m) if m.contains("bad.html")), "got: {err:?}");
    }

    #[test]
    fn broken_sibling_does_not_affect_other_layouts() {
        let dir = templates(&[("p.html", "{{ html_content }}"), ("broken.html", "{{ oops ")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        assert_eq!(set.names(), vec!["p.html"]);
        let ctx = build_context(&FrontMatter::default(), &rendered("<p>ok</p>")).unwrap();
        assert_eq!(set.render("p", &ctx).unwrap(), "<p>ok</p>");
    }

    #[test]
    fn child_of_broken_parent_is_skipped() {
        let dir = templates(&[
            ("base.html", "{% block body %}"),
            ("child.html", "{% extends \"base.html\" %}{% block body %}x{% endblock %}"),
            ("plain.html", "plain"),
        ]);
        let set = TemplateSet::load(dir.path()).unwrap();
        assert_eq!(set.names(), vec!["plain.html"]);
        let err = set.render("child", &Context::new()).unwrap_err();
        assert!(matches!(err, Md2PdfError::TemplateRender(ref m) if m.contains("base.html")), "got: {err:?}");
        assert_eq!(set.render("plain", &Context::new()).unwrap(), "plain");
    }

    #[test]
    fn undefined_variable_is_template_render() {
        let dir = templates(&[("u.html", "{{ nowhere }}")]);
        let set = TemplateSet::load(dir.path()).unwrap();
        let err = set.render("u", &Context::new()).unwrap_err();
        assert!(matches!(err, Md2PdfError::TemplateRender(_)));
    }
}
