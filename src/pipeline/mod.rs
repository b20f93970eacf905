//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements one transformation step and can be used on its
//! own; [`crate::convert`] wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ frontmatter ──▶ markdown ──▶ template ──▶ html ──▶ layout ──▶ render
//! (path)     (YAML/TOML)     (comrak)     (tera)       (tl)    (wrap)    (printpdf)
//! ```
//!
//! 1. [`input`]       — read the source file, mapping I/O failures to errors
//! 2. [`frontmatter`] — split metadata from body, inject `static_dir`
//! 3. [`markdown`]    — body to HTML fragment with highlighted code and anchors
//! 4. [`template`]    — pick the layout and render it with the fragment
//! 5. [`html`]        — parse the composed document into styled blocks
//! 6. [`layout`]      — wrap lines and paginate
//! 7. [`render`]      — draw pages with the built-in PDF fonts and save

pub mod frontmatter;
pub mod html;
pub mod input;
pub mod layout;
pub mod markdown;
pub mod render;
pub mod template;
