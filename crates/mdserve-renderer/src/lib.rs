//! Extensible markdown-to-HTML engine.
//!
//! This crate provides a [`MarkdownEngine`] built on pulldown-cmark with a
//! small set of renderer overrides (CSS hook classes on headings, rules,
//! code and lists) and a pluggable inline extension mechanism.
//!
//! # Architecture
//!
//! The engine walks the pulldown-cmark event stream with source offsets so
//! renderer overrides can inspect the raw matched text (e.g. to tell ATX
//! headings from Setext headings). Plain text runs are handed to the
//! registered [`InlineExtension`]s, which claim spans by scan position:
//! the extension with the earliest candidate index wins, ties broken by
//! registration order.
//!
//! Two extensions ship with the engine:
//! - [`EmojiExtension`]: `:name:` shortcodes resolved against a closed
//!   name-to-record mapping.
//! - [`MathExtension`]: `$...$` / `$$...$$` spans rendered to
//!   presentational MathML. Multi-line `$$` blocks are lifted out by a
//!   fence-aware preprocessor before parsing.
//!
//! # Example
//!
//! ```
//! use mdserve_renderer::{EngineOptions, MarkdownEngine};
//!
//! let engine = MarkdownEngine::new(EngineOptions::default());
//! let html = engine.render("# Hello\n\n**Bold** text");
//! assert!(html.contains(r#"<h1 class="md-heading">"#));
//! ```

mod emoji;
mod engine;
mod escape;
mod extension;
mod math;
mod mathml;

pub use emoji::{EmojiExtension, EmojiRecord};
pub use engine::{EngineOptions, MarkdownEngine};
pub use escape::escape_html;
pub use extension::{InlineExtension, InlineToken, TokenKind};
pub use math::MathExtension;
