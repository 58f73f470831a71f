//! Rendering engine for an extended Markdown dialect.
//!
//! This crate turns a parsed block tree into HTML or plain text. It has no
//! block parser of its own: a parser builds [`Block`] values over the source
//! text and hands them to [`Markdown::render`].
//!
//! # Architecture
//!
//! - [`Block`] / [`BlockKind`]: the block tree and per-kind rendering
//! - [`Markdown`]: per-document services (options, link definitions,
//!   abbreviations, header-id and footnote registries)
//! - [`SpanFormatter`]: inline formatting, backed by pulldown-cmark in
//!   [`InlineFormatter`]
//! - [`RenderHooks`] / [`CodeBlockFormatter`]: extension points for links,
//!   images and code blocks
//! - [`HtmlTag`], [`LinkDefinition`], [`TableSpec`]: parsers for the pieces
//!   a block parser needs, built on [`Scanner`]
//!
//! # Example
//!
//! ```
//! use deepmark::{Block, BlockKind, LinkDefinition, Markdown, RenderOptions, Scanner};
//!
//! let source = "See [the docs][docs].";
//! let mut m = Markdown::new(RenderOptions::extra());
//!
//! let mut scanner = Scanner::new("[docs]: http://x.com/docs \"Docs\"\n");
//! let definition = LinkDefinition::parse_definition(&mut scanner, true).unwrap();
//! m.add_link_definition(definition);
//!
//! let mut blocks = vec![Block::new(BlockKind::Paragraph, source, 0..source.len())];
//! assert_eq!(
//!     m.render(&mut blocks),
//!     "<p>See <a href=\"http://x.com/docs\" title=\"Docs\">the docs</a>.</p>\n"
//! );
//! ```

mod block;
mod hooks;
mod html_tag;
mod link;
mod markdown;
mod options;
mod records;
mod scanner;
mod span;
mod table;
pub mod util;

pub use block::{Block, BlockKind, HeaderId};
pub use hooks::{CodeBlockFormatter, DefaultHooks, RenderHooks};
pub use html_tag::{HtmlTag, HtmlTagFlags, is_safe_html, is_single_safe_tag};
pub use link::{LinkDefinition, LinkInfo};
pub use markdown::Markdown;
pub use options::RenderOptions;
pub use pulldown_cmark::HeadingLevel;
pub use records::{Abbreviation, FootnoteReference, FootnoteRegistry, ImageInfo};
pub use scanner::Scanner;
pub use span::{InlineFormatter, SpanContext, SpanFormatter};
pub use table::{ColumnAlignment, EMPTY_CELL, TableSpec};
