//! Per-document services shared by every block during a render.

use std::collections::{HashMap, HashSet};

use crate::block::Block;
use crate::hooks::{CodeBlockFormatter, DefaultHooks, RenderHooks};
use crate::html_tag::{HtmlTag, is_safe_html};
use crate::link::LinkDefinition;
use crate::options::RenderOptions;
use crate::records::{Abbreviation, FootnoteRegistry};
use crate::span::{InlineFormatter, SpanContext, SpanFormatter};
use crate::util;

/// Rendering context for one document.
///
/// Holds the options, the extension points, and the tables the block
/// parser fills in (link definitions, abbreviations, footnote ids). The
/// header-id and footnote registries are scoped to one call of
/// [`render`](Self::render) or [`render_plain`](Self::render_plain).
///
/// # Example
///
/// ```
/// use deepmark::{Block, BlockKind, Markdown, RenderOptions};
///
/// let source = "Hello *world*";
/// let mut blocks = vec![Block::new(BlockKind::Paragraph, source, 0..source.len())];
///
/// let mut m = Markdown::new(RenderOptions::default());
/// assert_eq!(m.render(&mut blocks), "<p>Hello <em>world</em></p>\n");
/// ```
pub struct Markdown {
    options: RenderOptions,
    hooks: Box<dyn RenderHooks>,
    span_formatter: Box<dyn SpanFormatter>,
    code_block_formatter: Option<Box<dyn CodeBlockFormatter>>,
    link_definitions: HashMap<String, LinkDefinition>,
    abbreviations: Vec<Abbreviation>,
    footnote_ids: HashSet<String>,
    footnotes: FootnoteRegistry,
    header_ids: HashSet<String>,
}

impl Markdown {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            hooks: Box::new(DefaultHooks),
            span_formatter: Box::new(InlineFormatter),
            code_block_formatter: None,
            link_definitions: HashMap::new(),
            abbreviations: Vec::new(),
            footnote_ids: HashSet::new(),
            footnotes: FootnoteRegistry::new(),
            header_ids: HashSet::new(),
        }
    }

    /// Replace the link and image hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl RenderHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Replace the inline span formatter.
    #[must_use]
    pub fn with_span_formatter(mut self, formatter: impl SpanFormatter + 'static) -> Self {
        self.span_formatter = Box::new(formatter);
        self
    }

    /// Install a formatter used instead of `<pre><code>` for code blocks.
    #[must_use]
    pub fn with_code_block_formatter(
        mut self,
        formatter: impl CodeBlockFormatter + 'static,
    ) -> Self {
        self.code_block_formatter = Some(Box::new(formatter));
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    /// Register a reference link definition. Ids are matched
    /// case-insensitively; a later definition replaces an earlier one.
    ///
    /// Returns `false` for definitions without an id.
    pub fn add_link_definition(&mut self, definition: LinkDefinition) -> bool {
        let Some(id) = definition.id().map(str::to_lowercase) else {
            return false;
        };
        self.link_definitions.insert(id, definition);
        true
    }

    pub fn link_definition(&self, id: &str) -> Option<&LinkDefinition> {
        self.link_definitions.get(&id.to_lowercase())
    }

    /// Register an abbreviation, replacing one with the same text.
    pub fn add_abbreviation(&mut self, abbreviation: Abbreviation) {
        match self
            .abbreviations
            .iter_mut()
            .find(|a| a.abbr == abbreviation.abbr)
        {
            Some(existing) => *existing = abbreviation,
            None => self.abbreviations.push(abbreviation),
        }
    }

    pub fn abbreviations(&self) -> &[Abbreviation] {
        &self.abbreviations
    }

    /// Register the id of a footnote definition. Only references to
    /// registered ids become footnote markers.
    pub fn add_footnote_definition(&mut self, id: impl Into<String>) {
        self.footnote_ids.insert(id.into());
    }

    pub fn has_footnote_definition(&self, id: &str) -> bool {
        self.footnote_ids.contains(id)
    }

    /// Footnotes referenced so far in the current render.
    pub fn footnotes(&self) -> &FootnoteRegistry {
        &self.footnotes
    }

    /// Clear the header-id and footnote registries.
    pub fn reset(&mut self) {
        self.header_ids.clear();
        self.footnotes.clear();
    }

    /// Render a block tree to HTML.
    pub fn render(&mut self, blocks: &mut [Block<'_>]) -> String {
        self.reset();
        let mut out = String::new();
        for block in blocks {
            block.render(self, &mut out);
        }
        out
    }

    /// Render a block tree to plain text.
    pub fn render_plain(&mut self, blocks: &mut [Block<'_>]) -> String {
        self.reset();
        let mut out = String::new();
        for block in blocks {
            block.render_plain(self, &mut out);
        }
        out
    }

    /// Build a header id for `text` that is unique within this render.
    ///
    /// Returns `None` when automatic heading ids are disabled. An empty slug
    /// becomes `section`; repeats get `-1`, `-2`, ... appended.
    pub fn make_unique_header_id(&mut self, text: &str) -> Option<String> {
        if !self.options.auto_heading_ids {
            return None;
        }

        let (formatter, mut cx) = self.span_parts();
        let mut base = formatter.make_id(&mut cx, text);
        if base.is_empty() {
            base = "section".to_owned();
        }

        let mut id = base.clone();
        let mut counter = 1;
        while self.header_ids.contains(&id) {
            id = format!("{base}-{counter}");
            counter += 1;
        }
        if counter > 1 {
            tracing::debug!(base = %base, id = %id, "Header id collision");
        }
        self.header_ids.insert(id.clone());
        Some(id)
    }

    pub fn html_encode(&self, out: &mut String, text: &str) {
        util::html_encode(out, text);
    }

    pub fn html_encode_and_convert_tabs(&self, out: &mut String, text: &str) {
        util::html_encode_and_convert_tabs(out, text);
    }

    /// Whether every tag in `html` passes the safe-mode whitelist.
    pub fn is_safe_html(&self, html: &str) -> bool {
        is_safe_html(html)
    }

    pub fn prepare_link(&self, tag: &mut HtmlTag) {
        self.hooks.prepare_link(&self.options, tag);
    }

    pub fn prepare_image(&self, tag: &mut HtmlTag, titled_image: bool) {
        self.hooks.prepare_image(&self.options, tag, titled_image);
    }

    /// Run the installed code block formatter, if any.
    pub fn format_code_block(&self, code: &str) -> Option<String> {
        self.code_block_formatter
            .as_ref()
            .map(|f| f.format_code_block(&self.options, code))
    }

    /// Append `text` formatted as inline HTML.
    pub fn format(&mut self, out: &mut String, text: &str) {
        let (formatter, mut cx) = self.span_parts();
        formatter.format(&mut cx, out, text);
    }

    /// Append `text` with inline markup removed.
    pub fn format_plain(&mut self, out: &mut String, text: &str) {
        let (formatter, mut cx) = self.span_parts();
        formatter.format_plain(&mut cx, out, text);
    }

    /// Append `text` as a paragraph.
    pub fn format_paragraph(&mut self, out: &mut String, text: &str) {
        let (formatter, mut cx) = self.span_parts();
        formatter.format_paragraph(&mut cx, out, text);
    }

    fn span_parts(&mut self) -> (&dyn SpanFormatter, SpanContext<'_>) {
        (
            self.span_formatter.as_ref(),
            SpanContext {
                options: &self.options,
                hooks: self.hooks.as_ref(),
                links: &self.link_definitions,
                abbreviations: &self.abbreviations,
                footnote_ids: &self.footnote_ids,
                footnotes: &mut self.footnotes,
            },
        )
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}
