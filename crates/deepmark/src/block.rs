//! The block tree and its HTML and plain-text rendering.
//!
//! A [`Block`] is one node produced by a block parser: a [`BlockKind`]
//! plus spans into the shared source text. Container kinds own their
//! children; leaf kinds have no children field at all.

use std::borrow::Cow;
use std::ops::Range;

use pulldown_cmark::HeadingLevel;

use crate::html_tag::HtmlTag;
use crate::markdown::Markdown;
use crate::table::TableSpec;
use crate::util::{heading_tag, strip_html_id};

/// Header id state of a heading, resolved once on first render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeaderId {
    #[default]
    Unresolved,
    /// Resolved to an id, or to "no id" when automatic ids are disabled.
    Resolved(Option<String>),
}

/// The kind of a block, with the payload each kind carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind<'a> {
    Blank,
    Heading { level: HeadingLevel, id: HeaderId },
    /// `===` underline seen by the parser, merged into the previous line.
    SetextH1,
    /// `---` underline seen by the parser, merged into the previous line.
    SetextH2,
    Quote(Vec<Block<'a>>),
    /// Single-line ordered list item.
    OrderedItem,
    /// Single-line unordered list item.
    UnorderedItem,
    Paragraph,
    /// Indented line seen by the parser, merged into a code block or list.
    Indent,
    Rule,
    UserBreak,
    Html,
    UnsafeHtml,
    /// Inline content without a wrapping element.
    Span,
    /// Lines of a code block, one leaf block per line.
    CodeBlock(Vec<Block<'a>>),
    ListItem(Vec<Block<'a>>),
    OrderedList(Vec<Block<'a>>),
    UnorderedList(Vec<Block<'a>>),
    HtmlTag {
        tag: HtmlTag,
        children: Vec<Block<'a>>,
    },
    Composite(Vec<Block<'a>>),
    TableSpec(TableSpec),
    DefinitionDescription(Option<Vec<Block<'a>>>),
    DefinitionTerm(Option<Vec<Block<'a>>>),
    DefinitionList(Vec<Block<'a>>),
    Footnote {
        id: String,
        children: Vec<Block<'a>>,
    },
    /// Last paragraph of a footnote, followed by its back link.
    FootnoteParagraph { return_link: String },
}

impl BlockKind<'_> {
    /// Name of the kind in the dialect's own terms.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blank => "Blank",
            Self::Heading { level, .. } => heading_tag(*level),
            Self::SetextH1 => "post_h1",
            Self::SetextH2 => "post_h2",
            Self::Quote(_) => "quote",
            Self::OrderedItem => "ol_li",
            Self::UnorderedItem => "ul_li",
            Self::Paragraph => "p",
            Self::Indent => "indent",
            Self::Rule => "hr",
            Self::UserBreak => "user_break",
            Self::Html => "html",
            Self::UnsafeHtml => "unsafe_html",
            Self::Span => "span",
            Self::CodeBlock(_) => "codeblock",
            Self::ListItem(_) => "li",
            Self::OrderedList(_) => "ol",
            Self::UnorderedList(_) => "ul",
            Self::HtmlTag { .. } => "HtmlTag",
            Self::Composite(_) => "Composite",
            Self::TableSpec(_) => "table_spec",
            Self::DefinitionDescription(_) => "dd",
            Self::DefinitionTerm(_) => "dt",
            Self::DefinitionList(_) => "dl",
            Self::Footnote { .. } => "footnote",
            Self::FootnoteParagraph { .. } => "p_footnote",
        }
    }
}

/// A node of the block tree.
///
/// `content` is the byte range of the block's text in `source`. `line`
/// is the raw line range the parser read it from, when it differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    kind: BlockKind<'a>,
    source: &'a str,
    content: Range<usize>,
    line: Option<Range<usize>>,
}

impl<'a> Block<'a> {
    pub fn new(kind: BlockKind<'a>, source: &'a str, content: Range<usize>) -> Self {
        Self {
            kind,
            source,
            content,
            line: None,
        }
    }

    /// A block with no text of its own.
    pub fn container(kind: BlockKind<'a>, source: &'a str) -> Self {
        Self::new(kind, source, 0..0)
    }

    /// A heading whose id is resolved on first render.
    pub fn heading(level: HeadingLevel, source: &'a str, content: Range<usize>) -> Self {
        Self::new(
            BlockKind::Heading {
                level,
                id: HeaderId::Unresolved,
            },
            source,
            content,
        )
    }

    /// Set the raw line range.
    #[must_use]
    pub fn with_line(mut self, line: Range<usize>) -> Self {
        self.line = Some(line);
        self
    }

    pub fn kind(&self) -> &BlockKind<'a> {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut BlockKind<'a> {
        &mut self.kind
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn content_range(&self) -> Range<usize> {
        self.content.clone()
    }

    /// The raw line range, or the content range when none was set.
    pub fn line_range(&self) -> Range<usize> {
        self.line.clone().unwrap_or_else(|| self.content.clone())
    }

    pub fn line_start(&self) -> usize {
        self.line_range().start
    }

    /// Number of spaces at the start of the raw line.
    pub fn leading_spaces(&self) -> usize {
        self.source
            .get(self.line_range())
            .unwrap_or_default()
            .bytes()
            .take_while(|&b| b == b' ')
            .count()
    }

    /// Text of the content span. Empty if the span is out of range.
    pub fn text(&self) -> &'a str {
        self.source.get(self.content.clone()).unwrap_or_default()
    }

    /// The block's text.
    ///
    /// Code blocks join their lines, each followed by `\n`. Other containers
    /// have no text of their own.
    pub fn content(&self) -> Option<Cow<'a, str>> {
        match &self.kind {
            BlockKind::CodeBlock(lines) => {
                let mut code = String::new();
                for line in lines {
                    code.push_str(line.text());
                    code.push('\n');
                }
                Some(Cow::Owned(code))
            }
            BlockKind::Quote(_)
            | BlockKind::ListItem(_)
            | BlockKind::OrderedList(_)
            | BlockKind::UnorderedList(_)
            | BlockKind::HtmlTag { .. }
            | BlockKind::Composite(_)
            | BlockKind::TableSpec(_)
            | BlockKind::DefinitionList(_)
            | BlockKind::Footnote { .. } => None,
            _ => Some(Cow::Borrowed(self.text())),
        }
    }

    pub fn children(&self) -> Option<&[Block<'a>]> {
        match &self.kind {
            BlockKind::Quote(children)
            | BlockKind::CodeBlock(children)
            | BlockKind::ListItem(children)
            | BlockKind::OrderedList(children)
            | BlockKind::UnorderedList(children)
            | BlockKind::HtmlTag { children, .. }
            | BlockKind::Composite(children)
            | BlockKind::DefinitionList(children)
            | BlockKind::Footnote { children, .. }
            | BlockKind::DefinitionDescription(Some(children))
            | BlockKind::DefinitionTerm(Some(children)) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block<'a>>> {
        match &mut self.kind {
            BlockKind::Quote(children)
            | BlockKind::CodeBlock(children)
            | BlockKind::ListItem(children)
            | BlockKind::OrderedList(children)
            | BlockKind::UnorderedList(children)
            | BlockKind::HtmlTag { children, .. }
            | BlockKind::Composite(children)
            | BlockKind::DefinitionList(children)
            | BlockKind::Footnote { children, .. }
            | BlockKind::DefinitionDescription(Some(children))
            | BlockKind::DefinitionTerm(Some(children)) => Some(children),
            _ => None,
        }
    }

    /// Turn the block into a paragraph covering its whole raw line.
    pub fn revert_to_plain(&mut self) {
        self.kind = BlockKind::Paragraph;
        self.content = self.line_range();
    }

    /// Resolve and memoize a heading's id.
    ///
    /// An explicit trailing `{#id}` wins and is removed from the content.
    /// Otherwise the id comes from [`Markdown::make_unique_header_id`].
    /// Later calls return the stored result without touching `m`.
    pub fn resolve_header_id(&mut self, m: &mut Markdown) -> Option<&str> {
        let BlockKind::Heading { id, .. } = &mut self.kind else {
            return None;
        };

        if *id == HeaderId::Unresolved {
            let text = self.source.get(self.content.clone()).unwrap_or_default();
            let resolved = match strip_html_id(text) {
                Some((explicit, stripped_len)) => {
                    self.content.end = self.content.start + stripped_len;
                    Some(explicit.to_owned())
                }
                None => m.make_unique_header_id(text),
            };
            *id = HeaderId::Resolved(resolved);
        }

        match id {
            HeaderId::Resolved(resolved) => resolved.as_deref(),
            HeaderId::Unresolved => None,
        }
    }

    /// Append the block as HTML.
    pub fn render(&mut self, m: &mut Markdown, out: &mut String) {
        if let BlockKind::Heading { level, .. } = self.kind {
            self.render_heading(level, m, out);
            return;
        }

        let text = self.text();
        let name = self.kind.name();
        match &mut self.kind {
            BlockKind::Blank | BlockKind::UserBreak | BlockKind::Heading { .. } => {}
            BlockKind::Paragraph => m.format_paragraph(out, text),
            BlockKind::Span => {
                m.format(out, text);
                out.push('\n');
            }
            BlockKind::Rule => out.push_str("<hr />\n"),
            BlockKind::OrderedItem | BlockKind::UnorderedItem => {
                out.push_str("<li>");
                m.format(out, text);
                out.push_str("</li>\n");
            }
            BlockKind::DefinitionDescription(children) => {
                out.push_str("<dd>");
                match children {
                    Some(children) => {
                        out.push('\n');
                        render_children(children, m, out);
                    }
                    None => m.format(out, text),
                }
                out.push_str("</dd>\n");
            }
            BlockKind::DefinitionTerm(children) => match children {
                Some(children) => {
                    out.push_str("<dt>\n");
                    render_children(children, m, out);
                    out.push_str("</dt>\n");
                }
                None => {
                    for line in text.split('\n') {
                        out.push_str("<dt>");
                        m.format(out, line.trim());
                        out.push_str("</dt>\n");
                    }
                }
            },
            BlockKind::DefinitionList(children) => {
                wrap_children("dl", children, m, out);
            }
            BlockKind::Html => {
                if m.options().safe_mode && !m.is_safe_html(text) {
                    tracing::debug!(len = text.len(), "Encoding unsafe HTML block");
                    m.html_encode(out, text);
                } else {
                    out.push_str(text);
                }
            }
            BlockKind::UnsafeHtml => m.html_encode(out, text),
            BlockKind::CodeBlock(lines) => {
                let mut code = String::new();
                for line in lines.iter() {
                    debug_assert!(line.children().is_none(), "code block lines must be leaves");
                    m.html_encode_and_convert_tabs(&mut code, line.text());
                    code.push('\n');
                }
                match m.format_code_block(&code) {
                    Some(formatted) => out.push_str(&formatted),
                    None => {
                        out.push_str("<pre><code>");
                        out.push_str(&code);
                        out.push_str("</code></pre>\n\n");
                    }
                }
            }
            BlockKind::Quote(children) => wrap_children("blockquote", children, m, out),
            BlockKind::ListItem(children) => wrap_children("li", children, m, out),
            BlockKind::OrderedList(children) => wrap_children("ol", children, m, out),
            BlockKind::UnorderedList(children) => wrap_children("ul", children, m, out),
            BlockKind::HtmlTag { tag, children } => {
                if tag.name().eq_ignore_ascii_case("a") {
                    m.prepare_link(tag);
                } else if tag.name().eq_ignore_ascii_case("img") {
                    let titled_image = m.options().titled_image;
                    m.prepare_image(tag, titled_image);
                }
                tag.render_opening(out);
                out.push('\n');
                render_children(children, m, out);
                tag.render_closing(out);
                out.push('\n');
            }
            BlockKind::Composite(children) | BlockKind::Footnote { children, .. } => {
                render_children(children, m, out);
            }
            BlockKind::TableSpec(table) => table.render(m, out),
            BlockKind::FootnoteParagraph { return_link } => {
                out.push_str("<p>");
                if !text.is_empty() {
                    m.format(out, text);
                    out.push_str("&nbsp;");
                }
                out.push_str(return_link);
                out.push_str("</p>\n");
            }
            BlockKind::SetextH1 | BlockKind::SetextH2 | BlockKind::Indent => {
                out.push('<');
                out.push_str(name);
                out.push('>');
                m.format(out, text);
                out.push_str("</");
                out.push_str(name);
                out.push_str(">\n");
            }
        }
    }

    fn render_heading(&mut self, level: HeadingLevel, m: &mut Markdown, out: &mut String) {
        let tag = heading_tag(level);
        out.push('<');
        out.push_str(tag);
        if m.options().extra_mode
            && !m.options().safe_mode
            && let Some(id) = self.resolve_header_id(m).filter(|id| !id.is_empty())
        {
            out.push_str(" id=\"");
            out.push_str(id);
            out.push('"');
        }
        out.push('>');
        m.format(out, self.text());
        out.push_str("</");
        out.push_str(tag);
        out.push_str(">\n");
    }

    /// Append the block as plain text, dropping all markup.
    pub fn render_plain(&mut self, m: &mut Markdown, out: &mut String) {
        let text = self.text();
        match &mut self.kind {
            BlockKind::Paragraph | BlockKind::Span => {
                m.format_plain(out, text);
                out.push(' ');
            }
            BlockKind::Heading { .. } => {
                m.format_plain(out, text);
                out.push_str(" - ");
            }
            BlockKind::OrderedItem | BlockKind::UnorderedItem => {
                out.push_str("* ");
                m.format_plain(out, text);
                out.push(' ');
            }
            BlockKind::DefinitionDescription(children) => match children {
                Some(children) => {
                    out.push('\n');
                    render_children_plain(children, m, out);
                }
                None => m.format_plain(out, text),
            },
            BlockKind::DefinitionTerm(children) => match children {
                Some(children) => render_children_plain(children, m, out),
                None => {
                    for line in text.split('\n') {
                        m.format_plain(out, line.trim());
                    }
                }
            },
            BlockKind::CodeBlock(lines) => {
                for line in lines.iter() {
                    out.push_str(line.text());
                    out.push(' ');
                }
            }
            BlockKind::DefinitionList(children)
            | BlockKind::Quote(children)
            | BlockKind::ListItem(children)
            | BlockKind::OrderedList(children)
            | BlockKind::UnorderedList(children)
            | BlockKind::HtmlTag { children, .. }
            | BlockKind::Composite(children) => render_children_plain(children, m, out),
            _ => {}
        }
    }
}

fn render_children(children: &mut [Block<'_>], m: &mut Markdown, out: &mut String) {
    for child in children {
        child.render(m, out);
    }
}

fn render_children_plain(children: &mut [Block<'_>], m: &mut Markdown, out: &mut String) {
    for child in children {
        child.render_plain(m, out);
    }
}

fn wrap_children(element: &str, children: &mut [Block<'_>], m: &mut Markdown, out: &mut String) {
    out.push('<');
    out.push_str(element);
    out.push_str(">\n");
    render_children(children, m, out);
    out.push_str("</");
    out.push_str(element);
    out.push_str(">\n");
}
