//! Inline span formatting.
//!
//! Block rendering hands the text of paragraphs, headings, list items and
//! table cells to a [`SpanFormatter`]. The default [`InlineFormatter`] drives
//! `pulldown-cmark` over the span and writes the inline events itself, so
//! links and images go through [`LinkDefinition`] and the render hooks,
//! inline HTML is checked in safe mode, and footnote markers and
//! abbreviations follow the extended dialect.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use pulldown_cmark::{BrokenLink, Event, Options, Parser, Tag, TagEnd};

use crate::hooks::RenderHooks;
use crate::html_tag::is_single_safe_tag;
use crate::link::{LinkDefinition, LinkInfo};
use crate::options::RenderOptions;
use crate::records::{Abbreviation, FootnoteRegistry};
use crate::util::{html_encode, pandoc_slug, smart_html_encode_amps_and_angles};

/// Document state a span formatter may read or update.
pub struct SpanContext<'m> {
    pub options: &'m RenderOptions,
    pub hooks: &'m dyn RenderHooks,
    /// Reference link definitions keyed by lowercased id.
    pub links: &'m HashMap<String, LinkDefinition>,
    pub abbreviations: &'m [Abbreviation],
    /// Ids of the footnotes the document defines.
    pub footnote_ids: &'m HashSet<String>,
    pub footnotes: &'m mut FootnoteRegistry,
}

/// Formats the inline content of a block.
pub trait SpanFormatter {
    /// Append `text` as HTML.
    fn format(&self, cx: &mut SpanContext<'_>, out: &mut String, text: &str);

    /// Append `text` with all markup removed.
    fn format_plain(&self, cx: &mut SpanContext<'_>, out: &mut String, text: &str);

    /// Append `text` as a paragraph.
    fn format_paragraph(&self, cx: &mut SpanContext<'_>, out: &mut String, text: &str) {
        out.push_str("<p>");
        self.format(cx, out, text);
        out.push_str("</p>\n");
    }

    /// Build a header id from heading text. Uniqueness is handled by the
    /// caller.
    fn make_id(&self, cx: &mut SpanContext<'_>, text: &str) -> String {
        let mut plain = String::new();
        self.format_plain(cx, &mut plain, text);
        pandoc_slug(&plain)
    }
}

/// Default span formatter backed by `pulldown-cmark` inline parsing.
///
/// Spans that parse as block-level markdown (list markers, `#`, `>`,
/// indented code) are written as escaped text instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineFormatter;

impl InlineFormatter {
    fn parser_options(options: &RenderOptions) -> Options {
        if options.extra_mode {
            Options::ENABLE_OLD_FOOTNOTES
        } else {
            Options::empty()
        }
    }

    fn write(cx: &mut SpanContext<'_>, out: &mut String, text: &str, plain: bool) {
        let links = cx.links;
        let callback = |link: BrokenLink| {
            links
                .get(&link.reference.to_lowercase())
                .map(|def| {
                    (
                        def.url().to_owned().into(),
                        def.title().unwrap_or_default().to_owned().into(),
                    )
                })
        };
        let parser = Parser::new_with_broken_link_callback(
            text,
            Self::parser_options(cx.options),
            Some(callback),
        );
        let events: Vec<Event<'_>> = parser.collect();

        if events.iter().any(is_block_level) {
            tracing::trace!(len = text.len(), "Span contains block syntax, writing as text");
            if plain {
                out.push_str(text);
            } else {
                smart_html_encode_amps_and_angles(out, text);
            }
            return;
        }

        let mut writer = SpanWriter {
            cx,
            out,
            frames: Vec::new(),
            plain,
            paragraphs: 0,
        };
        for event in events {
            writer.process_event(event);
        }
    }
}

impl SpanFormatter for InlineFormatter {
    fn format(&self, cx: &mut SpanContext<'_>, out: &mut String, text: &str) {
        Self::write(cx, out, text, false);
    }

    fn format_plain(&self, cx: &mut SpanContext<'_>, out: &mut String, text: &str) {
        Self::write(cx, out, text, true);
    }
}

fn is_block_level(event: &Event<'_>) -> bool {
    match event {
        Event::Start(tag) => !matches!(
            tag,
            Tag::Paragraph
                | Tag::HtmlBlock
                | Tag::Emphasis
                | Tag::Strong
                | Tag::Strikethrough
                | Tag::Superscript
                | Tag::Subscript
                | Tag::Link { .. }
                | Tag::Image { .. }
        ),
        Event::Rule | Event::TaskListMarker(_) | Event::DisplayMath(_) => true,
        _ => false,
    }
}

/// An open link or image collecting its inner content.
enum Frame {
    Link {
        url: String,
        title: String,
        html: String,
    },
    Image {
        url: String,
        title: String,
        alt: String,
    },
}

struct SpanWriter<'w, 'm> {
    cx: &'w mut SpanContext<'m>,
    out: &'w mut String,
    frames: Vec<Frame>,
    plain: bool,
    paragraphs: usize,
}

impl SpanWriter<'_, '_> {
    fn buffer(&mut self) -> &mut String {
        match self.frames.last_mut() {
            Some(Frame::Link { html, .. }) => html,
            Some(Frame::Image { alt, .. }) => alt,
            None => &mut *self.out,
        }
    }

    fn in_image(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Image { .. }))
    }

    /// Markup is dropped in plain mode and inside image alt text.
    fn push_markup(&mut self, markup: &str) {
        if !self.plain && !self.in_image() {
            self.buffer().push_str(markup);
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.plain || self.in_image() {
            self.buffer().push_str(text);
        } else if self.cx.options.extra_mode && !self.cx.abbreviations.is_empty() {
            let abbreviations = self.cx.abbreviations;
            write_abbreviated(self.buffer(), text, abbreviations);
        } else {
            html_encode(self.buffer(), text);
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => {
                let sep = if self.plain { " " } else { "\n" };
                self.buffer().push_str(sep);
            }
            Event::HardBreak => {
                if self.plain {
                    self.buffer().push(' ');
                } else {
                    self.push_markup("<br />\n");
                }
            }
            Event::FootnoteReference(id) => self.footnote_reference(&id),
            Event::Rule
            | Event::TaskListMarker(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.paragraphs > 0 {
                    let sep = if self.plain { " " } else { "\n" };
                    self.buffer().push_str(sep);
                }
            }
            Tag::Emphasis => self.push_markup("<em>"),
            Tag::Strong => self.push_markup("<strong>"),
            Tag::Strikethrough => self.push_markup("<del>"),
            Tag::Superscript => self.push_markup("<sup>"),
            Tag::Subscript => self.push_markup("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => self.frames.push(Frame::Link {
                url: dest_url.into_string(),
                title: title.into_string(),
                html: String::new(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.frames.push(Frame::Image {
                url: dest_url.into_string(),
                title: title.into_string(),
                alt: String::new(),
            }),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.paragraphs += 1,
            TagEnd::Emphasis => self.push_markup("</em>"),
            TagEnd::Strong => self.push_markup("</strong>"),
            TagEnd::Strikethrough => self.push_markup("</del>"),
            TagEnd::Superscript => self.push_markup("</sup>"),
            TagEnd::Subscript => self.push_markup("</sub>"),
            TagEnd::Link => {
                if let Some(Frame::Link { url, title, html }) = self.frames.pop() {
                    let info = LinkInfo::new(LinkDefinition::inline(url, non_empty(title)), html);
                    self.write_link(&info);
                }
            }
            TagEnd::Image => {
                if let Some(Frame::Image { url, title, alt }) = self.frames.pop() {
                    let info = LinkInfo::new(LinkDefinition::inline(url, non_empty(title)), alt);
                    self.write_image(&info);
                }
            }
            _ => {}
        }
    }

    fn write_link(&mut self, info: &LinkInfo) {
        if self.plain {
            self.buffer().push_str(&info.link_text);
            return;
        }
        let (hooks, options) = (self.cx.hooks, self.cx.options);
        if self.in_image() {
            // Link inside alt text keeps only its text.
            self.buffer().push_str(&info.link_text);
        } else {
            info.definition
                .render_link(hooks, options, self.buffer(), &info.link_text);
        }
    }

    fn write_image(&mut self, info: &LinkInfo) {
        if self.plain || self.in_image() {
            return;
        }
        let (hooks, options) = (self.cx.hooks, self.cx.options);
        info.definition
            .render_img(hooks, options, self.buffer(), &info.link_text);
    }

    fn inline_code(&mut self, code: &str) {
        if self.plain || self.in_image() {
            self.buffer().push_str(code);
            return;
        }
        let out = self.buffer();
        out.push_str("<code>");
        html_encode(out, code);
        out.push_str("</code>");
    }

    /// Each raw HTML event must be one whole whitelisted tag in safe mode.
    fn raw_html(&mut self, html: &str) {
        if self.plain || self.in_image() {
            return;
        }
        if self.cx.options.safe_mode && !is_single_safe_tag(html) {
            tracing::debug!(html = %html.trim(), "Encoding unsafe inline HTML");
            html_encode(self.buffer(), html);
        } else {
            self.buffer().push_str(html);
        }
    }

    /// References to undefined footnotes, or with ids unfit for an
    /// attribute, stay literal text.
    fn footnote_reference(&mut self, id: &str) {
        if !is_footnote_id(id) || !self.cx.footnote_ids.contains(id) {
            tracing::debug!(id = %id, "Footnote reference without definition");
            self.push_text(&format!("[^{id}]"));
            return;
        }
        if self.plain || self.in_image() {
            return;
        }
        let number = self.cx.footnotes.reference(id).index + 1;
        let _ = write!(
            self.buffer(),
            r##"<sup id="fnref:{id}"><a href="#fn:{id}" rel="footnote">{number}</a></sup>"##
        );
    }
}

fn is_footnote_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Append `text` HTML-encoded, wrapping whole-word abbreviations in `<abbr>`.
///
/// Where several abbreviations match at the same place the longest wins.
fn write_abbreviated(out: &mut String, text: &str, abbreviations: &[Abbreviation]) {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut pending = 0;
    let mut pos = 0;
    while pos < text.len() {
        let at_word_start = text[..pos].chars().next_back().is_none_or(|c| !is_word(c));
        let found = at_word_start
            .then(|| {
                abbreviations
                    .iter()
                    .filter(|a| !a.abbr.is_empty() && text[pos..].starts_with(a.abbr.as_str()))
                    .filter(|a| {
                        text[pos + a.abbr.len()..]
                            .chars()
                            .next()
                            .is_none_or(|c| !is_word(c))
                    })
                    .max_by_key(|a| a.abbr.len())
            })
            .flatten();

        if let Some(abbr) = found {
            html_encode(out, &text[pending..pos]);
            out.push_str("<abbr");
            if !abbr.title.is_empty() {
                out.push_str(" title=\"");
                smart_html_encode_amps_and_angles(out, &abbr.title);
                out.push('"');
            }
            out.push('>');
            html_encode(out, &abbr.abbr);
            out.push_str("</abbr>");
            pos += abbr.abbr.len();
            pending = pos;
            continue;
        }

        pos += text[pos..].chars().next().map_or(1, char::len_utf8);
    }
    html_encode(out, &text[pending..]);
}
