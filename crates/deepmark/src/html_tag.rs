//! HTML tag scanning, classification and the safe-mode whitelist.

use std::collections::HashMap;
use std::ops::BitOr;
use std::sync::LazyLock;

use crate::scanner::Scanner;
use crate::util::is_safe_url;

/// Classification bits for a tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HtmlTagFlags(u8);

impl HtmlTagFlags {
    /// Block-level element.
    pub const BLOCK: Self = Self(1);
    /// Inline element.
    pub const INLINE: Self = Self(2);
    /// Element without a closing tag (`<hr>`, comments).
    pub const NO_CLOSING: Self = Self(4);
    /// Element whose content is formatted as a span.
    pub const CONTENT_AS_SPAN: Self = Self(8);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for HtmlTagFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

const BLOCK_SPAN: HtmlTagFlags = HtmlTagFlags::BLOCK.union(HtmlTagFlags::CONTENT_AS_SPAN);
const BLOCK_INLINE: HtmlTagFlags = HtmlTagFlags::BLOCK.union(HtmlTagFlags::INLINE);
const BLOCK_NO_CLOSING: HtmlTagFlags = HtmlTagFlags::BLOCK.union(HtmlTagFlags::NO_CLOSING);

static TAG_FLAGS: LazyLock<HashMap<&'static str, HtmlTagFlags>> = LazyLock::new(|| {
    HashMap::from([
        ("p", BLOCK_SPAN),
        ("div", HtmlTagFlags::BLOCK),
        ("h1", BLOCK_SPAN),
        ("h2", BLOCK_SPAN),
        ("h3", BLOCK_SPAN),
        ("h4", BLOCK_SPAN),
        ("h5", BLOCK_SPAN),
        ("h6", BLOCK_SPAN),
        ("blockquote", HtmlTagFlags::BLOCK),
        ("pre", HtmlTagFlags::BLOCK),
        ("table", HtmlTagFlags::BLOCK),
        ("dl", HtmlTagFlags::BLOCK),
        ("ol", HtmlTagFlags::BLOCK),
        ("ul", HtmlTagFlags::BLOCK),
        ("form", HtmlTagFlags::BLOCK),
        ("fieldset", HtmlTagFlags::BLOCK),
        ("iframe", HtmlTagFlags::BLOCK),
        ("script", BLOCK_INLINE),
        ("noscript", BLOCK_INLINE),
        ("math", BLOCK_INLINE),
        ("ins", BLOCK_INLINE),
        ("del", BLOCK_INLINE),
        ("img", BLOCK_INLINE),
        ("li", HtmlTagFlags::CONTENT_AS_SPAN),
        ("dd", HtmlTagFlags::CONTENT_AS_SPAN),
        ("dt", HtmlTagFlags::CONTENT_AS_SPAN),
        ("td", HtmlTagFlags::CONTENT_AS_SPAN),
        ("th", HtmlTagFlags::CONTENT_AS_SPAN),
        ("legend", HtmlTagFlags::CONTENT_AS_SPAN),
        ("address", HtmlTagFlags::CONTENT_AS_SPAN),
        ("hr", BLOCK_NO_CLOSING),
        ("!", BLOCK_NO_CLOSING),
        ("head", HtmlTagFlags::BLOCK),
    ])
});

const ALLOWED_TAGS: &[&str] = &[
    "b",
    "blockquote",
    "code",
    "dd",
    "dt",
    "dl",
    "del",
    "em",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "i",
    "kbd",
    "li",
    "ol",
    "ul",
    "p",
    "pre",
    "s",
    "sub",
    "sup",
    "strong",
    "strike",
    "img",
    "a",
];

static ALLOWED_ATTRIBUTES: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        HashMap::from([
            ("a", &["href", "title", "class"][..]),
            ("img", &["src", "width", "height", "alt", "title", "class"][..]),
        ])
    });

/// A single scanned HTML tag.
///
/// The name keeps the case it was written with; every lookup against it
/// (flags, whitelist, attribute names) is case-insensitive. Attributes keep
/// insertion order for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    name: String,
    attributes: Vec<(String, String)>,
    closing: bool,
    closed: bool,
}

impl HtmlTag {
    /// Name used for `<!-- ... -->` comments.
    pub const COMMENT: &'static str = "!";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            closing: false,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` for `</name>` tags.
    pub fn closing(&self) -> bool {
        self.closing
    }

    /// `true` for self-closed tags (`<br />`) and comments.
    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn is_comment(&self) -> bool {
        self.name == Self::COMMENT
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing one with the same name.
    ///
    /// The value is rendered as given, so it must already be escaped.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Add an attribute, failing if one with the same name exists.
    fn insert_attribute(&mut self, name: &str, value: &str) -> Option<()> {
        if self.attribute(name).is_some() {
            return None;
        }
        self.attributes.push((name.to_owned(), value.to_owned()));
        Some(())
    }

    /// Classification from the static tag table; unknown tags are inline.
    pub fn flags(&self) -> HtmlTagFlags {
        TAG_FLAGS
            .get(self.name.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(HtmlTagFlags::INLINE)
    }

    /// Whether the tag passes the safe-mode whitelist.
    pub fn is_safe(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            return false;
        }

        let Some(allowed) = ALLOWED_ATTRIBUTES.get(name.as_str()) else {
            return self.attributes.is_empty();
        };

        let all_allowed = self.attributes.iter().all(|(key, _)| {
            allowed
                .iter()
                .any(|allowed| key.eq_ignore_ascii_case(allowed))
        });
        if !all_allowed {
            return false;
        }

        ["href", "src"]
            .into_iter()
            .filter_map(|key| self.attribute(key))
            .all(is_safe_url)
    }

    /// Append `<name attr="value"...>`, or `... />` when self-closed.
    pub fn render_opening(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
        out.push_str(if self.closed { " />" } else { ">" });
    }

    pub fn render_closing(&self, out: &mut String) {
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Parse a tag starting at byte `pos` of `text`, advancing `pos` past it
    /// on success.
    pub fn parse(text: &str, pos: &mut usize) -> Option<Self> {
        let mut scanner = Scanner::with_position(text, *pos);
        let tag = Self::parse_at(&mut scanner)?;
        *pos = scanner.position();
        Some(tag)
    }

    /// Parse a tag at the scanner's position. The scanner is left untouched
    /// when no tag matches.
    pub fn parse_at(scanner: &mut Scanner<'_>) -> Option<Self> {
        scanner.attempt(parse_tag)
    }
}

fn parse_tag(p: &mut Scanner<'_>) -> Option<HtmlTag> {
    if !p.skip_char('<') {
        return None;
    }

    // An unterminated comment continues as an ordinary tag after "<!--".
    if p.skip_str("!--") {
        p.mark();
        if p.find_str("-->") {
            let mut tag = HtmlTag::new(HtmlTag::COMMENT);
            tag.attributes.push(("content".to_owned(), p.extract().to_owned()));
            tag.closed = true;
            p.skip_forward(3);
            return Some(tag);
        }
    }

    let closing = p.skip_char('/');
    let mut tag = HtmlTag::new(p.skip_identifier()?);
    tag.closing = closing;

    if closing {
        return p.skip_char('>').then_some(tag);
    }

    while !p.eof() {
        p.skip_whitespace();

        if p.skip_str("/>") {
            tag.closed = true;
            return Some(tag);
        }
        if p.skip_char('>') {
            return Some(tag);
        }

        let name = p.skip_identifier()?;
        p.skip_whitespace();

        if !p.skip_char('=') {
            tag.insert_attribute(name, "")?;
            continue;
        }

        p.skip_whitespace();
        if p.skip_char('"') {
            p.mark();
            if !p.find_char('"') {
                return None;
            }
            tag.insert_attribute(name, p.extract())?;
            p.skip_forward(1);
        } else {
            p.mark();
            while !p.eof() {
                let c = p.current();
                if c.is_whitespace() || c == '>' || c == '/' {
                    break;
                }
                p.skip_forward(1);
            }
            // A value cut off by end of input is dropped; the loop then
            // exits at EOF and the parse fails.
            if !p.eof() {
                tag.insert_attribute(name, p.extract())?;
            }
        }
    }

    None
}

/// Whether every tag in `html` passes the safe-mode whitelist.
///
/// A `<` followed by a letter, `/` or `!` must parse as a tag; one that
/// does not counts as unsafe. Any other `<` is plain text.
pub fn is_safe_html(html: &str) -> bool {
    let mut pos = 0;
    while let Some(offset) = html[pos..].find('<') {
        pos += offset;
        match HtmlTag::parse(html, &mut pos) {
            Some(tag) if !tag.is_safe() => {
                tracing::debug!(tag = %tag.name(), "Unsafe HTML tag");
                return false;
            }
            Some(_) => {}
            None if opens_tag(&html[pos + 1..]) => {
                tracing::debug!(pos, "Unparsable HTML tag");
                return false;
            }
            None => pos += 1,
        }
    }
    true
}

/// Whether `html` holds exactly one tag (surrounding whitespace aside) and
/// that tag passes the safe-mode whitelist.
pub fn is_single_safe_tag(html: &str) -> bool {
    let html = html.trim();
    let mut pos = 0;
    match HtmlTag::parse(html, &mut pos) {
        Some(tag) if pos == html.len() => tag.is_safe(),
        _ => false,
    }
}

fn opens_tag(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<HtmlTag> {
        let mut pos = 0;
        HtmlTag::parse(text, &mut pos)
    }

    #[test]
    fn test_parse_opening_tag_with_attributes() {
        let mut pos = 0;
        let text = r#"<a href="http://x.com" title=hi class>rest"#;
        let tag = HtmlTag::parse(text, &mut pos).unwrap();

        assert_eq!(tag.name(), "a");
        assert!(!tag.closing());
        assert!(!tag.closed());
        assert_eq!(tag.attribute("HREF"), Some("http://x.com"));
        assert_eq!(tag.attribute("title"), Some("hi"));
        assert_eq!(tag.attribute("class"), Some(""));
        assert_eq!(&text[pos..], "rest");
    }

    #[test]
    fn test_parse_self_closed_tag() {
        let tag = parse("<br />").unwrap();
        assert_eq!(tag.name(), "br");
        assert!(tag.closed());
    }

    #[test]
    fn test_parse_closing_tag() {
        let tag = parse("</DIV>").unwrap();
        assert_eq!(tag.name(), "DIV");
        assert!(tag.closing());
        assert_eq!(tag.attributes().count(), 0);
        assert!(parse("</div >").is_none());
    }

    #[test]
    fn test_parse_comment() {
        let mut pos = 0;
        let text = "<!-- note -->after";
        let tag = HtmlTag::parse(text, &mut pos).unwrap();
        assert!(tag.is_comment());
        assert!(tag.closed());
        assert_eq!(tag.attribute("content"), Some(" note "));
        assert_eq!(&text[pos..], "after");
    }

    #[test]
    fn test_unterminated_comment_fails() {
        assert!(parse("<!-- never closed").is_none());
    }

    #[test]
    fn test_attributes_span_newlines() {
        let tag = parse("<img\n  src=\"http://x.com/a.png\"\n  alt=\"\">").unwrap();
        assert_eq!(tag.attribute("src"), Some("http://x.com/a.png"));
        assert_eq!(tag.attribute("alt"), Some(""));
    }

    #[test]
    fn test_failure_leaves_position() {
        for text in [
            "<",
            "<1abc>",
            "<div",
            r#"<a href="unterminated>"#,
            "<a href=value",
            "<a b c",
            "not a tag",
            "<a x=1 x=2>",
        ] {
            let mut pos = 0;
            assert!(HtmlTag::parse(text, &mut pos).is_none(), "{text:?}");
            assert_eq!(pos, 0, "{text:?}");
        }
    }

    #[test]
    fn test_parse_at_offset() {
        let text = "abc <b>bold</b>";
        let mut pos = 4;
        let tag = HtmlTag::parse(text, &mut pos).unwrap();
        assert_eq!(tag.name(), "b");
        assert_eq!(pos, 7);
    }

    #[test]
    fn test_flags() {
        assert_eq!(parse("<p>").unwrap().flags(), BLOCK_SPAN);
        assert!(parse("<DIV>").unwrap().flags().contains(HtmlTagFlags::BLOCK));
        assert_eq!(parse("<span>").unwrap().flags(), HtmlTagFlags::INLINE);
        assert_eq!(
            parse("<!-- x -->").unwrap().flags(),
            HtmlTagFlags::BLOCK | HtmlTagFlags::NO_CLOSING
        );
        assert!(parse("<img>").unwrap().flags().contains(BLOCK_INLINE));
    }

    #[test]
    fn test_is_safe_whitelist() {
        assert!(parse("<b>").unwrap().is_safe());
        assert!(parse("</strong>").unwrap().is_safe());
        assert!(parse(r#"<a href="https://x.com" title="t">"#).unwrap().is_safe());
        assert!(!parse("<div>").unwrap().is_safe());
        assert!(!parse("<script>").unwrap().is_safe());
        assert!(!parse(r#"<b class="x">"#).unwrap().is_safe());
    }

    #[test]
    fn test_is_safe_rejects_event_handlers() {
        let tag = parse(r#"<img src="x.png" onclick="evil()">"#).unwrap();
        assert!(!tag.is_safe());
    }

    #[test]
    fn test_is_safe_rejects_script_urls() {
        let tag = parse(r#"<a href="javascript:alert(1)">"#).unwrap();
        assert!(!tag.is_safe());
        let tag = parse(r#"<img src="http://x.com/a.png" alt="a">"#).unwrap();
        assert!(tag.is_safe());
    }

    #[test]
    fn test_render_opening_and_closing() {
        let mut tag = HtmlTag::new("a");
        tag.set_attribute("href", "http://x.com");
        tag.set_attribute("rel", "nofollow");
        tag.set_attribute("HREF", "http://y.com");

        let mut out = String::new();
        tag.render_opening(&mut out);
        tag.render_closing(&mut out);
        assert_eq!(out, r#"<a href="http://y.com" rel="nofollow"></a>"#);

        let mut img = HtmlTag::new("img");
        img.set_closed(true);
        let mut out = String::new();
        img.render_opening(&mut out);
        assert_eq!(out, "<img />");
    }

    #[test]
    fn test_is_safe_html() {
        assert!(is_safe_html("plain <b>bold</b> & < text"));
        assert!(!is_safe_html("<div>block</div>"));
        assert!(!is_safe_html(r#"<a href="javascript:x">x</a>"#));
        assert!(!is_safe_html("<!-- comment -->"));
    }

    #[test]
    fn test_is_safe_html_rejects_unparsable_tags() {
        // Hyphenated attribute names stop the tag parse.
        assert!(!is_safe_html("<img src=x onerror=alert(1) data-a=1>"));
        assert!(!is_safe_html(r#"<p data-x="1" onclick="alert(1)">x</p>"#));
        assert!(!is_safe_html("<b"));
        assert!(!is_safe_html("</b x>"));
        assert!(is_safe_html("1 < 2 and 3 <= 4"));
    }

    #[test]
    fn test_is_single_safe_tag() {
        assert!(is_single_safe_tag("<b>"));
        assert!(is_single_safe_tag(" </em>\n"));
        assert!(!is_single_safe_tag("<b>x"));
        assert!(!is_single_safe_tag("<b><i>"));
        assert!(!is_single_safe_tag("<img src=x onerror=alert(1) data-a=1>"));
        assert!(!is_single_safe_tag("<span>"));
    }

    static_assertions::assert_impl_all!(HtmlTag: Send, Sync, Clone);
}
