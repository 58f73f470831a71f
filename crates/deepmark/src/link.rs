//! Link targets: `[id]: url "title"` definitions and inline `(url "title")`
//! targets, plus anchor and image rendering.

use crate::hooks::RenderHooks;
use crate::html_tag::HtmlTag;
use crate::options::RenderOptions;
use crate::scanner::Scanner;
use crate::util::{html_randomize, smart_html_encode_amps_and_angles, unescape_string};

/// A resolved link target.
///
/// Reference definitions carry their id; inline targets have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefinition {
    id: Option<String>,
    url: String,
    title: Option<String>,
}

impl LinkDefinition {
    pub fn new(id: Option<String>, url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title,
        }
    }

    /// An inline target without an id.
    pub fn inline(url: impl Into<String>, title: Option<String>) -> Self {
        Self::new(None, url, title)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Parse a reference definition from the start of `text`.
    pub fn parse(text: &str, extra_mode: bool) -> Option<Self> {
        Self::parse_definition(&mut Scanner::new(text), extra_mode)
    }

    /// Parse `[id]: target "title"` at the scanner position.
    ///
    /// The definition must end at a line end, which is left unconsumed. On
    /// failure the scanner does not move.
    pub fn parse_definition(scanner: &mut Scanner<'_>, extra_mode: bool) -> Option<Self> {
        scanner.attempt(|p| {
            p.skip_whitespace();
            if !p.skip_char('[') {
                return None;
            }

            p.mark();
            if !p.find_char(']') {
                return None;
            }
            let id = p.extract();
            if id.is_empty() || !p.skip_str("]:") {
                return None;
            }

            let link = parse_target(p, Some(id), extra_mode)?;
            p.skip_linespace();
            p.eol().then_some(link)
        })
    }

    /// Parse a link target at the scanner position.
    ///
    /// With `id` set this is the target part of a reference definition.
    /// Without it this is an inline target: the scanner sits just after the
    /// opening `(`, and parsing stops in front of the closing `)`.
    pub fn parse_target(
        scanner: &mut Scanner<'_>,
        id: Option<&str>,
        extra_mode: bool,
    ) -> Option<Self> {
        scanner.attempt(|p| parse_target(p, id, extra_mode))
    }

    /// Append an anchor for this target around already-formatted
    /// `link_text`.
    ///
    /// `mailto:` targets are written as numeric character references so
    /// the address never appears literally.
    pub fn render_link(
        &self,
        hooks: &dyn RenderHooks,
        options: &RenderOptions,
        out: &mut String,
        link_text: &str,
    ) {
        if self.url.starts_with("mailto:") {
            out.push_str("<a href=\"");
            html_randomize(out, &self.url);
            out.push('"');
            if let Some(title) = self.title().filter(|t| !t.is_empty()) {
                out.push_str(" title=\"");
                smart_html_encode_amps_and_angles(out, title);
                out.push('"');
            }
            out.push('>');
            html_randomize(out, link_text);
            out.push_str("</a>");
            return;
        }

        let mut tag = HtmlTag::new("a");
        tag.set_attribute("href", smart_encoded(&self.url));
        if let Some(title) = self.title().filter(|t| !t.is_empty()) {
            tag.set_attribute("title", smart_encoded(title));
        }
        hooks.prepare_link(options, &mut tag);

        tag.render_opening(out);
        out.push_str(link_text);
        out.push_str("</a>");
    }

    /// Append a self-closed `<img>` for this target.
    pub fn render_img(
        &self,
        hooks: &dyn RenderHooks,
        options: &RenderOptions,
        out: &mut String,
        alt_text: &str,
    ) {
        let mut tag = HtmlTag::new("img");
        tag.set_attribute("src", smart_encoded(&self.url));
        if !alt_text.is_empty() {
            tag.set_attribute("alt", smart_encoded(alt_text));
        }
        if let Some(title) = self.title().filter(|t| !t.is_empty()) {
            tag.set_attribute("title", smart_encoded(title));
        }
        tag.set_closed(true);
        hooks.prepare_image(options, &mut tag, options.titled_image);

        tag.render_opening(out);
    }
}

/// A link target together with the text it is rendered around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub definition: LinkDefinition,
    pub link_text: String,
}

impl LinkInfo {
    pub fn new(definition: LinkDefinition, link_text: impl Into<String>) -> Self {
        Self {
            definition,
            link_text: link_text.into(),
        }
    }
}

fn smart_encoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    smart_html_encode_amps_and_angles(&mut out, s);
    out
}

fn parse_target(
    p: &mut Scanner<'_>,
    id: Option<&str>,
    extra_mode: bool,
) -> Option<LinkDefinition> {
    p.skip_whitespace();
    if p.eol() {
        return None;
    }

    let url = if p.skip_char('<') {
        p.mark();
        while p.current() != '>' {
            if p.eof() {
                return None;
            }
            p.skip_escapable_char(extra_mode);
        }
        let url = unescape_string(p.extract().trim(), extra_mode);
        p.skip_char('>');
        p.skip_whitespace();
        url
    } else {
        p.mark();
        let mut paren_depth = 1;
        while !p.eol() {
            let c = p.current();
            if c.is_whitespace() {
                break;
            }
            if id.is_none() {
                if c == '(' {
                    paren_depth += 1;
                } else if c == ')' {
                    paren_depth -= 1;
                    if paren_depth == 0 {
                        break;
                    }
                }
            }
            p.skip_escapable_char(extra_mode);
        }
        unescape_string(p.extract().trim(), extra_mode)
    };

    let mut link = LinkDefinition::new(id.map(str::to_owned), url, None);

    p.skip_linespace();
    if p.does_match(')') {
        return Some(link);
    }

    let on_new_line = p.eol();
    let line_end = p.position();
    if on_new_line {
        p.skip_eol();
        p.skip_linespace();
    }

    let delim = match p.current() {
        quote @ ('\'' | '"') => quote,
        '(' => ')',
        _ if on_new_line => {
            p.set_position(line_end);
            return Some(link);
        }
        _ => return None,
    };

    p.skip_forward(1);
    p.mark();
    loop {
        if p.eol() {
            return None;
        }
        if p.current() == delim {
            if delim == ')' {
                break;
            }
            // A quote only closes the title when the target ends right after it.
            let quote_pos = p.position();
            p.skip_forward(1);
            p.skip_linespace();
            let at_end = if id.is_none() { p.current() == ')' } else { p.eol() };
            if at_end {
                p.set_position(quote_pos);
                break;
            }
            continue;
        }
        p.skip_escapable_char(extra_mode);
    }

    link.title = Some(unescape_string(p.extract(), extra_mode));
    p.skip_forward(1);
    Some(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::DefaultHooks;

    fn definition(text: &str) -> Option<LinkDefinition> {
        LinkDefinition::parse(text, false)
    }

    #[test]
    fn test_parse_definition_with_title() {
        let def = definition(r#"[id]: http://x.com "Title""#).unwrap();
        assert_eq!(def.id(), Some("id"));
        assert_eq!(def.url(), "http://x.com");
        assert_eq!(def.title(), Some("Title"));
    }

    #[test]
    fn test_parse_definition_title_delimiters() {
        assert_eq!(
            definition("[a]: http://x.com 'Single'").unwrap().title(),
            Some("Single")
        );
        assert_eq!(
            definition("[a]: http://x.com (Paren)").unwrap().title(),
            Some("Paren")
        );
    }

    #[test]
    fn test_parse_definition_angle_url() {
        let def = definition("[a]: <http://x.com/a b>").unwrap();
        assert_eq!(def.url(), "http://x.com/a b");
        assert_eq!(def.title(), None);
    }

    #[test]
    fn test_parse_definition_unescapes_url() {
        let def = definition(r"[a]: http://x.com/\_x\_").unwrap();
        assert_eq!(def.url(), "http://x.com/_x_");
    }

    #[test]
    fn test_empty_target_fails_and_rewinds() {
        let mut scanner = Scanner::new("[id]: ");
        assert!(LinkDefinition::parse_definition(&mut scanner, false).is_none());
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_malformed_definitions() {
        assert!(definition("[]: http://x.com").is_none());
        assert!(definition("[id] http://x.com").is_none());
        assert!(definition("[id: http://x.com").is_none());
        assert!(definition(r#"[id]: http://x.com "Title" trailing"#).is_none());
        assert!(definition(r#"[id]: http://x.com "unterminated"#).is_none());
        assert!(definition("[id]: http://x.com junk").is_none());
    }

    #[test]
    fn test_title_on_next_line() {
        let text = "[id]: http://x.com\n   \"Next Line\"\nrest";
        let mut scanner = Scanner::new(text);
        let def = LinkDefinition::parse_definition(&mut scanner, false).unwrap();
        assert_eq!(def.title(), Some("Next Line"));
        assert_eq!(&text[scanner.position()..], "\nrest");
    }

    #[test]
    fn test_no_title_on_next_line_rewinds_to_line_end() {
        let text = "[id]: http://x.com\nparagraph";
        let mut scanner = Scanner::new(text);
        let def = LinkDefinition::parse_definition(&mut scanner, false).unwrap();
        assert_eq!(def.title(), None);
        assert_eq!(&text[scanner.position()..], "\nparagraph");
    }

    #[test]
    fn test_embedded_quote_in_title() {
        let def = definition(r#"[id]: http://x.com "Say "hi" now""#).unwrap();
        assert_eq!(def.title(), Some(r#"Say "hi" now"#));
    }

    #[test]
    fn test_inline_target_stops_before_paren() {
        let text = r#"http://x.com/a_(b) "T")rest"#;
        let mut scanner = Scanner::new(text);
        let def = LinkDefinition::parse_target(&mut scanner, None, false).unwrap();
        assert_eq!(def.id(), None);
        assert_eq!(def.url(), "http://x.com/a_(b)");
        assert_eq!(def.title(), Some("T"));
        assert_eq!(scanner.current(), ')');
    }

    #[test]
    fn test_inline_target_without_title() {
        let mut scanner = Scanner::new("page.html)");
        let def = LinkDefinition::parse_target(&mut scanner, None, false).unwrap();
        assert_eq!(def.url(), "page.html");
        assert_eq!(scanner.remainder(), ")");
    }

    #[test]
    fn test_render_link_plain() {
        let def = LinkDefinition::inline("http://x.com/?a=1&b=2", Some("A \"T\"".to_owned()));
        let mut out = String::new();
        def.render_link(&DefaultHooks, &RenderOptions::default(), &mut out, "<em>x</em>");
        assert_eq!(
            out,
            r#"<a href="http://x.com/?a=1&amp;b=2" title="A &quot;T&quot;"><em>x</em></a>"#
        );
    }

    #[test]
    fn test_render_link_runs_prepare_hook() {
        let options = RenderOptions {
            no_follow_links: true,
            ..RenderOptions::default()
        };
        let def = LinkDefinition::inline("http://x.com", None);
        let mut out = String::new();
        def.render_link(&DefaultHooks, &options, &mut out, "x");
        assert_eq!(out, r#"<a href="http://x.com" rel="nofollow">x</a>"#);
    }

    #[test]
    fn test_render_mailto_never_literal() {
        let def = LinkDefinition::inline("mailto:me@example.com", None);
        let mut out = String::new();
        def.render_link(&DefaultHooks, &RenderOptions::default(), &mut out, "me@example.com");
        assert!(out.starts_with("<a href=\"&#"));
        assert!(out.ends_with("</a>"));
        assert!(!out.contains("me@example.com"));
        assert!(!out.contains("mailto"));
    }

    #[test]
    fn test_render_img() {
        let def = LinkDefinition::inline("http://x.com/a.png", Some("Title".to_owned()));
        let mut out = String::new();
        def.render_img(&DefaultHooks, &RenderOptions::default(), &mut out, "A & B");
        assert_eq!(
            out,
            r#"<img src="http://x.com/a.png" alt="A &amp; B" title="Title" />"#
        );
    }

    static_assertions::assert_impl_all!(LinkDefinition: Send, Sync, Clone);
    static_assertions::assert_impl_all!(LinkInfo: Send, Sync, Clone);
}
