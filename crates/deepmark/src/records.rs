//! Small value records shared between the renderer and its hooks.

use crate::scanner::Scanner;

/// A footnote referenced from the text.
///
/// `index` is zero-based in first-reference order; the rendered marker is
/// `index + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteReference {
    pub index: usize,
    pub id: String,
}

impl FootnoteReference {
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
        }
    }
}

/// Footnotes referenced in one document, in first-reference order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootnoteRegistry {
    references: Vec<FootnoteReference>,
}

impl FootnoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `id`, registering it with the next index if it is new.
    pub fn reference(&mut self, id: &str) -> &FootnoteReference {
        let position = match self.references.iter().position(|r| r.id == id) {
            Some(position) => position,
            None => {
                let index = self.references.len();
                self.references.push(FootnoteReference::new(index, id));
                index
            }
        };
        &self.references[position]
    }

    pub fn get(&self, id: &str) -> Option<&FootnoteReference> {
        self.references.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FootnoteReference> {
        self.references.iter()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn clear(&mut self) {
        self.references.clear();
    }
}

/// An abbreviation definition: `*[HTML]: Hyper Text Markup Language`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    pub abbr: String,
    pub title: String,
}

impl Abbreviation {
    pub fn new(abbr: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            abbr: abbr.into(),
            title: title.into(),
        }
    }

    /// Parse `*[ABBR]: Title` at the scanner position, up to the line end.
    ///
    /// The line end is left unconsumed. On failure the scanner does not move.
    pub fn parse(scanner: &mut Scanner<'_>) -> Option<Self> {
        scanner.attempt(|p| {
            p.skip_linespace();
            if !p.skip_str("*[") {
                return None;
            }

            p.mark();
            while !p.eol() && p.current() != ']' {
                p.skip_forward(1);
            }
            let abbr = p.extract().trim();
            if abbr.is_empty() || !p.skip_str("]:") {
                return None;
            }

            p.skip_linespace();
            p.mark();
            p.skip_to_eol();
            let title = p.extract().trim();
            Some(Self::new(abbr, title))
        })
    }
}

/// Image details supplied by [`RenderHooks::image_size`].
///
/// [`RenderHooks::image_size`]: crate::RenderHooks::image_size
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageInfo {
    pub url: String,
    pub titled_image: bool,
    pub width: u32,
    pub height: u32,
}
