//! Position cursor over a source string.
//!
//! All grammar routines in this crate (`HtmlTag`, `LinkDefinition`,
//! `TableSpec`, `Abbreviation`) parse through a [`Scanner`]. Failed parses
//! rewind through [`Scanner::attempt`], so callers never see a half-consumed
//! input.

use crate::util::is_escapable_char;

/// Byte-position cursor over a borrowed string.
///
/// Positions are byte offsets and always sit on a `char` boundary.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    mark: usize,
}

impl<'a> Scanner<'a> {
    /// Create a scanner positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            mark: 0,
        }
    }

    /// Create a scanner positioned at byte offset `pos`, clamped to the input.
    pub fn with_position(input: &'a str, pos: usize) -> Self {
        let mut scanner = Self::new(input);
        scanner.set_position(pos);
        scanner
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to byte offset `pos`.
    ///
    /// Offsets past the end clamp to the end; offsets inside a multi-byte
    /// character move back to its start.
    pub fn set_position(&mut self, pos: usize) {
        let mut pos = pos.min(self.input.len());
        while !self.input.is_char_boundary(pos) {
            pos -= 1;
        }
        self.pos = pos;
    }

    /// Unconsumed part of the input.
    pub fn remainder(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Character at the cursor, or `'\0'` at end of input.
    pub fn current(&self) -> char {
        self.char_at_offset(0)
    }

    /// Character `offset` characters ahead of the cursor, or `'\0'` past the end.
    pub fn char_at_offset(&self, offset: usize) -> char {
        self.remainder().chars().nth(offset).unwrap_or('\0')
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// End of input or at a `\r`/`\n`.
    pub fn eol(&self) -> bool {
        self.eof() || matches!(self.current(), '\r' | '\n')
    }

    /// Advance by `count` characters, stopping at end of input.
    pub fn skip_forward(&mut self, count: usize) {
        let advance: usize = self
            .remainder()
            .chars()
            .take(count)
            .map(char::len_utf8)
            .sum();
        self.pos += advance;
    }

    pub fn does_match(&self, ch: char) -> bool {
        !self.eof() && self.current() == ch
    }

    pub fn does_match_str(&self, s: &str) -> bool {
        self.remainder().starts_with(s)
    }

    /// Consume `ch` if it is at the cursor.
    pub fn skip_char(&mut self, ch: char) -> bool {
        if self.does_match(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume `s` if the input continues with it.
    pub fn skip_str(&mut self, s: &str) -> bool {
        if self.does_match_str(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Move to the next occurrence of `ch`. The position is unchanged when
    /// there is none.
    pub fn find_char(&mut self, ch: char) -> bool {
        match self.remainder().find(ch) {
            Some(offset) => {
                self.pos += offset;
                true
            }
            None => false,
        }
    }

    /// Move to the next occurrence of `s`. The position is unchanged when
    /// there is none.
    pub fn find_str(&mut self, s: &str) -> bool {
        match self.remainder().find(s) {
            Some(offset) => {
                self.pos += offset;
                true
            }
            None => false,
        }
    }

    /// Consume an identifier: a letter or `_`, then letters, digits or `_`.
    pub fn skip_identifier(&mut self) -> Option<&'a str> {
        let rest = self.remainder();
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        if !first.is_alphabetic() && first != '_' {
            return None;
        }
        let len = chars
            .find(|&(_, c)| !c.is_alphanumeric() && c != '_')
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        Some(&rest[..len])
    }

    /// Skip any whitespace, including line ends. Returns whether anything
    /// was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        self.skip_while(char::is_whitespace)
    }

    /// Skip whitespace other than `\r` and `\n`.
    pub fn skip_linespace(&mut self) -> bool {
        self.skip_while(|c| c.is_whitespace() && c != '\r' && c != '\n')
    }

    /// Consume one line end (`\r\n`, `\n\r`, `\r` or `\n`).
    pub fn skip_eol(&mut self) -> bool {
        for eol in ["\r\n", "\n\r", "\r", "\n"] {
            if self.skip_str(eol) {
                return true;
            }
        }
        false
    }

    /// Advance to the next line end without consuming it.
    pub fn skip_to_eol(&mut self) {
        self.skip_while(|c| c != '\r' && c != '\n');
    }

    /// Advance one character, treating a backslash followed by an escapable
    /// character as a single unit.
    pub fn skip_escapable_char(&mut self, extra_mode: bool) {
        if self.current() == '\\' && is_escapable_char(self.char_at_offset(1), extra_mode) {
            self.skip_forward(2);
        } else {
            self.skip_forward(1);
        }
    }

    /// Remember the current position for a later [`Scanner::extract`].
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Text between the last [`Scanner::mark`] and the cursor.
    pub fn extract(&self) -> &'a str {
        self.input.get(self.mark..self.pos).unwrap_or_default()
    }

    /// Run a parse closure, restoring the position if it returns `None`.
    pub fn attempt<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let saved = self.pos;
        let result = parse(self);
        if result.is_none() {
            self.pos = saved;
        }
        result
    }

    fn skip_while(&mut self, accept: impl Fn(char) -> bool) -> bool {
        let rest = self.remainder();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !accept(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        len > 0
    }
}
