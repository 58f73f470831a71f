//! Pipe tables: the `|:--|--:|` alignment line, data rows and `<table>`
//! rendering.

use crate::markdown::Markdown;
use crate::scanner::Scanner;

/// Padding for rows with fewer cells than columns.
pub const EMPTY_CELL: &str = "&nbsp;";

/// Horizontal alignment of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnAlignment {
    /// No colon in the column spec.
    #[default]
    Unspecified,
    Left,
    Right,
    Center,
}

impl ColumnAlignment {
    fn from_colons(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, true) => Self::Center,
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            (false, false) => Self::Unspecified,
        }
    }

    fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::Unspecified => None,
            Self::Left => Some("left"),
            Self::Right => Some("right"),
            Self::Center => Some("center"),
        }
    }
}

/// A parsed pipe table.
///
/// Every row holds at least `columns.len()` cells. Rows are never
/// truncated, so a row may hold more cells than there are columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSpec {
    pub leading_bar: bool,
    pub trailing_bar: bool,
    pub columns: Vec<ColumnAlignment>,
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl TableSpec {
    /// Parse an alignment line such as `| :--- | ---: |`.
    ///
    /// The line end is not consumed. On failure the scanner does not move.
    pub fn parse(scanner: &mut Scanner<'_>) -> Option<Self> {
        scanner.attempt(parse_spec)
    }

    /// Parse one data row and append it to `rows`.
    ///
    /// A blank line, a missing leading bar (when the table has one) or a
    /// line without any bar ends the table: the scanner is left in place and
    /// `false` is returned. Otherwise the row is padded to the column count
    /// and its line end consumed.
    pub fn parse_row(&mut self, scanner: &mut Scanner<'_>) -> bool {
        match scanner.attempt(|p| self.read_row(p)) {
            Some(row) => {
                self.rows.push(row);
                true
            }
            None => false,
        }
    }

    /// Parse data rows until one is rejected. Returns how many were added.
    pub fn parse_rows(&mut self, scanner: &mut Scanner<'_>) -> usize {
        let mut count = 0;
        while self.parse_row(scanner) {
            count += 1;
        }
        count
    }

    /// Parse a row without storing it, for use as the header line.
    pub fn parse_header(&self, scanner: &mut Scanner<'_>) -> Option<Vec<String>> {
        scanner.attempt(|p| self.read_row(p))
    }

    fn read_row(&self, p: &mut Scanner<'_>) -> Option<Vec<String>> {
        p.skip_linespace();
        if p.eol() {
            return None;
        }

        let mut any_bars = self.leading_bar;
        if self.leading_bar && !p.skip_char('|') {
            return None;
        }

        let mut row = Vec::with_capacity(self.columns.len());
        while !p.eol() {
            p.mark();
            while !p.eol() && p.current() != '|' {
                p.skip_escapable_char(true);
            }
            row.push(p.extract().trim().to_owned());
            any_bars |= p.skip_char('|');
        }

        if !any_bars {
            return None;
        }

        if row.len() < self.columns.len() {
            row.resize(self.columns.len(), EMPTY_CELL.to_owned());
        }
        p.skip_eol();
        Some(row)
    }

    /// Append the table as HTML, formatting each cell as a span.
    pub fn render(&self, m: &mut Markdown, out: &mut String) {
        out.push_str("<table>\n");
        if let Some(headers) = &self.headers {
            out.push_str("<thead>\n<tr>\n");
            self.render_row(m, out, headers, "th");
            out.push_str("</tr>\n</thead>\n");
        }

        out.push_str("<tbody>\n");
        for row in &self.rows {
            out.push_str("<tr>\n");
            self.render_row(m, out, row, "td");
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
    }

    fn render_row(&self, m: &mut Markdown, out: &mut String, row: &[String], cell: &str) {
        for (i, text) in row.iter().enumerate() {
            out.push_str("\t<");
            out.push_str(cell);
            if let Some(align) = self.columns.get(i).and_then(|c| c.as_attr()) {
                out.push_str(" align=\"");
                out.push_str(align);
                out.push('"');
            }
            out.push('>');
            m.format(out, text);
            out.push_str("</");
            out.push_str(cell);
            out.push_str(">\n");
        }
    }
}

fn parse_spec(p: &mut Scanner<'_>) -> Option<TableSpec> {
    p.skip_linespace();
    if !matches!(p.current(), '|' | ':' | '-') {
        return None;
    }

    // Only a leading bar or a first separator makes this a table spec.
    let mut spec: Option<TableSpec> = None;
    if p.skip_char('|') {
        spec = Some(TableSpec {
            leading_bar: true,
            ..TableSpec::default()
        });
    }

    loop {
        p.skip_linespace();
        if p.current() == '|' {
            return None;
        }

        let left = p.skip_char(':');
        while p.current() == '-' {
            p.skip_forward(1);
        }
        let right = p.skip_char(':');
        p.skip_linespace();
        let column = ColumnAlignment::from_colons(left, right);

        if p.eol() {
            let mut spec = spec?;
            spec.columns.push(column);
            return Some(spec);
        }

        if !p.skip_char('|') {
            return None;
        }
        let spec = spec.get_or_insert_with(TableSpec::default);
        spec.columns.push(column);

        p.skip_linespace();
        if p.eol() {
            spec.trailing_bar = true;
            return Some(std::mem::take(spec));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::options::RenderOptions;

    fn spec(text: &str) -> Option<TableSpec> {
        TableSpec::parse(&mut Scanner::new(text))
    }

    #[test]
    fn test_parse_alignment_line() {
        let spec = spec(":--|--:").unwrap();
        assert_eq!(spec.columns, vec![ColumnAlignment::Left, ColumnAlignment::Right]);
        assert!(!spec.leading_bar);
        assert!(!spec.trailing_bar);
    }

    #[test]
    fn test_parse_bars_and_center() {
        let spec = spec("| :-: | --- |").unwrap();
        assert_eq!(
            spec.columns,
            vec![ColumnAlignment::Center, ColumnAlignment::Unspecified]
        );
        assert!(spec.leading_bar);
        assert!(spec.trailing_bar);
    }

    #[test]
    fn test_parse_single_column_with_leading_bar() {
        let spec = spec("|---").unwrap();
        assert_eq!(spec.columns, vec![ColumnAlignment::Unspecified]);
    }

    #[test]
    fn test_parse_leaves_line_end() {
        let mut scanner = Scanner::new("---|---\nnext");
        TableSpec::parse(&mut scanner).unwrap();
        assert_eq!(scanner.remainder(), "\nnext");
    }

    #[test]
    fn test_parse_rejects_and_rewinds() {
        for text in ["---", "", "text", "||", "--|x|", "| |"] {
            let mut scanner = Scanner::new(text);
            assert!(TableSpec::parse(&mut scanner).is_none(), "{text:?}");
            assert_eq!(scanner.position(), 0, "{text:?}");
        }
    }

    #[test]
    fn test_parse_rows_pads_short_rows() {
        let mut table = spec("|---|---|---|").unwrap();
        let mut scanner = Scanner::new("| a | b |\n| c |\n\nafter");
        assert_eq!(table.parse_rows(&mut scanner), 2);
        assert_eq!(table.rows[0], vec!["a", "b", EMPTY_CELL]);
        assert_eq!(table.rows[1], vec!["c", EMPTY_CELL, EMPTY_CELL]);
        assert!(table.rows.iter().all(|row| row.len() >= table.columns.len()));
        assert_eq!(scanner.remainder(), "\nafter");
    }

    #[test]
    fn test_rows_are_not_truncated() {
        let mut table = spec("---|---").unwrap();
        let mut scanner = Scanner::new("a | b | c");
        assert!(table.parse_row(&mut scanner));
        assert_eq!(table.rows[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn test_row_requires_leading_bar() {
        let mut table = spec("|---|").unwrap();
        let mut scanner = Scanner::new("a | b\n");
        assert!(!table.parse_row(&mut scanner));
        assert_eq!(scanner.position(), 0);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_row_without_bars_ends_table() {
        let mut table = spec("---|---").unwrap();
        let mut scanner = Scanner::new("just text\n");
        assert!(!table.parse_row(&mut scanner));
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_parse_header_pads_to_spec_columns() {
        let text = "| A | B |\n|---|---|---|\n";
        let spec_start = text.find('\n').unwrap() + 1;
        let table = TableSpec::parse(&mut Scanner::with_position(text, spec_start)).unwrap();
        assert_eq!(table.columns.len(), 3);

        let mut scanner = Scanner::new(text);
        let header = table.parse_header(&mut scanner).unwrap();
        assert_eq!(header, vec!["A", "B", EMPTY_CELL]);
        assert_eq!(scanner.position(), spec_start);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_parse_header_rejects_and_rewinds() {
        let table = spec("|---|---|").unwrap();
        let mut scanner = Scanner::new("A | B\n");
        assert_eq!(table.parse_header(&mut scanner), None);
        assert_eq!(scanner.position(), 0);

        let mut scanner = Scanner::new("\n| A |\n");
        assert_eq!(table.parse_header(&mut scanner), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_escaped_bar_stays_in_cell() {
        let mut table = spec("---|---").unwrap();
        let mut scanner = Scanner::new(r"a \| b | c");
        assert!(table.parse_row(&mut scanner));
        assert_eq!(table.rows[0], vec![r"a \| b", "c"]);
    }

    #[test]
    fn test_render() {
        let mut table = spec("|:--|--:|---|").unwrap();
        table.headers = Some(vec!["H1".to_owned(), "H2".to_owned(), "H3".to_owned()]);
        table.rows = vec![vec!["a".to_owned(), "b".to_owned(), "c".to_owned(), "d".to_owned()]];

        let mut m = Markdown::new(RenderOptions::default());
        let mut out = String::new();
        table.render(&mut m, &mut out);

        assert_eq!(
            out,
            "<table>\n\
             <thead>\n<tr>\n\
             \t<th align=\"left\">H1</th>\n\
             \t<th align=\"right\">H2</th>\n\
             \t<th>H3</th>\n\
             </tr>\n</thead>\n\
             <tbody>\n<tr>\n\
             \t<td align=\"left\">a</td>\n\
             \t<td align=\"right\">b</td>\n\
             \t<td>c</td>\n\
             \t<td>d</td>\n\
             </tr>\n\
             </tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_render_without_headers_formats_cells() {
        let table = TableSpec {
            columns: vec![ColumnAlignment::Unspecified],
            rows: vec![vec!["*x* & y".to_owned()]],
            ..TableSpec::default()
        };
        let mut m = Markdown::new(RenderOptions::default());
        let mut out = String::new();
        table.render(&mut m, &mut out);
        assert_eq!(
            out,
            "<table>\n<tbody>\n<tr>\n\t<td><em>x</em> &amp; y</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    static_assertions::assert_impl_all!(TableSpec: Send, Sync, Clone);
}
