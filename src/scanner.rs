//! Block scanner.
//!
//! Maintains a cursor over the normalized lines of one document plus a line
//! offset used only for error reporting. The document parser drives the
//! cursor; the scanner answers indentation and classification queries and
//! extracts embedded blocks for sub-parsers.

use crate::error::{ParseError, Result};

/// Cursor over the logical lines of a document.
pub struct Scanner {
    lines: Vec<String>,
    /// Index into `lines`; −1 means "before the first line".
    cursor: isize,
    /// Added to `cursor` when reporting line numbers, so diagnostics match
    /// the original source even after normalization stripped leading lines.
    offset: usize,
}

/// A line is blank when it contains nothing but spaces.
pub fn is_blank(line: &str) -> bool {
    line.bytes().all(|b| b == b' ')
}

/// A line is a comment when its first non-space character is `#`.
pub fn is_comment(line: &str) -> bool {
    line.trim_start_matches(' ').starts_with('#')
}

/// Count of leading spaces. Tabs are never indentation; they are caught by
/// [`Scanner::has_tab_indent`] before this is consulted.
pub fn indent_of(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

impl Scanner {
    pub fn new(lines: Vec<String>, offset: usize) -> Self {
        Self {
            lines,
            cursor: -1,
            offset,
        }
    }

    /// Advance the cursor one line. Returns `false` at end of input, leaving
    /// the cursor in place.
    pub fn advance(&mut self) -> bool {
        if self.cursor >= self.lines.len() as isize - 1 {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Move the cursor back one line.
    pub fn retreat(&mut self) {
        if self.cursor > -1 {
            self.cursor -= 1;
        }
    }

    /// The line under the cursor, or `""` before the first advance.
    pub fn current(&self) -> &str {
        if self.cursor < 0 {
            ""
        } else {
            &self.lines[self.cursor as usize]
        }
    }

    /// 1-based line number of the cursor in the original source.
    pub fn line_number(&self) -> usize {
        self.cursor.max(0) as usize + self.offset + 1
    }

    /// All lines of this document.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Indentation of the current line.
    pub fn current_indent(&self) -> usize {
        indent_of(self.current())
    }

    /// Blank or comment-only.
    pub fn current_is_empty(&self) -> bool {
        is_blank(self.current()) || is_comment(self.current())
    }

    pub fn current_is_blank(&self) -> bool {
        is_blank(self.current())
    }

    /// Leading tabs on the current line.
    pub fn has_tab_indent(&self) -> bool {
        self.current().starts_with('\t')
    }

    /// True when the next content line is indented less than or equal to the
    /// current line (or input ends). Blank and comment lines on the way are
    /// consumed; the cursor ends one line before the content line found.
    pub fn next_line_dedented(&mut self) -> bool {
        let current_indent = self.current_indent();
        let mut more = self.advance();
        while more && self.current_is_empty() {
            more = self.advance();
        }
        if !more {
            return false;
        }
        let dedented = self.current_indent() <= current_indent;
        self.retreat();
        dedented
    }

    /// Extract the embedded block that follows the current line.
    ///
    /// The block's indent is `indentation` when supplied, otherwise the
    /// indent of the first line (which must be positive unless that line is
    /// empty). Member lines are stripped of the block indent; blank lines
    /// stay as their remainder. A content line at indent zero ends the block
    /// and is pushed back; one between zero and the block indent is an
    /// indentation error. Comment lines inside the block are dropped.
    pub fn next_embedded_block(&mut self, indentation: Option<usize>) -> Result<String> {
        if !self.advance() {
            return Ok(String::new());
        }

        let new_indent = match indentation {
            Some(k) => k,
            None => {
                let k = self.current_indent();
                if !self.current_is_empty() && k == 0 {
                    return Err(self.indentation_error());
                }
                k
            }
        };

        let mut data = vec![strip_indent(self.current(), new_indent)];
        while self.advance() {
            if self.current_is_empty() {
                if self.current_is_blank() {
                    data.push(strip_indent(self.current(), new_indent));
                }
                continue;
            }
            let indent = self.current_indent();
            if indent >= new_indent {
                data.push(strip_indent(self.current(), new_indent));
            } else if indent == 0 {
                self.retreat();
                break;
            } else {
                return Err(self.indentation_error());
            }
        }

        Ok(data.join("\n"))
    }

    fn indentation_error(&self) -> ParseError {
        ParseError::Indentation(String::new()).at_line(self.line_number(), self.current())
    }
}

fn strip_indent(line: &str, indent: usize) -> String {
    line.get(indent..).unwrap_or("").to_string()
}
