//! Folded and literal block scalars.
//!
//! Reads the body of a `|` or `>` value from the block scanner. Literal
//! style joins lines with newlines; folded style joins with spaces, breaking
//! back to a newline whenever indentation shifts. The chomping indicator
//! decides what happens to the trailing newline run.

use crate::scanner::{indent_of, Scanner};

/// Trailing-newline policy from the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chomping {
    /// Default: collapse trailing newlines to exactly one.
    Clip,
    /// `-`: remove all trailing newlines.
    Strip,
    /// `+`: leave the tail untouched.
    Keep,
}

/// Read the block body following a `|`/`>` header line.
///
/// `separator` is `'\n'` for literal style and `' '` for folded style.
/// `explicit_indent` is the indentation digit from the header, 0 when
/// absent. The cursor is left on the last line consumed; the first line
/// that falls outside the block is pushed back.
pub fn read_block(scanner: &mut Scanner, separator: char, chomping: Chomping, explicit_indent: usize) -> String {
    let mut text = String::new();

    // Leading blank lines each contribute a newline
    let mut more = scanner.advance();
    while more && scanner.current_is_blank() {
        text.push('\n');
        more = scanner.advance();
    }
    if !more {
        return String::new();
    }

    // The first content line fixes the text indent
    let indent = indent_of(scanner.current());
    let text_indent = if explicit_indent > 0 { explicit_indent } else { indent };
    if indent == 0 || indent < text_indent {
        scanner.retreat();
        return String::new();
    }
    text.push_str(&scanner.current()[text_indent..]);
    text.push(separator);
    let mut previous_indent = text_indent;

    while scanner.advance() {
        if scanner.current_is_blank() {
            let skip = indent_of(scanner.current()).min(text_indent);
            text.push_str(&scanner.current()[skip..]);
            text.push('\n');
            continue;
        }
        let indent = indent_of(scanner.current());
        if indent < text_indent {
            scanner.retreat();
            break;
        }
        // A shift in indentation breaks folding on the previous joint
        if separator == ' ' && indent != previous_indent {
            text.pop();
            text.push('\n');
        }
        previous_indent = indent;
        text.push_str(&scanner.current()[text_indent..]);
        text.push(if indent > text_indent { '\n' } else { separator });
    }

    if separator == ' ' {
        // A dangling fold joint at the end becomes a newline
        let without_newlines = text.trim_end_matches('\n');
        if without_newlines.ends_with(' ') {
            let mut normalized = without_newlines.trim_end_matches(' ').to_string();
            normalized.push('\n');
            text = normalized;
        }
    }

    match chomping {
        Chomping::Clip => {
            if text.ends_with('\n') {
                text.truncate(text.trim_end_matches('\n').len());
                text.push('\n');
            }
            text
        }
        Chomping::Strip => text.trim_end_matches('\n').to_string(),
        Chomping::Keep => text,
    }
}
