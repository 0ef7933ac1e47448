//! Block-mode document parser.
//!
//! Walks the normalized lines of one document and dispatches on entry shape:
//! document markers, sequence entries, mapping entries (including the `<<`
//! merge directive), and the multi-line plain-scalar fallback. Nested blocks
//! are handed to a sub-parser that shares this parser's anchor table and
//! reports line numbers relative to the original source.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{compiled, LazyRegex, ParseError, Result};
use crate::folded::{self, Chomping};
use crate::inline;
use crate::scanner::Scanner;
use crate::value::{Mapping, Value};

/// Anchor table: name to most-recently-assigned value. Shared by mutable
/// reference between a document parser and the sub-parsers it spawns.
pub type AnchorTable = HashMap<String, Value>;

/// Sequence entry: a lone `-`, or `-` followed by whitespace and a value.
static SEQUENCE_ENTRY: LazyRegex =
    Lazy::new(|| Regex::new(r"^-(?:(?P<leadspaces>\s+)(?P<value>.+?))?\s*$"));

/// Mapping entry: quoted or plain key, optional spaces, colon, optional value.
static MAPPING_ENTRY: LazyRegex = Lazy::new(|| {
    Regex::new(
        r#"^(?P<key>"[^"\\]*(?:\\.[^"\\]*)*"|'[^']*(?:''[^']*)*'|[^ '"\[{].*?) *:(?:\s+(?P<value>.+?))?\s*$"#,
    )
});

/// Anchor declaration prefixing a value.
static ANCHOR: LazyRegex = Lazy::new(|| Regex::new(r"^&(?P<name>[^ ]+) *(?P<value>.*)"));

/// Folded-scalar header: style, optional chomping/indent modifiers, comment.
static FOLDED_HEADER: LazyRegex = Lazy::new(|| {
    Regex::new(r"^(?P<style>[|>])(?P<modifiers>\+|-|\d+|\+\d+|-\d+|\d+\+|\d+-)?(?: +#.*)?$")
});

/// Line that forces newline joining in the plain multi-line fallback.
static DASH_PIPE: LazyRegex = Lazy::new(|| Regex::new(r"^-+ \|.*\s"));

/// YAML version directive banner.
static YAML_HEADER: LazyRegex = Lazy::new(|| Regex::new(r"^%YAML[: ][\d.]+[^\n]*\n"));

/// Run of full-line comments at the start of the input.
static LEADING_COMMENTS: LazyRegex = Lazy::new(|| Regex::new(r"^(#[^\n]*\n)+"));

/// Parse a document (or multi-document stream) into a value tree.
pub fn parse_document(input: &str) -> Result<Value> {
    let mut refs = AnchorTable::new();
    Parser::new(input, 0, &mut refs)?.parse()
}

/// The accumulator for the document being built: its kind is fixed by the
/// first entry seen.
enum Accumulator {
    Empty,
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Accumulator {
    fn into_value(self) -> Value {
        match self {
            Accumulator::Empty => Value::Null,
            Accumulator::Sequence(seq) => Value::Sequence(seq),
            Accumulator::Mapping(map) => Value::Mapping(map),
        }
    }
}

/// One document parser instance; lives for a single parse call.
pub struct Parser<'r> {
    scanner: Scanner,
    refs: &'r mut AnchorTable,
}

impl<'r> Parser<'r> {
    /// Normalize the input and set up the line cursor. `offset` is the
    /// number of original source lines preceding this text.
    pub fn new(input: &str, offset: usize, refs: &'r mut AnchorTable) -> Result<Self> {
        let mut offset = offset;
        let text = cleanup(input, &mut offset)?;
        let lines = text.split('\n').map(String::from).collect();
        Ok(Parser {
            scanner: Scanner::new(lines, offset),
            refs,
        })
    }

    /// Run the dispatch loop to completion.
    pub fn parse(mut self) -> Result<Value> {
        let mut documents: Vec<Value> = Vec::new();
        let mut acc = Accumulator::Empty;

        while self.scanner.advance() {
            if self.scanner.current_is_empty() {
                continue;
            }
            if self.scanner.has_tab_indent() {
                return Err(self.locate(ParseError::TabIndentation(String::new())));
            }

            let line = self.scanner.current().to_string();
            let trimmed = line.trim_end_matches(' ');

            // Document markers
            if trimmed == "---" {
                documents.push(std::mem::replace(&mut acc, Accumulator::Empty).into_value());
                continue;
            }
            if trimmed == "..." {
                continue;
            }

            if let Some(caps) = compiled(&SEQUENCE_ENTRY)?.captures(&line) {
                let leadspaces = caps.name("leadspaces").map(|m| m.as_str().to_string());
                let value = caps.name("value").map(|m| m.as_str().to_string());
                let mut seq = match std::mem::replace(&mut acc, Accumulator::Empty) {
                    Accumulator::Empty => Vec::new(),
                    Accumulator::Sequence(seq) => seq,
                    Accumulator::Mapping(_) => {
                        return Err(self.locate(malformed("sequence entry inside a mapping")));
                    }
                };
                let (element, anchor) =
                    self.parse_sequence_entry(leadspaces.as_deref(), value)?;
                seq.push(element);
                if let Some(name) = anchor {
                    if let Some(last) = seq.last() {
                        self.refs.insert(name, last.clone());
                    }
                }
                acc = Accumulator::Sequence(seq);
            } else if let Some(caps) = compiled(&MAPPING_ENTRY)?.captures(&line) {
                let raw_key = caps.name("key").unwrap().as_str().to_string();
                let value = caps.name("value").map(|m| m.as_str().to_string());
                let key = dequote_key(&raw_key).map_err(|e| self.locate(e))?;

                let mut map = match std::mem::replace(&mut acc, Accumulator::Empty) {
                    Accumulator::Empty => Mapping::new(),
                    Accumulator::Mapping(map) => map,
                    Accumulator::Sequence(_) => {
                        return Err(self.locate(malformed("mapping entry inside a sequence")));
                    }
                };
                if key == "<<" {
                    self.merge_entry(&mut map, value)?;
                } else {
                    self.mapping_entry(&mut map, key, value)?;
                }
                acc = Accumulator::Mapping(map);
            } else {
                return self.plain_multiline_fallback();
            }
        }

        if documents.is_empty() {
            Ok(acc.into_value())
        } else {
            documents.push(acc.into_value());
            Ok(Value::Sequence(documents))
        }
    }

    /// Parse one `- ...` entry, returning the element and any anchor name to
    /// record once the element is in place.
    fn parse_sequence_entry(
        &mut self,
        leadspaces: Option<&str>,
        value: Option<String>,
    ) -> Result<(Value, Option<String>)> {
        let (anchor, value) = split_anchor(value)?;

        let element = match value {
            Some(ref v) if !is_value_empty(v) => {
                if leadspaces == Some(" ") && compiled(&MAPPING_ENTRY)?.is_match(v) {
                    // Compact notation: the remainder of this line opens a
                    // mapping that may continue in a deeper block.
                    let offset = self.scanner.line_number() - 1;
                    let mut block = v.clone();
                    if !self.scanner.next_line_dedented() {
                        let indent = self.scanner.current_indent() + 2;
                        block.push('\n');
                        block.push_str(&self.scanner.next_embedded_block(Some(indent))?);
                    }
                    self.sub_parse(&block, offset)?
                } else {
                    self.parse_value(v)?
                }
            }
            _ => {
                // Empty or comment-only: the element is the nested block
                let offset = self.scanner.line_number();
                let block = self.scanner.next_embedded_block(None)?;
                self.sub_parse(&block, offset)?
            }
        };
        Ok((element, anchor))
    }

    /// Parse one `key: ...` entry into the accumulator mapping.
    fn mapping_entry(
        &mut self,
        map: &mut Mapping,
        key: String,
        value: Option<String>,
    ) -> Result<()> {
        let (anchor, value) = split_anchor(value)?;

        let stored = match value {
            Some(ref v) if !is_value_empty(v) => self.parse_value(v)?,
            _ => {
                // Empty or comment-only: null when the following line does
                // not open a deeper block.
                if self.scanner.next_line_dedented() {
                    Value::Null
                } else {
                    let offset = self.scanner.line_number();
                    let block = self.scanner.next_embedded_block(None)?;
                    self.sub_parse(&block, offset)?
                }
            }
        };

        map.insert(key.clone(), stored);
        if let Some(name) = anchor {
            if let Some(v) = map.get(&key) {
                self.refs.insert(name, v.clone());
            }
        }
        Ok(())
    }

    /// Handle the `<<` merge directive.
    fn merge_entry(&mut self, map: &mut Mapping, value: Option<String>) -> Result<()> {
        if let Some(v) = &value {
            if let Some(name) = v.strip_prefix('*') {
                // Merge in place: the referenced mapping replaces the
                // accumulator. Keys written before the directive are gone;
                // keys written after override.
                let referenced = self.refs.get(name).cloned().ok_or_else(|| {
                    self.locate(ParseError::Reference(name.to_string(), String::new()))
                })?;
                return match referenced {
                    Value::Mapping(m) => {
                        *map = m;
                        Ok(())
                    }
                    _ => Err(self.locate(ParseError::Merge(String::new()))),
                };
            }
        }

        let merged_value = match value {
            Some(ref v) if !is_value_empty(v) => self.parse_value(v)?,
            _ => {
                let offset = self.scanner.line_number();
                let block = self.scanner.next_embedded_block(None)?;
                self.sub_parse(&block, offset)?
            }
        };

        match merged_value {
            Value::Mapping(m) => {
                for (k, v) in m {
                    if !map.contains_key(&k) {
                        map.insert(k, v);
                    }
                }
                Ok(())
            }
            Value::Sequence(items) => {
                // Right-to-left: earlier-listed mappings win over later ones
                let mut merged = Mapping::new();
                for item in items.into_iter().rev() {
                    match item {
                        Value::Mapping(m) => {
                            for (k, v) in m {
                                merged.insert(k, v);
                            }
                        }
                        _ => return Err(self.locate(ParseError::Merge(String::new()))),
                    }
                }
                for (k, v) in merged {
                    if !map.contains_key(&k) {
                        map.insert(k, v);
                    }
                }
                Ok(())
            }
            _ => Err(self.locate(ParseError::Merge(String::new()))),
        }
    }

    /// Per-value dispatch: alias, folded scalar, or inline.
    fn parse_value(&mut self, value: &str) -> Result<Value> {
        if let Some(rest) = value.strip_prefix('*') {
            let name = match rest.find('#') {
                Some(pos) => rest[..pos].trim_end(),
                None => rest,
            };
            return match self.refs.get(name) {
                Some(v) => Ok(v.clone()),
                None => Err(self.locate(ParseError::Reference(name.to_string(), String::new()))),
            };
        }

        if let Some(caps) = compiled(&FOLDED_HEADER)?.captures(value) {
            let separator = if &caps["style"] == "|" { '\n' } else { ' ' };
            let modifiers = caps.name("modifiers").map_or("", |m| m.as_str());
            let chomping = if modifiers.contains('+') {
                Chomping::Keep
            } else if modifiers.contains('-') {
                Chomping::Strip
            } else {
                Chomping::Clip
            };
            let digits: String = modifiers.chars().filter(char::is_ascii_digit).collect();
            let explicit_indent = digits.parse().unwrap_or(0);
            return Ok(Value::String(folded::read_block(
                &mut self.scanner,
                separator,
                chomping,
                explicit_indent,
            )));
        }

        inline::load_inline(value).map_err(|e| self.locate(e))
    }

    /// A buffer that matched no entry shape is one multi-line plain scalar:
    /// trim and join every line, then hand the result to the inline parser.
    /// This short-circuits block parsing for the whole buffer.
    fn plain_multiline_fallback(&mut self) -> Result<Value> {
        let lines = self.scanner.lines();
        let multiline = lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty());
        if !multiline {
            return Err(self.locate(malformed("unrecognized line")));
        }

        let mut newline_joined = false;
        for line in lines {
            if compiled(&DASH_PIPE)?.is_match(line) {
                newline_joined = true;
                break;
            }
        }
        let separator = if newline_joined { "\n" } else { " " };
        let joined = self
            .scanner
            .lines()
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(separator);

        let value = inline::load_inline(joined.trim()).map_err(|e| self.locate(e))?;

        // A sequence led by an alias string materializes referenced values
        if let Value::Sequence(seq) = &value {
            let leads_with_alias =
                matches!(seq.first(), Some(Value::String(s)) if s.starts_with('*'));
            if leads_with_alias {
                let mut resolved = Vec::with_capacity(seq.len());
                for element in seq {
                    match element {
                        Value::String(s) if s.starts_with('*') => {
                            let name = &s[1..];
                            let v = self.refs.get(name).cloned().ok_or_else(|| {
                                self.locate(ParseError::Reference(
                                    name.to_string(),
                                    String::new(),
                                ))
                            })?;
                            resolved.push(v);
                        }
                        other => resolved.push(other.clone()),
                    }
                }
                return Ok(Value::Sequence(resolved));
            }
        }

        Ok(value)
    }

    /// Spawn a sub-parser over an embedded block, sharing the anchor table.
    fn sub_parse(&mut self, block: &str, offset: usize) -> Result<Value> {
        Parser::new(block, offset, self.refs)?.parse()
    }

    fn locate(&self, err: ParseError) -> ParseError {
        err.at_line(self.scanner.line_number(), self.scanner.current())
    }
}

/// Split a `&name rest` anchor declaration off an entry value.
fn split_anchor(value: Option<String>) -> Result<(Option<String>, Option<String>)> {
    if let Some(v) = &value {
        if let Some(caps) = compiled(&ANCHOR)?.captures(v) {
            return Ok((
                Some(caps["name"].to_string()),
                Some(caps["value"].to_string()),
            ));
        }
    }
    Ok((None, value))
}

/// A value slot counts as empty when it is all spaces or opens a comment.
fn is_value_empty(value: &str) -> bool {
    value.trim_matches(' ').is_empty() || value.trim_start_matches(' ').starts_with('#')
}

/// Remove quotes from a mapping key; keys are never scalar-evaluated.
fn dequote_key(key: &str) -> Result<String> {
    if key.starts_with('"') || key.starts_with('\'') {
        inline::dequote(key)
    } else {
        Ok(key.to_string())
    }
}

fn malformed(detail: &str) -> ParseError {
    ParseError::MalformedInline(detail.to_string(), String::new())
}

/// Pre-parse normalization: line endings, trailing newline, `%YAML` banner,
/// leading comment run, and document start/end markers. `offset` grows by
/// every stripped line so diagnostics keep original line numbers.
fn cleanup(input: &str, offset: &mut usize) -> Result<String> {
    let mut value = input.replace("\r\n", "\n").replace('\r', "\n");
    if !value.ends_with('\n') {
        value.push('\n');
    }

    if let Some(end) = compiled(&YAML_HEADER)?.find(&value).map(|m| m.end()) {
        *offset += 1;
        value = value[end..].to_string();
    }

    if let Some(m) = compiled(&LEADING_COMMENTS)?.find(&value) {
        let (end, stripped_lines) = (m.end(), m.as_str().matches('\n').count());
        *offset += stripped_lines;
        value = value[end..].to_string();
    }

    if value.starts_with("---") {
        if let Some(pos) = value.find('\n') {
            *offset += 1;
            value = value[pos + 1..].to_string();
            // Only a stream that opened with a marker closes with one
            if let Some(stripped) = strip_trailing_end_marker(&value) {
                value = stripped;
            }
        }
    }

    Ok(value)
}

/// Drop a trailing `...` end-of-document marker and the whitespace after it.
fn strip_trailing_end_marker(value: &str) -> Option<String> {
    let trimmed = value.trim_end_matches(['\n', ' ', '\t']);
    if trimmed.ends_with("...") {
        let mut out = trimmed[..trimmed.len() - 3].to_string();
        if !out.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_is_noop_on_lf_input() {
        let mut offset = 0;
        assert_eq!(cleanup("a: 1\n", &mut offset).unwrap(), "a: 1\n");
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_cleanup_normalizes_line_endings() {
        let mut offset = 0;
        assert_eq!(
            cleanup("a: 1\r\nb: 2\r", &mut offset).unwrap(),
            "a: 1\nb: 2\n"
        );
    }

    #[test]
    fn test_cleanup_strips_header_and_counts_offset() {
        let mut offset = 0;
        let out = cleanup("%YAML 1.1\n# note\n# more\n---\na: 1\n", &mut offset).unwrap();
        assert_eq!(out, "a: 1\n");
        assert_eq!(offset, 4);
    }

    #[test]
    fn test_cleanup_strips_end_marker_with_start_marker() {
        let mut offset = 0;
        let out = cleanup("---\na: 1\n...\n", &mut offset).unwrap();
        assert_eq!(out, "a: 1\n");
        // Without the opening marker the trailing one is kept
        let mut offset = 0;
        let out = cleanup("a: 1\n...\n", &mut offset).unwrap();
        assert_eq!(out, "a: 1\n...\n");
    }
}
