//! Flow-style (inline) parser.
//!
//! Recursive descent over a single logical line: `[...]` sequences, `{...}`
//! mappings, quoted scalars, and plain scalars handed to the scalar
//! evaluator. Indices walk a char slice; nested constructs re-enter the
//! sequence and mapping parsers.

use crate::error::{ParseError, Result};
use crate::scalar;
use crate::value::{Mapping, Value};

/// Parse a single logical line into a value.
pub fn load_inline(s: &str) -> Result<Value> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Value::String(String::new()));
    }

    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    match chars[0] {
        '[' => parse_sequence(&chars, &mut i),
        '{' => parse_mapping(&chars, &mut i),
        '"' | '\'' => Ok(Value::String(parse_quoted(&chars, &mut i)?)),
        _ => scalar::evaluate(strip_comment(s).trim_end()),
    }
}

/// Unquote a scalar when it carries quotes, leaving anything else verbatim.
/// Used for mapping keys, which are never scalar-evaluated.
pub(crate) fn dequote(s: &str) -> Result<String> {
    let chars: Vec<char> = s.chars().collect();
    match chars.first() {
        Some('"') | Some('\'') => {
            let mut i = 0;
            parse_quoted(&chars, &mut i)
        }
        _ => Ok(s.to_string()),
    }
}

/// Drop a trailing `" #..."` comment, tracking quote state so a hash inside
/// a quoted region survives.
fn strip_comment(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' if !in_single => in_double = !in_double,
            b'\'' if !in_double => in_single = !in_single,
            b' ' if !in_single && !in_double => {
                if bytes.get(i + 1) == Some(&b'#') {
                    return &s[..i];
                }
            }
            _ => {}
        }
    }
    s
}

/// Parse a flow sequence. `i` points at the opening `[` on entry and is left
/// just past the closing `]` on exit.
fn parse_sequence(chars: &[char], i: &mut usize) -> Result<Value> {
    let mut output = Vec::new();
    *i += 1;

    while *i < chars.len() {
        match chars[*i] {
            ',' | ' ' => {
                *i += 1;
            }
            ']' => {
                *i += 1;
                return Ok(Value::Sequence(output));
            }
            '[' => output.push(parse_sequence(chars, i)?),
            '{' => output.push(parse_mapping(chars, i)?),
            '"' | '\'' => output.push(Value::String(parse_quoted(chars, i)?)),
            _ => {
                let raw = scan_until(chars, i, &[',', ']'])?;
                // A plain element shaped like `key: value` is usually a
                // compact single-pair mapping; keep the scalar when the
                // recovery parse fails.
                if raw.contains(": ") {
                    let wrapped: Vec<char> = format!("{{{}}}", raw).chars().collect();
                    let mut j = 0;
                    if let Ok(mapping) = parse_mapping(&wrapped, &mut j) {
                        output.push(mapping);
                        continue;
                    }
                }
                output.push(scalar::evaluate(raw.trim())?);
            }
        }
    }

    Err(malformed("unclosed sequence"))
}

/// Parse a flow mapping. `i` points at the opening `{` on entry and is left
/// just past the closing `}` on exit. Keys are never scalar-evaluated.
fn parse_mapping(chars: &[char], i: &mut usize) -> Result<Value> {
    let mut output = Mapping::new();
    *i += 1;

    while *i < chars.len() {
        match chars[*i] {
            ',' | ' ' => {
                *i += 1;
                continue;
            }
            '}' => {
                *i += 1;
                return Ok(Value::Mapping(output));
            }
            _ => {}
        }

        let key = match chars[*i] {
            '"' | '\'' => parse_quoted(chars, i)?,
            _ => scan_until(chars, i, &[':', ' '])?,
        };

        // Value follows after colon and padding
        while *i < chars.len() {
            match chars[*i] {
                ':' | ' ' => {
                    *i += 1;
                }
                '[' => {
                    let value = parse_sequence(chars, i)?;
                    output.insert(key, value);
                    break;
                }
                '{' => {
                    let value = parse_mapping(chars, i)?;
                    output.insert(key, value);
                    break;
                }
                '"' | '\'' => {
                    let value = parse_quoted(chars, i)?;
                    output.insert(key, Value::String(value));
                    break;
                }
                _ => {
                    let raw = scan_until(chars, i, &[',', '}'])?;
                    output.insert(key, scalar::evaluate(raw.trim())?);
                    break;
                }
            }
        }
    }

    Err(malformed("unclosed mapping"))
}

/// Read raw text from `i` up to (not including) the first delimiter.
/// Requires at least one character before the delimiter.
fn scan_until(chars: &[char], i: &mut usize, delimiters: &[char]) -> Result<String> {
    let start = *i;
    let mut j = start;
    while j < chars.len() {
        if delimiters.contains(&chars[j]) {
            if j == start {
                break;
            }
            *i = j;
            return Ok(chars[start..j].iter().collect());
        }
        j += 1;
    }
    Err(malformed("missing delimiter after scalar"))
}

/// Parse a quoted scalar starting at `i`, leaving `i` past the closing
/// quote. Double quotes unescape `\"`, `\n`, `\r`; single quotes unescape
/// `''`. No other escapes exist.
fn parse_quoted(chars: &[char], i: &mut usize) -> Result<String> {
    let quote = chars[*i];
    let mut out = String::new();
    let mut j = *i + 1;

    if quote == '"' {
        while j < chars.len() {
            match chars[j] {
                '\\' if j + 1 < chars.len() => {
                    match chars[j + 1] {
                        '"' => out.push('"'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                    j += 2;
                }
                '"' => {
                    *i = j + 1;
                    return Ok(out);
                }
                c => {
                    out.push(c);
                    j += 1;
                }
            }
        }
    } else {
        while j < chars.len() {
            if chars[j] == '\'' {
                if chars.get(j + 1) == Some(&'\'') {
                    out.push('\'');
                    j += 2;
                } else {
                    *i = j + 1;
                    return Ok(out);
                }
            } else {
                out.push(chars[j]);
                j += 1;
            }
        }
    }

    Err(malformed("unterminated quoted scalar"))
}

fn malformed(detail: &str) -> ParseError {
    ParseError::MalformedInline(detail.to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(load_inline("  ").unwrap(), Value::String("".into()));
    }

    #[test]
    fn test_plain_scalar() {
        assert_eq!(load_inline("42").unwrap(), Value::Int(42));
        assert_eq!(load_inline("hello world").unwrap(), Value::String("hello world".into()));
    }

    #[test]
    fn test_comment_strip() {
        assert_eq!(load_inline("42 # answer").unwrap(), Value::Int(42));
        assert_eq!(
            load_inline("\"a # b\"").unwrap(),
            Value::String("a # b".into())
        );
    }

    #[test]
    fn test_sequence() {
        let v = load_inline("[1, 2, 3]").unwrap();
        let seq = v.as_sequence().unwrap();
        assert_eq!(seq, &vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_nested() {
        let v = load_inline("[[1, 2], {k: v}]").unwrap();
        let seq = v.as_sequence().unwrap();
        assert_eq!(seq[0].as_sequence().unwrap().len(), 2);
        assert_eq!(seq[1].get("k").unwrap(), &Value::String("v".into()));
    }

    #[test]
    fn test_mapping() {
        let v = load_inline("{a: 1, b: two}").unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Int(1));
        assert_eq!(v.get("b").unwrap(), &Value::String("two".into()));
    }

    #[test]
    fn test_mapping_keys_stay_strings() {
        let v = load_inline("{10: x, true: y}").unwrap();
        let map = v.as_mapping().unwrap();
        assert!(map.contains_key("10"));
        assert!(map.contains_key("true"));
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(
            load_inline(r#""a\"b\nc""#).unwrap(),
            Value::String("a\"b\nc".into())
        );
        assert_eq!(
            load_inline("'it''s'").unwrap(),
            Value::String("it's".into())
        );
        // Unknown escapes pass through verbatim
        assert_eq!(
            load_inline(r#""a\tb""#).unwrap(),
            Value::String("a\\tb".into())
        );
    }

    #[test]
    fn test_embedded_pair_recovery() {
        let v = load_inline("[a: 1, b: 2]").unwrap();
        let seq = v.as_sequence().unwrap();
        assert_eq!(seq[0].get("a").unwrap(), &Value::Int(1));
        assert_eq!(seq[1].get("b").unwrap(), &Value::Int(2));
    }

    #[test]
    fn test_ordered_duplicate_keys() {
        let v = load_inline("{a: 1, b: 2, a: 3}").unwrap();
        let map = v.as_mapping().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Value::Int(3)));
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_malformed() {
        assert!(load_inline("[1, 2").is_err());
        assert!(load_inline("{a: 1").is_err());
        assert!(load_inline("\"unterminated").is_err());
    }
}
