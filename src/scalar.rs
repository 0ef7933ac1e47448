//! Scalar evaluation.
//!
//! Turns a trimmed scalar string into a typed [`Value`]. The rules form a
//! priority ladder and the order is observable behavior: an all-digit string
//! with a leading zero is octal, a signed integer is a float, and a lone `-`
//! or `+` is a boolean.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{compiled, LazyRegex, Result};
use crate::value::Value;

/// Words evaluating to `true`, compared case-insensitively.
const TRUE_WORDS: [&str; 5] = ["true", "on", "+", "yes", "y"];

/// Words evaluating to `false`, compared case-insensitively.
const FALSE_WORDS: [&str; 5] = ["false", "off", "-", "no", "n"];

/// Locale-insensitive numeric form: optional sign, digits with optional
/// fraction and exponent, or a leading-dot fraction. Deliberately excludes
/// the `inf`/`nan` words that `f64::from_str` would accept.
static NUMERIC: LazyRegex =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$"));

/// Hexadecimal integer literal.
static HEX: LazyRegex = Lazy::new(|| Regex::new(r"^0[xX][0-9a-fA-F]+$"));

/// Signed decimal with comma thousands separators.
static COMMA_NUMBER: LazyRegex =
    Lazy::new(|| Regex::new(r"^[-+]?[0-9,]+(\.[0-9]+)?$"));

/// ISO-8601-ish timestamp: date, optional time, optional fraction and zone.
static TIMESTAMP: LazyRegex = Lazy::new(|| {
    Regex::new(
        r"(?x)^
        (?P<year>\d{4})-(?P<month>\d\d?)-(?P<day>\d\d?)
        (?:(?:[Tt]|[\ \t]+)
            (?P<hour>\d\d?):(?P<minute>\d\d):(?P<second>\d\d)
            (?:\.(?P<fraction>\d*))?
            (?:[\ \t]*(?:Z|(?P<tz_sign>[-+])(?P<tz_hour>\d\d?)(?::(?P<tz_minute>\d\d))?))?
        )?
        $",
    )
});

/// Evaluate a trimmed scalar string into a typed value.
pub fn evaluate(s: &str) -> Result<Value> {
    // Null forms
    if s.is_empty() || s == "~" || s.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }

    // Explicit casts
    if let Some(rest) = s.strip_prefix("!str ") {
        return Ok(Value::String(rest.to_string()));
    }
    if let Some(rest) = s.strip_prefix("! ") {
        return Ok(Value::Int(leading_int(rest, 10)));
    }

    // Unsigned digit runs: octal when zero-prefixed, else decimal
    if s.bytes().all(|b| b.is_ascii_digit()) {
        if s.starts_with('0') && s.len() > 1 {
            return Ok(Value::Int(leading_int(s, 8)));
        }
        return Ok(match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Value::Int(n),
            _ => Value::String(s.to_string()),
        });
    }

    // Boolean word sets (a lone `-` or `+` lands here)
    let lower = s.to_ascii_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) {
        return Ok(Value::Bool(true));
    }
    if FALSE_WORDS.contains(&lower.as_str()) {
        return Ok(Value::Bool(false));
    }

    // Numeric forms
    if compiled(&HEX)?.is_match(s) {
        return Ok(match i64::from_str_radix(&s[2..], 16) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::String(s.to_string()),
        });
    }
    if compiled(&NUMERIC)?.is_match(s) {
        return Ok(match s.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::String(s.to_string()),
        });
    }

    // Non-finite floats
    if lower == ".inf" {
        return Ok(Value::Float(f64::INFINITY));
    }
    if lower == ".nan" {
        return Ok(Value::Float(f64::NAN));
    }
    if lower == "-.inf" {
        return Ok(Value::Float(f64::NEG_INFINITY));
    }

    // Comma-grouped decimals
    if compiled(&COMMA_NUMBER)?.is_match(s) {
        let stripped: String = s.chars().filter(|c| *c != ',').collect();
        if let Ok(f) = stripped.parse::<f64>() {
            return Ok(Value::Float(f));
        }
    }

    // Timestamps
    if let Some(caps) = compiled(&TIMESTAMP)?.captures(s) {
        if let Some(epoch) = timestamp_epoch(&caps) {
            return Ok(Value::Timestamp(epoch));
        }
    }

    Ok(Value::String(s.to_string()))
}

/// Parse the longest valid leading digit run in the given radix, after an
/// optional sign. An empty run yields 0 and overflow saturates.
fn leading_int(s: &str, radix: u32) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let run: String = digits
        .chars()
        .take_while(|c| c.is_digit(radix))
        .collect();
    if run.is_empty() {
        return 0;
    }
    let magnitude = i128::from_str_radix(&run, radix).unwrap_or(i128::from(i64::MAX));
    let signed = if negative { -magnitude } else { magnitude };
    signed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Convert captured timestamp fields to epoch seconds.
///
/// A missing time component means midnight; a missing zone means UTC. The
/// fractional-second capture is matched but discarded. Returns `None` for
/// impossible civil dates, which sends the scalar down the string fallback.
fn timestamp_epoch(caps: &regex::Captures<'_>) -> Option<i64> {
    let field = |name: &str| caps.name(name).map(|m| m.as_str().parse::<i64>().unwrap_or(0));

    let year = field("year")?;
    let month = field("month")?;
    let day = field("day")?;
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?;

    let hour = field("hour").unwrap_or(0);
    let minute = field("minute").unwrap_or(0);
    let second = field("second").unwrap_or(0);
    let time = date.and_hms_opt(hour as u32, minute as u32, second as u32)?;

    let mut epoch = time.and_utc().timestamp();
    if let Some(tz_hour) = field("tz_hour") {
        let tz_minute = field("tz_minute").unwrap_or(0);
        let shift = tz_hour * 3600 + tz_minute * 60;
        match caps.name("tz_sign").map(|m| m.as_str()) {
            Some("-") => epoch += shift,
            _ => epoch -= shift,
        }
    }
    Some(epoch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> Value {
        evaluate(s).unwrap()
    }

    #[test]
    fn test_null_forms() {
        assert_eq!(eval(""), Value::Null);
        assert_eq!(eval("~"), Value::Null);
        assert_eq!(eval("null"), Value::Null);
        assert_eq!(eval("NULL"), Value::Null);
    }

    #[test]
    fn test_str_cast() {
        assert_eq!(eval("!str 123"), Value::String("123".into()));
        // The cast is the 5-char `!str ` literal; near-misses stay strings
        assert_eq!(eval("!strict"), Value::String("!strict".into()));
        assert_eq!(eval("!str"), Value::String("!str".into()));
    }

    #[test]
    fn test_int_cast() {
        assert_eq!(eval("! 42"), Value::Int(42));
        assert_eq!(eval("! 42abc"), Value::Int(42));
        assert_eq!(eval("! abc"), Value::Int(0));
    }

    #[test]
    fn test_digit_runs() {
        assert_eq!(eval("123"), Value::Int(123));
        assert_eq!(eval("0"), Value::Int(0));
        // Leading zero switches to octal
        assert_eq!(eval("0644"), Value::Int(0o644));
        assert_eq!(eval("010"), Value::Int(8));
        // Invalid octal digit stops the scan
        assert_eq!(eval("0800"), Value::Int(0));
        // Overflowing decimals stay strings
        assert_eq!(
            eval("99999999999999999999"),
            Value::String("99999999999999999999".into())
        );
    }

    #[test]
    fn test_booleans() {
        for w in ["true", "True", "ON", "yes", "Y", "+"] {
            assert_eq!(eval(w), Value::Bool(true), "{}", w);
        }
        for w in ["false", "OFF", "no", "n", "-"] {
            assert_eq!(eval(w), Value::Bool(false), "{}", w);
        }
    }

    #[test]
    fn test_numeric() {
        assert_eq!(eval("-5"), Value::Float(-5.0));
        assert_eq!(eval("+3"), Value::Float(3.0));
        assert_eq!(eval("3.14"), Value::Float(3.14));
        assert_eq!(eval("1e3"), Value::Float(1000.0));
        assert_eq!(eval(".5"), Value::Float(0.5));
        assert_eq!(eval("0x1A"), Value::Int(26));
        // Words f64::from_str accepts must not leak through
        assert_eq!(eval("inf"), Value::String("inf".into()));
        assert_eq!(eval("nan"), Value::String("nan".into()));
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(eval(".inf"), Value::Float(f64::INFINITY));
        assert_eq!(eval(".Inf"), Value::Float(f64::INFINITY));
        assert_eq!(eval("-.inf"), Value::Float(f64::NEG_INFINITY));
        assert!(eval(".nan").as_float().unwrap().is_nan());
        assert!(eval(".NaN").as_float().unwrap().is_nan());
    }

    #[test]
    fn test_comma_grouped() {
        assert_eq!(eval("1,234"), Value::Float(1234.0));
        assert_eq!(eval("-1,234.5"), Value::Float(-1234.5));
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(eval("2001-12-14"), Value::Timestamp(1_008_288_000));
        assert_eq!(
            eval("2001-12-14t21:59:43.10-05:00"),
            Value::Timestamp(1_008_385_183)
        );
        assert_eq!(
            eval("2001-12-14 21:59:43 Z"),
            Value::Timestamp(1_008_367_183)
        );
        // Impossible civil dates fall back to strings
        assert_eq!(eval("2001-02-30"), Value::String("2001-02-30".into()));
    }

    #[test]
    fn test_string_fallback() {
        assert_eq!(eval("hello"), Value::String("hello".into()));
        assert_eq!(eval("+.inf"), Value::String("+.inf".into()));
        assert_eq!(eval("12 34"), Value::String("12 34".into()));
    }
}
