//! Error types for YAML parsing.

use std::io;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// A lazily compiled pattern whose compile failure is surfaced as
/// [`ParseError::Regex`] instead of a panic.
pub(crate) type LazyRegex = Lazy<std::result::Result<Regex, regex::Error>>;

/// Fetch a compiled core pattern.
pub(crate) fn compiled(cell: &'static LazyRegex) -> Result<&'static Regex> {
    cell.as_ref().map_err(ParseError::regex)
}

/// Error type for YAML parsing.
///
/// Variants that arise while walking a document carry a location suffix
/// naming the 1-based source line and its verbatim text, filled in by
/// [`ParseError::at_line`].
#[derive(Error, Debug)]
pub enum ParseError {
    /// Tab characters used where indentation spaces are required.
    #[error("tabs are not allowed for indentation{0}")]
    TabIndentation(String),

    /// Inconsistent indentation inside an embedded block.
    #[error("inconsistent indentation in embedded block{0}")]
    Indentation(String),

    /// Unclosed bracket, unterminated quote, or unrecognized structure.
    #[error("malformed inline structure: {0}{1}")]
    MalformedInline(String, String),

    /// Merge key used against a scalar, or a sequence merge containing a
    /// non-mapping.
    #[error("merge key requires a mapping or a sequence of mappings{0}")]
    Merge(String),

    /// Alias names an anchor that was never declared.
    #[error("reference to undeclared anchor \"{0}\"{1}")]
    Reference(String, String),

    /// The regex engine could not compile or apply a core pattern.
    #[error("regex engine failure: {0}")]
    Regex(String),

    /// The reader facade was given a path that does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The reader facade could not read an existing file.
    #[error("unable to read {0}: {1}")]
    FileUnreadable(String, #[source] io::Error),
}

impl ParseError {
    /// Attach the offending source line to an error.
    ///
    /// `line` is 1-based and refers to the original pre-normalization input.
    /// File errors pass through unchanged.
    pub fn at_line(self, line: usize, text: &str) -> Self {
        let suffix = format!(" at line {} near {:?}", line, text);
        match self {
            ParseError::TabIndentation(_) => ParseError::TabIndentation(suffix),
            ParseError::Indentation(_) => ParseError::Indentation(suffix),
            ParseError::MalformedInline(detail, _) => ParseError::MalformedInline(detail, suffix),
            ParseError::Merge(_) => ParseError::Merge(suffix),
            ParseError::Reference(name, _) => ParseError::Reference(name, suffix),
            other => other,
        }
    }

    /// Wrap a regex engine failure.
    pub(crate) fn regex(err: &regex::Error) -> Self {
        ParseError::Regex(err.to_string())
    }
}
