//! Forgiving YAML 1.x subset parser.
//!
//! Parses indentation-driven block YAML, flow-style (`[...]`/`{...}`)
//! collections, folded and literal scalars, anchors/aliases, and the `<<`
//! merge key into a dynamically typed [`Value`] tree. Built for
//! configuration files, not YAML 1.2 conformance: tags beyond the `!str`
//! and `! ` casts, directives beyond the `%YAML` banner, and emission are
//! out of scope.
//!
//! # Parsing Pipeline
//!
//! 1. **Normalization**: line endings, the `%YAML` banner, leading comment
//!    runs, and document markers are stripped up front, keeping an offset so
//!    errors report original line numbers.
//!
//! 2. **Block scanner**: a cursor over the normalized lines answering
//!    indentation queries and extracting embedded blocks.
//!
//! 3. **Document parser**: dispatches per line on entry shape and recurses
//!    into sub-parsers for nested blocks, sharing one anchor table.
//!
//! 4. **Leaf evaluators**: the inline parser for flow collections and the
//!    scalar evaluator for typed leaves.

mod error;
mod folded;
mod inline;
mod parser;
mod reader;
mod scalar;
mod scanner;
mod value;

pub use error::{ParseError, Result};
pub use reader::{Cache, Reader};
pub use value::{Mapping, Value};

/// Parse a YAML document from a string.
///
/// A multi-document stream (`---` separated) yields a sequence of the
/// documents' roots in stream order.
///
/// # Example
///
/// ```
/// use yamlite::parse;
///
/// let value = parse("answer: 42\n").unwrap();
/// assert_eq!(value.get("answer").unwrap().as_int(), Some(42));
/// ```
pub fn parse(input: &str) -> Result<Value> {
    parser::parse_document(input)
}
