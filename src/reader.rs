//! Reader facade.
//!
//! Opens a file, parses it, and optionally memoizes the parsed tree through
//! a cache collaborator keyed by file modification time.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::{ParseError, Result};
use crate::parser;
use crate::value::Value;

/// Cache collaborator contract.
///
/// The reader compares [`Cache::time`] against the file's mtime: a cached
/// timestamp at or past the mtime means the stored tree is current. Storage
/// is opaque to the reader.
pub trait Cache {
    /// Seconds-since-epoch timestamp recorded for a key, if any.
    fn time(&self, key: &str) -> Option<i64>;

    /// The stored tree for a key, if any.
    fn fetch(&self, key: &str) -> Option<Value>;

    /// Store a tree under a key. A ttl of 0 means no expiry; the entry is
    /// invalidated by mtime comparison alone.
    fn store(&mut self, key: &str, value: Value, ttl: u64);
}

/// Opens and parses files, consulting an optional cache.
#[derive(Default)]
pub struct Reader {
    cache: Option<Box<dyn Cache>>,
}

impl Reader {
    /// A reader with no cache: every call parses the file.
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// A reader backed by a cache collaborator.
    pub fn with_cache(cache: Box<dyn Cache>) -> Self {
        Self { cache: Some(cache) }
    }

    /// Read and parse a file.
    ///
    /// Fails with [`ParseError::FileNotFound`] when the path does not exist
    /// and [`ParseError::FileUnreadable`] on any I/O error. Bytes are taken
    /// as UTF-8 without validation.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }
        let key = path.display().to_string();
        let mtime = file_mtime(path)?;

        if let Some(cache) = &self.cache {
            if cache.time(&key).is_some_and(|cached_at| cached_at >= mtime) {
                if let Some(value) = cache.fetch(&key) {
                    return Ok(value);
                }
            }
        }

        let bytes =
            fs::read(path).map_err(|err| ParseError::FileUnreadable(key.clone(), err))?;
        let text = String::from_utf8_lossy(&bytes);
        let value = parser::parse_document(&text)?;

        if let Some(cache) = &mut self.cache {
            cache.store(&key, value.clone(), 0);
        }
        Ok(value)
    }
}

/// File modification time in seconds since the epoch, signed.
fn file_mtime(path: &Path) -> Result<i64> {
    let unreadable = |err| ParseError::FileUnreadable(path.display().to_string(), err);
    let modified = fs::metadata(path)
        .map_err(unreadable)?
        .modified()
        .map_err(unreadable)?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
    })
}
