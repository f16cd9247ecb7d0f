//! Per-request search report.
//!
//! Non-fatal conditions (missing terms, fallbacks, estimates) are recorded
//! here as human-readable lines instead of aborting the request. Byte offsets
//! into the buffer let the cache capture the fragment produced by one step
//! and replay it verbatim on a later hit.

use std::fmt;
use std::ops::Range;

/// Accumulated report text for one search request.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    buffer: String,
    index_name: Option<String>,
}

impl SearchReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix subsequent lines with the given index name.
    pub fn set_index<S: Into<String>>(&mut self, name: S) {
        self.index_name = Some(name.into());
    }

    /// Append one line.
    pub fn append<S: AsRef<str>>(&mut self, line: S) {
        if let Some(name) = &self.index_name {
            self.buffer.push_str("Index '");
            self.buffer.push_str(name);
            self.buffer.push_str("': ");
        }
        self.buffer.push_str(line.as_ref());
        self.buffer.push('\n');
    }

    /// Current byte length of the report.
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Copy of the bytes in `range`, clamped to the buffer.
    pub fn fragment(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.buffer.len());
        let start = range.start.min(end);
        self.buffer[start..end].to_string()
    }

    /// Fragment from `start` to the current end.
    pub fn fragment_since(&self, start: usize) -> String {
        self.fragment(start..self.buffer.len())
    }

    /// Append a previously captured fragment verbatim.
    pub fn replay(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    /// Append another report's text.
    pub fn absorb(&mut self, other: SearchReport) {
        self.buffer.push_str(&other.buffer);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}
