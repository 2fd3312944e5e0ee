//! Byte ranges and document identity.

use serde::{Deserialize, Serialize};

/// A unique identifier for a live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

/// A half-open byte range `[start, end)` in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    /// Start byte offset (inclusive)
    pub start: u32,
    /// End byte offset (exclusive)
    pub end: u32,
}

impl SourceRange {
    /// Create a new range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a range from a start offset and a length.
    pub fn with_len(start: u32, len: u32) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Check if this range contains the given offset.
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Get the length of this range.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if this range is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}
