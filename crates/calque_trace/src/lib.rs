//! # calque_trace
//!
//! Trace - the offset-mapping core of Calque.
//!
//! ## Name Origin
//!
//! A **calque** is the sheet of tracing paper a draughtsman lays over a
//! drawing to copy its lines onto another surface. `calque_trace` is that
//! sheet: it records exactly which ranges of the original template sources
//! shine through into the generated type-check document, and lets positions
//! travel in both directions along those lines.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        calque_trace                          |
//! +--------------------------------------------------------------+
//! |                                                              |
//! |  MappingRecord (raw, multi-span)                             |
//! |        |                                                     |
//! |        v  TranspiledMap::build                               |
//! |  FileMappings (per-file buckets of atomic Segments)          |
//! |        |                                                     |
//! |        v                                                     |
//! |  to_generated / to_source  (affine, never extrapolating)     |
//! |                                                              |
//! +--------------------------------------------------------------+
//! ```
//!
//! Everything in this crate is a pure function over immutable values; no
//! I/O, no interior mutability, no async.

mod map;
mod range;
mod segment;

pub use map::{FileMappings, MappingConflict, TranspiledMap};
pub use range::{DocId, SourceRange};
pub use segment::{MappingRecord, Segment, SegmentFlags};
