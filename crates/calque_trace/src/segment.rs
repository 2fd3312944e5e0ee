//! Atomic mapping segments and the raw records they are built from.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::range::SourceRange;

bitflags! {
    /// Capabilities enabled for a single mapping segment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u8 {
        /// Code completion may be delegated through this segment
        const COMPLETION = 1 << 0;
        /// Go-to-definition and find-usages
        const NAVIGATION = 1 << 1;
        /// Semantic highlighting
        const SEMANTIC = 1 << 2;
        /// Structure view and breadcrumbs
        const STRUCTURE = 1 << 3;
        /// Type verification diagnostics
        const VERIFICATION = 1 << 4;
        /// Reformatting of the owning buffer
        const FORMAT = 1 << 5;
    }
}

/// An atomic mapping between one contiguous source range and one contiguous
/// generated range. The two lengths may differ; a segment is never split or
/// merged after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Range in the owning source file
    pub source: SourceRange,
    /// Range in the generated document
    pub generated: SourceRange,
    /// Capabilities enabled for this segment
    pub flags: SegmentFlags,
}

impl Segment {
    /// Create a segment with every capability enabled.
    pub fn new(source: SourceRange, generated: SourceRange) -> Self {
        Self {
            source,
            generated,
            flags: SegmentFlags::all(),
        }
    }

    /// Create a segment with specific capabilities.
    pub fn with_flags(source: SourceRange, generated: SourceRange, flags: SegmentFlags) -> Self {
        Self {
            source,
            generated,
            flags,
        }
    }

    /// Map a source offset into the generated document.
    ///
    /// The offset must fall inside this segment's source range and the affine
    /// result must stay inside this segment's generated range; otherwise the
    /// mapping does not apply. A segment never extrapolates into a neighbour,
    /// even when the arithmetic would land inside one.
    pub fn source_to_generated(&self, offset: u32) -> Option<u32> {
        if !self.source.contains(offset) {
            return None;
        }
        let delta = offset - self.source.start;
        if delta < self.generated.len() {
            Some(self.generated.start + delta)
        } else {
            None
        }
    }

    /// Map a generated offset back into the owning source file.
    pub fn generated_to_source(&self, offset: u32) -> Option<u32> {
        if !self.generated.contains(offset) {
            return None;
        }
        let delta = offset - self.generated.start;
        if delta < self.source.len() {
            Some(self.source.start + delta)
        } else {
            None
        }
    }
}

/// A raw mapping record as emitted by the transpiler.
///
/// `source_spans` and `generated_spans` are aligned pair-wise; each pair of
/// `(offset, length)` entries describes one atomic piece, so a single record
/// may cover several disjoint ranges of the owning file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Name of the file owning the source spans
    pub owner: String,
    /// `(offset, length)` pairs in the owning file
    pub source_spans: Vec<(u32, u32)>,
    /// `(offset, length)` pairs in the generated document
    pub generated_spans: Vec<(u32, u32)>,
}

impl MappingRecord {
    /// Create a record for a single contiguous piece.
    pub fn single(
        owner: impl Into<String>,
        source: (u32, u32),
        generated: (u32, u32),
    ) -> Self {
        Self {
            owner: owner.into(),
            source_spans: vec![source],
            generated_spans: vec![generated],
        }
    }

    /// Iterate the aligned span pairs as segments carrying the given flags.
    ///
    /// Trailing spans without a counterpart on the other side are dropped.
    pub fn segments(&self, flags: SegmentFlags) -> impl Iterator<Item = Segment> + '_ {
        if self.source_spans.len() != self.generated_spans.len() {
            tracing::warn!(
                owner = %self.owner,
                source = self.source_spans.len(),
                generated = self.generated_spans.len(),
                "mapping record has unaligned span arrays, zipping to the shorter side"
            );
        }
        self.source_spans
            .iter()
            .zip(self.generated_spans.iter())
            .map(move |(&(src, src_len), &(gen, gen_len))| {
                Segment::with_flags(
                    SourceRange::with_len(src, src_len),
                    SourceRange::with_len(gen, gen_len),
                    flags,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_source_to_generated() {
        let seg = Segment::new(SourceRange::new(10, 20), SourceRange::new(100, 110));
        assert_eq!(seg.source_to_generated(10), Some(100));
        assert_eq!(seg.source_to_generated(15), Some(105));
        assert_eq!(seg.source_to_generated(19), Some(109));
        assert_eq!(seg.source_to_generated(9), None);
        assert_eq!(seg.source_to_generated(20), None);
    }

    #[test]
    fn test_segment_generated_to_source() {
        let seg = Segment::new(SourceRange::new(10, 20), SourceRange::new(100, 110));
        assert_eq!(seg.generated_to_source(100), Some(10));
        assert_eq!(seg.generated_to_source(109), Some(19));
        assert_eq!(seg.generated_to_source(99), None);
        assert_eq!(seg.generated_to_source(110), None);
    }

    #[test]
    fn test_segment_does_not_extrapolate() {
        // Generated side is shorter than the source side: offsets past the
        // generated end have no image, even though a neighbouring segment
        // could contain the affine result.
        let seg = Segment::new(SourceRange::new(0, 10), SourceRange::new(50, 54));
        assert_eq!(seg.source_to_generated(3), Some(53));
        assert_eq!(seg.source_to_generated(4), None);
        assert_eq!(seg.source_to_generated(9), None);

        let seg = Segment::new(SourceRange::new(0, 4), SourceRange::new(50, 60));
        assert_eq!(seg.generated_to_source(53), Some(3));
        assert_eq!(seg.generated_to_source(54), None);
    }

    #[test]
    fn test_record_segments() {
        let record = MappingRecord {
            owner: "a.html".to_string(),
            source_spans: vec![(5, 5), (20, 5)],
            generated_spans: vec![(30, 10), (60, 10)],
        };
        let segments: Vec<_> = record.segments(SegmentFlags::all()).collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].source, SourceRange::new(5, 10));
        assert_eq!(segments[0].generated, SourceRange::new(30, 40));
        assert_eq!(segments[1].source, SourceRange::new(20, 25));
        assert_eq!(segments[1].generated, SourceRange::new(60, 70));
    }

    #[test]
    fn test_record_segments_unaligned() {
        let record = MappingRecord {
            owner: "a.html".to_string(),
            source_spans: vec![(0, 3), (10, 3)],
            generated_spans: vec![(7, 3)],
        };
        let segments: Vec<_> = record.segments(SegmentFlags::all()).collect();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_record_serialization() {
        let record = MappingRecord::single("a.html", (5, 10), (30, 10));
        let json = serde_json::to_string(&record).unwrap();
        let back: MappingRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
