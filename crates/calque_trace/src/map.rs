//! Per-file segment buckets and bidirectional offset translation.

use rustc_hash::FxHashMap;

use crate::range::{DocId, SourceRange};
use crate::segment::{MappingRecord, Segment, SegmentFlags};

/// All segments owned by a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMappings {
    /// The owning document
    pub doc: DocId,
    /// Name the owning document was resolved from
    pub name: String,
    /// Segments in record order
    pub segments: Vec<Segment>,
}

impl FileMappings {
    fn new(doc: DocId, name: impl Into<String>) -> Self {
        Self {
            doc,
            name: name.into(),
            segments: Vec::new(),
        }
    }
}

/// The complete mapping between a set of source files and one generated
/// document, partitioned into disjoint per-file buckets.
///
/// The primary bucket belongs to the file the generated document was derived
/// from; associated buckets belong to other files contributing ranges (for
/// example an imported component referenced from the template).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspiledMap {
    /// Mappings owned by the primary source file
    pub primary: FileMappings,
    /// Mappings owned by associated files, one bucket per resolved file
    pub associated: Vec<FileMappings>,
}

/// A source range with the verification capability mapped to more than one
/// generated range.
#[derive(Debug, thiserror::Error)]
#[error("source range {range:?} in {file} maps to {} generated ranges", .targets.len())]
pub struct MappingConflict {
    /// Name of the owning file
    pub file: String,
    /// The duplicated source range
    pub range: SourceRange,
    /// Every generated range it maps to
    pub targets: Vec<SourceRange>,
}

impl TranspiledMap {
    /// Build buckets from raw transpiler records.
    ///
    /// Records owned by `primary_name` land in the primary bucket with every
    /// capability enabled. Any other owner is resolved through `resolve`;
    /// segments of resolvable owners keep all capabilities except `FORMAT`
    /// (an associated file must never drive reformatting of a different
    /// physical buffer), and records of unresolvable owners are dropped.
    pub fn build(
        primary: DocId,
        primary_name: &str,
        records: &[MappingRecord],
        mut resolve: impl FnMut(&str) -> Option<DocId>,
    ) -> Self {
        let mut map = Self {
            primary: FileMappings::new(primary, primary_name),
            associated: Vec::new(),
        };
        let mut by_name: FxHashMap<String, usize> = FxHashMap::default();

        for record in records {
            if record.owner == primary_name {
                map.primary
                    .segments
                    .extend(record.segments(SegmentFlags::all()));
                continue;
            }
            let index = match by_name.get(&record.owner) {
                Some(&index) => Some(index),
                None => match resolve(&record.owner) {
                    Some(doc) => {
                        let index = map.associated.len();
                        map.associated.push(FileMappings::new(doc, &*record.owner));
                        by_name.insert(record.owner.clone(), index);
                        Some(index)
                    }
                    None => {
                        tracing::debug!(
                            owner = %record.owner,
                            "dropping mapping record for unresolvable file"
                        );
                        None
                    }
                },
            };
            if let Some(index) = index {
                map.associated[index]
                    .segments
                    .extend(record.segments(SegmentFlags::all() - SegmentFlags::FORMAT));
            }
        }
        map
    }

    /// Build the identity mapping used when no transpilation artifact is
    /// available: one full-span segment with every capability enabled.
    pub fn identity(primary: DocId, primary_name: &str, len: u32) -> Self {
        let mut bucket = FileMappings::new(primary, primary_name);
        bucket.segments.push(Segment::new(
            SourceRange::new(0, len),
            SourceRange::new(0, len),
        ));
        Self {
            primary: bucket,
            associated: Vec::new(),
        }
    }

    /// Iterate every bucket, primary first.
    pub fn files(&self) -> impl Iterator<Item = &FileMappings> {
        std::iter::once(&self.primary).chain(self.associated.iter())
    }

    fn bucket(&self, doc: DocId) -> Option<&FileMappings> {
        self.files().find(|bucket| bucket.doc == doc)
    }

    /// Map a source offset in `doc` into the generated document.
    ///
    /// Scans that file's bucket for the first segment containing the offset;
    /// returns `None` when no segment covers it (plain text outside any
    /// binding) or when the covering segment cannot express the offset.
    pub fn to_generated(&self, doc: DocId, offset: u32) -> Option<u32> {
        self.bucket(doc)?
            .segments
            .iter()
            .find(|segment| segment.source.contains(offset))
            .and_then(|segment| segment.source_to_generated(offset))
    }

    /// Map a whole source range into the generated document.
    ///
    /// Both ends must be expressible; the end offset is mapped through the
    /// last contained position so a range never straddles a segment edge.
    pub fn to_generated_range(&self, doc: DocId, range: SourceRange) -> Option<SourceRange> {
        if range.is_empty() {
            return None;
        }
        let start = self.to_generated(doc, range.start)?;
        let end = self.to_generated(doc, range.end - 1)? + 1;
        Some(SourceRange::new(start, end))
    }

    /// Map a generated offset back to its owning file and source offset.
    pub fn to_source(&self, generated_offset: u32) -> Option<(DocId, u32)> {
        for bucket in self.files() {
            for segment in &bucket.segments {
                if segment.generated.contains(generated_offset) {
                    return segment
                        .generated_to_source(generated_offset)
                        .map(|offset| (bucket.doc, offset));
                }
            }
        }
        None
    }

    /// Reject duplicated verification mappings: a source range with the
    /// verification capability must map to exactly one generated range,
    /// otherwise the host engine would report the same problem twice.
    pub fn verify(&self) -> Result<(), MappingConflict> {
        for bucket in self.files() {
            let mut seen: FxHashMap<(u32, u32), Vec<SourceRange>> = FxHashMap::default();
            for segment in &bucket.segments {
                if segment.flags.contains(SegmentFlags::VERIFICATION) {
                    seen.entry((segment.source.start, segment.source.end))
                        .or_default()
                        .push(segment.generated);
                }
            }
            for ((start, end), mut targets) in seen {
                targets.dedup();
                if targets.len() > 1 {
                    return Err(MappingConflict {
                        file: bucket.name.clone(),
                        range: SourceRange::new(start, end),
                        targets,
                    });
                }
            }
        }
        Ok(())
    }
}
