//! Transpilation artifacts and the background transpiler contract.

use std::sync::Arc;

use async_trait::async_trait;
use calque_trace::MappingRecord;
use rustc_hash::FxHashMap;

use crate::document::Snapshot;

/// A dependency's content as it was when the artifact was produced.
#[derive(Debug, Clone)]
pub struct RecordedFile {
    /// Name the file resolved under at generation time
    pub name: Arc<str>,
    /// Content version at generation time
    pub version: i32,
    /// Full content at generation time
    pub text: Arc<str>,
}

impl RecordedFile {
    /// Record a snapshot.
    pub fn of(snapshot: &Snapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            version: snapshot.version,
            text: snapshot.text.clone(),
        }
    }
}

/// Identifier renames performed while emitting generated code, keyed by the
/// source offset the renamed identifier originates from. Used to rewrite
/// generated names back to their template spelling in diagnostic messages.
#[derive(Debug, Clone, Default)]
pub struct NameMapEntry {
    /// Offset in the primary source the renamed identifier comes from
    pub source_offset: u32,
    /// Generated name to source name
    pub names: FxHashMap<String, String>,
}

/// Everything one transpiler run produced, frozen.
///
/// An artifact is immutable once built; it is replaced wholesale by the next
/// rebuild and implicitly discarded the moment validation fails. Never patch
/// one in place.
#[derive(Debug, Clone)]
pub struct TranspiledArtifact {
    /// The generated type-check document
    pub generated: Arc<str>,
    /// The primary source as it was at generation time
    pub primary: RecordedFile,
    /// Every other file whose content the generated code depends on
    pub associated: Vec<RecordedFile>,
    /// Ordered raw mapping records
    pub records: Vec<MappingRecord>,
    /// Identifier renames, ordered by source offset
    pub name_maps: Vec<NameMapEntry>,
}

/// Error from a background transpiler run.
#[derive(Debug, thiserror::Error)]
pub enum TranspileError {
    /// The template could not be turned into generated code.
    #[error("template could not be transpiled: {0}")]
    Failed(String),

    /// A dependency was not readable when the run started.
    #[error("dependency `{name}` is not readable")]
    UnreadableDependency { name: String },
}

/// The background transpiler, consumed as a black box.
///
/// Runs out-of-band; callers install the result via `set_artifact` whenever
/// it lands and never block waiting for one.
#[async_trait]
pub trait Transpiler: Send + Sync {
    /// Produce generated code and mappings for the given primary snapshot.
    async fn generate(&self, primary: &Snapshot) -> Result<TranspiledArtifact, TranspileError>;
}
