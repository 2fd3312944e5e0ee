//! # calque_bridge
//!
//! Bridge - incremental virtual documents and diagnostic relocation for
//! template type checking.
//!
//! A type-aware language engine only understands the *generated* document a
//! background transpiler derives from a template and its bindings. This
//! crate keeps one virtual document per open template, decides on every
//! request whether the cached transpiler output is still trustworthy, and
//! moves positions, diagnostics, and type answers between the two worlds.
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                          calque_bridge                           |
//! +------------------------------------------------------------------+
//! |                                                                  |
//! |  edit --> VirtualDocumentStore::update(snapshot)                 |
//! |               |                                                  |
//! |               v                                                  |
//! |  validate::is_stale?  --yes-->  fallback (identity) view         |
//! |               |                                                  |
//! |              no                                                  |
//! |               v                                                  |
//! |  TranspiledMap::build over the artifact's records                |
//! |               |                                                  |
//! |               v                                                  |
//! |  GeneratedView ---> QueryBridge (translate/delegate/translate)   |
//! |               \--> DiagnosticService (collect + relocate)        |
//! |                                                                  |
//! +------------------------------------------------------------------+
//! ```
//!
//! The transpiler and the host language engine are consumed as black boxes
//! behind the [`Transpiler`] and [`HostLanguageService`] traits; rebuilds
//! run out-of-band and readers never wait for one. Nothing here persists:
//! every view is recomputed from snapshots.

pub mod artifact;
pub mod diagnostics;
pub mod document;
pub mod service;
pub mod validate;
pub mod virtual_doc;

pub use artifact::{NameMapEntry, RecordedFile, TranspileError, TranspiledArtifact, Transpiler};
pub use diagnostics::{
    DiagnosticKind, DiagnosticKinds, DiagnosticRecord, DiagnosticService, GeneratedDiagnostic,
    HostFile, InjectionMapper, ProblemReport, QuickFix, Relocation, Severity, SyntaxAccess,
    SyntaxElement,
};
pub use document::{DocumentResolver, Snapshot};
pub use service::{
    HostAnswer, HostLanguageService, HostProperty, HostQuery, HostType, QueryBridge, ResolvedType,
    ServiceError,
};
pub use validate::is_stale;
pub use virtual_doc::{GeneratedView, VirtualDocument, VirtualDocumentStore};

// Re-export the mapping core types callers hold on to.
pub use calque_trace::{DocId, MappingRecord, SegmentFlags, SourceRange, TranspiledMap};

#[cfg(test)]
pub(crate) mod testing {
    use rustc_hash::FxHashMap;

    use crate::document::{DocumentResolver, Snapshot};

    /// Resolver over a fixed set of snapshots, keyed by name.
    #[derive(Default)]
    pub(crate) struct StaticResolver {
        files: FxHashMap<String, Snapshot>,
    }

    impl StaticResolver {
        pub(crate) fn new(files: impl IntoIterator<Item = Snapshot>) -> Self {
            Self {
                files: files
                    .into_iter()
                    .map(|snapshot| (snapshot.name.to_string(), snapshot))
                    .collect(),
            }
        }
    }

    impl DocumentResolver for StaticResolver {
        fn resolve(&self, name: &str) -> Option<Snapshot> {
            self.files.get(name).cloned()
        }
    }
}
