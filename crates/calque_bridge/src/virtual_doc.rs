//! Per-file virtual documents and the generated views they expose.

use std::sync::Arc;

use calque_trace::{DocId, TranspiledMap};
use dashmap::DashMap;

use crate::artifact::{TranspileError, TranspiledArtifact, Transpiler};
use crate::document::{DocumentResolver, Snapshot};
use crate::validate::is_stale;

/// One consistent reading of a source file's generated document.
///
/// A view is an immutable value: every `update()` produces a fresh one and
/// concurrent readers see either the old or the new view, never a partial
/// one. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct GeneratedView {
    /// The generated document's content
    pub generated: Arc<str>,
    /// Bidirectional offset mapping for this view
    pub map: Arc<TranspiledMap>,
    /// The artifact this view was built from; `None` for the fallback view
    pub artifact: Option<Arc<TranspiledArtifact>>,
}

impl GeneratedView {
    /// Whether this is the identity fallback rather than transpiler output.
    pub fn is_fallback(&self) -> bool {
        self.artifact.is_none()
    }
}

/// Owns one source file's current generated view.
///
/// Holds the latest transpilation artifact (if any) and the last snapshot it
/// was asked about. Freshness is re-evaluated from scratch on every
/// `update()`; there is no incremental patching and no explicit "stale"
/// state to get out of sync.
#[derive(Debug)]
pub struct VirtualDocument {
    doc: DocId,
    name: Arc<str>,
    artifact: Option<Arc<TranspiledArtifact>>,
    last_snapshot: Option<Snapshot>,
}

impl VirtualDocument {
    /// Create a controller for one source file.
    pub fn new(doc: DocId, name: impl Into<Arc<str>>) -> Self {
        Self {
            doc,
            name: name.into(),
            artifact: None,
            last_snapshot: None,
        }
    }

    /// The owning document.
    pub fn doc(&self) -> DocId {
        self.doc
    }

    /// The last snapshot passed to `update`.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Produce the current view for `snapshot`.
    ///
    /// Reuses the cached artifact when it is still fresh, rebuilding the
    /// segment buckets from its raw records; otherwise falls back to the
    /// identity view over the raw snapshot so language features keep working
    /// on the untransformed source while a rebuild is pending.
    pub fn update(&mut self, snapshot: &Snapshot, resolver: &dyn DocumentResolver) -> GeneratedView {
        self.last_snapshot = Some(snapshot.clone());

        match &self.artifact {
            Some(artifact) if !is_stale(artifact, snapshot, resolver) => {
                let map = TranspiledMap::build(self.doc, &self.name, &artifact.records, |name| {
                    resolver.resolve(name).map(|live| live.doc)
                });
                GeneratedView {
                    generated: artifact.generated.clone(),
                    map: Arc::new(map),
                    artifact: Some(artifact.clone()),
                }
            }
            _ => Self::fallback(snapshot),
        }
    }

    /// Install or clear the cached artifact.
    ///
    /// Called whenever a background rebuild completes; `None` forces the
    /// fallback view on the next `update`.
    pub fn set_artifact(&mut self, artifact: Option<Arc<TranspiledArtifact>>) {
        self.artifact = artifact;
    }

    fn fallback(snapshot: &Snapshot) -> GeneratedView {
        GeneratedView {
            generated: snapshot.text.clone(),
            map: Arc::new(TranspiledMap::identity(
                snapshot.doc,
                &snapshot.name,
                snapshot.len(),
            )),
            artifact: None,
        }
    }
}

/// Registry of virtual documents, one per open source file.
///
/// Controllers are created on first use and removed when their file closes;
/// the map entry serializes writers per file.
#[derive(Debug, Default)]
pub struct VirtualDocumentStore {
    docs: DashMap<DocId, VirtualDocument>,
}

impl VirtualDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the controller for a closed file.
    pub fn close(&self, doc: DocId) {
        self.docs.remove(&doc);
    }

    /// Check if a controller exists.
    pub fn contains(&self, doc: DocId) -> bool {
        self.docs.contains_key(&doc)
    }

    /// Number of live controllers.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Update the file's controller with a new snapshot, creating it on
    /// first use.
    pub fn update(&self, snapshot: &Snapshot, resolver: &dyn DocumentResolver) -> GeneratedView {
        self.docs
            .entry(snapshot.doc)
            .or_insert_with(|| VirtualDocument::new(snapshot.doc, snapshot.name.clone()))
            .update(snapshot, resolver)
    }

    /// Install or clear an artifact for a file. A no-op for files without a
    /// live controller.
    pub fn set_artifact(&self, doc: DocId, artifact: Option<Arc<TranspiledArtifact>>) {
        if let Some(mut entry) = self.docs.get_mut(&doc) {
            entry.set_artifact(artifact);
        } else {
            tracing::debug!(?doc, "ignoring artifact for closed document");
        }
    }

    /// Drive one transpiler run for `snapshot` and install the result.
    ///
    /// The transpiler runs out-of-band; nothing here blocks readers, who see
    /// the new artifact on their next `update`.
    pub async fn rebuild(
        &self,
        snapshot: &Snapshot,
        transpiler: &dyn Transpiler,
    ) -> Result<(), TranspileError> {
        let artifact = transpiler.generate(snapshot).await?;
        self.set_artifact(snapshot.doc, Some(Arc::new(artifact)));
        Ok(())
    }
}
