//! Live-document snapshots and the injected resolution capability.

use std::sync::Arc;

use calque_trace::DocId;

/// An immutable, versioned snapshot of one live document's content.
///
/// Snapshots are cheap to clone; the text is shared, never copied.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The document this snapshot was taken from
    pub doc: DocId,
    /// Name the document resolves under (path or URI)
    pub name: Arc<str>,
    /// Monotonic content version
    pub version: i32,
    /// Full content at the time of the snapshot
    pub text: Arc<str>,
}

impl Snapshot {
    /// Create a new snapshot.
    pub fn new(
        doc: DocId,
        name: impl Into<Arc<str>>,
        version: i32,
        text: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            doc,
            name: name.into(),
            version,
            text: text.into(),
        }
    }

    /// Content length in bytes.
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Resolution of a file name to the current live document.
///
/// Injected wherever the bridge needs to look at files other than the one it
/// is working on; there is deliberately no global registry. A name that no
/// longer resolves means the file was closed or deleted.
pub trait DocumentResolver {
    /// Resolve a name to a snapshot of the current live content.
    fn resolve(&self, name: &str) -> Option<Snapshot>;
}
