//! Freshness check for cached transpilation artifacts.

use crate::artifact::TranspiledArtifact;
use crate::document::{DocumentResolver, Snapshot};

/// Decide whether `artifact` is still usable for `snapshot`.
///
/// An artifact is fresh iff the new primary snapshot matches the content the
/// artifact was generated from, and every associated file's recorded content
/// still equals that file's current live content. Anything else - including
/// an associated file that no longer resolves - is stale.
///
/// This is a pure comparison over already-held snapshots; it never triggers
/// a rebuild.
pub fn is_stale(
    artifact: &TranspiledArtifact,
    snapshot: &Snapshot,
    resolver: &dyn DocumentResolver,
) -> bool {
    // Version fast-path, then content.
    let primary = &artifact.primary;
    if snapshot.version != primary.version && snapshot.text != primary.text {
        tracing::debug!(name = %snapshot.name, "artifact stale: primary content changed");
        return true;
    }

    for recorded in &artifact.associated {
        match resolver.resolve(&recorded.name) {
            Some(live) if live.text == recorded.text => {}
            Some(_) => {
                tracing::debug!(name = %recorded.name, "artifact stale: associated file changed");
                return true;
            }
            None => {
                tracing::debug!(name = %recorded.name, "artifact stale: associated file unresolvable");
                return true;
            }
        }
    }
    false
}
