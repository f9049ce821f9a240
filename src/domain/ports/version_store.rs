//! Version store port - persistence of immutable artifact versions.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Artifact, ArtifactKind, RunId, VersionMeta};

/// Persists each artifact revision under a gapless version per `(run, kind)`.
///
/// Implementations must reject an artifact whose version is not exactly the
/// next one for its `(run, kind)` with `DomainError::VersionConflict`, and must
/// keep no state shared between runs.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Store an artifact and return its version.
    async fn put(&self, artifact: &Artifact) -> DomainResult<u32>;

    /// Fetch the draft at `version`.
    async fn get(&self, run_id: RunId, version: u32) -> DomainResult<Artifact> {
        self.get_kind(run_id, ArtifactKind::Draft, version).await
    }

    /// Fetch any kind of artifact at `version`.
    async fn get_kind(&self, run_id: RunId, kind: ArtifactKind, version: u32) -> DomainResult<Artifact>;

    /// Latest artifact of a kind, if any was stored.
    async fn latest(&self, run_id: RunId, kind: ArtifactKind) -> DomainResult<Option<Artifact>>;

    /// Every stored version of a run, in insertion order.
    async fn list_versions(&self, run_id: RunId) -> DomainResult<Vec<VersionMeta>>;

    /// Version the next `put` for `(run, kind)` must carry.
    async fn next_version(&self, run_id: RunId, kind: ArtifactKind) -> DomainResult<u32> {
        Ok(self
            .latest(run_id, kind)
            .await?
            .map_or(0, |artifact| artifact.version + 1))
    }
}
