//! In-memory implementation of the VersionStore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactKind, RunId, VersionMeta};
use crate::domain::ports::VersionStore;

/// Artifacts per run, in insertion order.
#[derive(Default)]
pub struct InMemoryVersionStore {
    runs: RwLock<HashMap<RunId, Vec<Artifact>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_for(artifacts: &[Artifact], kind: ArtifactKind) -> u32 {
    artifacts
        .iter()
        .filter(|a| a.kind == kind)
        .map(|a| a.version + 1)
        .max()
        .unwrap_or(0)
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn put(&self, artifact: &Artifact) -> DomainResult<u32> {
        let mut runs = self.runs.write().await;
        let artifacts = runs.entry(artifact.run_id).or_default();

        let expected = next_for(artifacts, artifact.kind);
        if artifact.version != expected {
            return Err(DomainError::VersionConflict {
                run_id: artifact.run_id,
                kind: artifact.kind,
                expected,
                got: artifact.version,
            });
        }

        artifacts.push(artifact.clone());
        Ok(artifact.version)
    }

    async fn get_kind(&self, run_id: RunId, kind: ArtifactKind, version: u32) -> DomainResult<Artifact> {
        self.runs
            .read()
            .await
            .get(&run_id)
            .and_then(|artifacts| {
                artifacts
                    .iter()
                    .find(|a| a.kind == kind && a.version == version)
                    .cloned()
            })
            .ok_or(DomainError::ArtifactNotFound { run_id, kind, version })
    }

    async fn latest(&self, run_id: RunId, kind: ArtifactKind) -> DomainResult<Option<Artifact>> {
        Ok(self.runs.read().await.get(&run_id).and_then(|artifacts| {
            artifacts
                .iter()
                .filter(|a| a.kind == kind)
                .max_by_key(|a| a.version)
                .cloned()
        }))
    }

    async fn list_versions(&self, run_id: RunId) -> DomainResult<Vec<VersionMeta>> {
        Ok(self
            .runs
            .read()
            .await
            .get(&run_id)
            .map(|artifacts| artifacts.iter().map(Artifact::meta).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(run_id: RunId, version: u32) -> Artifact {
        Artifact::at_version(run_id, ArtifactKind::Draft, version, format!("draft {version}"), "composer")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryVersionStore::new();
        let run = RunId::new();

        assert_eq!(store.put(&draft(run, 0)).await.unwrap(), 0);
        assert_eq!(store.put(&draft(run, 1)).await.unwrap(), 1);

        assert_eq!(store.get(run, 1).await.unwrap().content, "draft 1");
        assert_eq!(store.latest(run, ArtifactKind::Draft).await.unwrap().unwrap().version, 1);
        assert_eq!(store.next_version(run, ArtifactKind::Draft).await.unwrap(), 2);
        assert!(store.latest(run, ArtifactKind::Review).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_gap_and_duplicate() {
        let store = InMemoryVersionStore::new();
        let run = RunId::new();

        let gap = store.put(&draft(run, 1)).await.unwrap_err();
        assert!(matches!(gap, DomainError::VersionConflict { expected: 0, got: 1, .. }));

        store.put(&draft(run, 0)).await.unwrap();
        let dup = store.put(&draft(run, 0)).await.unwrap_err();
        assert!(matches!(dup, DomainError::VersionConflict { expected: 1, got: 0, .. }));
    }

    #[tokio::test]
    async fn test_kinds_and_runs_are_independent() {
        let store = InMemoryVersionStore::new();
        let (a, b) = (RunId::new(), RunId::new());

        store.put(&draft(a, 0)).await.unwrap();
        store.put(&draft(b, 0)).await.unwrap();
        store
            .put(&Artifact::at_version(a, ArtifactKind::Review, 0, "review", "reviewer"))
            .await
            .unwrap();

        let versions = store.list_versions(a).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].kind, ArtifactKind::Draft);
        assert_eq!(versions[1].kind, ArtifactKind::Review);

        assert!(matches!(
            store.get(b, 1).await,
            Err(DomainError::ArtifactNotFound { version: 1, .. })
        ));
    }
}
