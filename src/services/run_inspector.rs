//! Read-only access to finished runs.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactKind, RunId, RunSnapshot, VersionMeta};
use crate::domain::ports::{RunFilter, RunRepository, VersionStore};

use super::run_session::RunSession;

/// Looks up persisted runs and their artifact history.
#[derive(Clone)]
pub struct RunInspector {
    store: Arc<dyn VersionStore>,
    runs: Arc<dyn RunRepository>,
}

impl RunInspector {
    pub fn new(store: Arc<dyn VersionStore>, runs: Arc<dyn RunRepository>) -> Self {
        Self { store, runs }
    }

    pub async fn list(&self, filter: RunFilter) -> DomainResult<Vec<RunSnapshot>> {
        self.runs.list(filter).await
    }

    pub async fn snapshot(&self, run_id: RunId) -> DomainResult<RunSnapshot> {
        self.runs
            .get(run_id)
            .await?
            .ok_or(DomainError::RunNotFound(run_id))
    }

    /// Restore a sealed session for inspection.
    pub async fn session(&self, run_id: RunId) -> DomainResult<RunSession> {
        Ok(RunSession::restore(self.snapshot(run_id).await?))
    }

    pub async fn versions(&self, run_id: RunId) -> DomainResult<Vec<VersionMeta>> {
        self.store.list_versions(run_id).await
    }

    /// Fetch one artifact; `None` for the version means the latest.
    pub async fn artifact(&self, run_id: RunId, kind: ArtifactKind, version: Option<u32>) -> DomainResult<Artifact> {
        match version {
            Some(version) => self.store.get_kind(run_id, kind, version).await,
            None => self
                .store
                .latest(run_id, kind)
                .await?
                .ok_or(DomainError::ArtifactNotFound {
                    run_id,
                    kind,
                    version: 0,
                }),
        }
    }

    /// Resolve a full or prefix run id against the stored runs.
    pub async fn resolve(&self, id: &str) -> DomainResult<RunId> {
        if let Ok(run_id) = RunId::parse(id) {
            return Ok(run_id);
        }

        let needle = id.to_lowercase();
        let matches: Vec<RunId> = self
            .runs
            .list(RunFilter::default())
            .await?
            .into_iter()
            .map(|s| s.run_id)
            .filter(|run_id| run_id.to_string().starts_with(&needle))
            .collect();

        match matches.as_slice() {
            [single] => Ok(*single),
            [] => Err(DomainError::ValidationFailed(format!("no run matches '{id}'"))),
            _ => Err(DomainError::ValidationFailed(format!(
                "'{id}' is ambiguous ({} runs match)",
                matches.len()
            ))),
        }
    }
}
