//! Run repository port - persisted run snapshots for post-run inspection.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{RunId, RunSnapshot, RunStatus};

/// Filter for listing runs.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub study_id: Option<String>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Insert or replace the snapshot for its run.
    async fn save(&self, snapshot: &RunSnapshot) -> DomainResult<()>;

    async fn get(&self, run_id: RunId) -> DomainResult<Option<RunSnapshot>>;

    /// Snapshots matching the filter, newest first.
    async fn list(&self, filter: RunFilter) -> DomainResult<Vec<RunSnapshot>>;

    async fn delete(&self, run_id: RunId) -> DomainResult<()>;
}
