//! In-memory implementation of the RunRepository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RunId, RunSnapshot};
use crate::domain::ports::{RunFilter, RunRepository};

#[derive(Default)]
pub struct InMemoryRunRepository {
    snapshots: RwLock<HashMap<RunId, RunSnapshot>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Apply a filter and newest-first ordering to a set of snapshots.
pub(crate) fn apply_filter(mut snapshots: Vec<RunSnapshot>, filter: &RunFilter) -> Vec<RunSnapshot> {
    snapshots.retain(|s| {
        filter.status.map_or(true, |status| s.status == status)
            && filter.study_id.as_deref().map_or(true, |id| s.study_id() == id)
    });
    snapshots.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    if let Some(limit) = filter.limit {
        snapshots.truncate(limit);
    }
    snapshots
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn save(&self, snapshot: &RunSnapshot) -> DomainResult<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.run_id, snapshot.clone());
        Ok(())
    }

    async fn get(&self, run_id: RunId) -> DomainResult<Option<RunSnapshot>> {
        Ok(self.snapshots.read().await.get(&run_id).cloned())
    }

    async fn list(&self, filter: RunFilter) -> DomainResult<Vec<RunSnapshot>> {
        let all = self.snapshots.read().await.values().cloned().collect();
        Ok(apply_filter(all, &filter))
    }

    async fn delete(&self, run_id: RunId) -> DomainResult<()> {
        self.snapshots
            .write()
            .await
            .remove(&run_id)
            .map(|_| ())
            .ok_or(DomainError::RunNotFound(run_id))
    }
}
