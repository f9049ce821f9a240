//! SQLite implementation of the RunRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RunId, RunSnapshot};
use crate::domain::ports::{RunFilter, RunRepository};

#[derive(Clone)]
pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    snapshot: String,
}

impl TryFrom<SnapshotRow> for RunSnapshot {
    type Error = DomainError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        serde_json::from_str(&row.snapshot).map_err(|e| DomainError::SerializationError(e.to_string()))
    }
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn save(&self, snapshot: &RunSnapshot) -> DomainResult<()> {
        let snapshot_json = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"INSERT INTO run_sessions (run_id, study_id, status, snapshot, started_at, finished_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(run_id) DO UPDATE SET
                   study_id = excluded.study_id,
                   status = excluded.status,
                   snapshot = excluded.snapshot,
                   finished_at = excluded.finished_at"#,
        )
        .bind(snapshot.run_id.to_string())
        .bind(snapshot.study_id())
        .bind(snapshot.status.as_str())
        .bind(&snapshot_json)
        .bind(snapshot.started_at.to_rfc3339())
        .bind(snapshot.finished_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, run_id: RunId) -> DomainResult<Option<RunSnapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as("SELECT snapshot FROM run_sessions WHERE run_id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: RunFilter) -> DomainResult<Vec<RunSnapshot>> {
        let mut query = String::from("SELECT snapshot FROM run_sessions WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }

        if let Some(study_id) = &filter.study_id {
            query.push_str(" AND study_id = ?");
            bindings.push(study_id.clone());
        }

        query.push_str(" ORDER BY started_at DESC");

        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, SnapshotRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<SnapshotRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete(&self, run_id: RunId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM run_sessions WHERE run_id = ?")
            .bind(run_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::RunNotFound(run_id));
        }

        Ok(())
    }
}
