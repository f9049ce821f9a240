//! SQLite implementation of the VersionStore.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactKind, RunId, VersionMeta};
use crate::domain::ports::VersionStore;

#[derive(Clone)]
pub struct SqliteVersionStore {
    pool: SqlitePool,
}

impl SqliteVersionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ArtifactRow {
    run_id: String,
    kind: String,
    version: i64,
    content: String,
    produced_by: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    run_id: String,
    kind: String,
    version: i64,
    produced_by: String,
    created_at: String,
}

fn parse_kind(s: &str) -> DomainResult<ArtifactKind> {
    ArtifactKind::from_str(s)
        .ok_or_else(|| DomainError::SerializationError(format!("Invalid artifact kind: {s}")))
}

fn parse_version(v: i64) -> DomainResult<u32> {
    u32::try_from(v).map_err(|_| DomainError::SerializationError(format!("Invalid version: {v}")))
}

impl TryFrom<ArtifactRow> for Artifact {
    type Error = DomainError;

    fn try_from(row: ArtifactRow) -> Result<Self, Self::Error> {
        Ok(Artifact {
            run_id: RunId(parse_uuid(&row.run_id)?),
            kind: parse_kind(&row.kind)?,
            version: parse_version(row.version)?,
            content: row.content,
            produced_by: row.produced_by,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

impl TryFrom<VersionRow> for VersionMeta {
    type Error = DomainError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        Ok(VersionMeta {
            run_id: RunId(parse_uuid(&row.run_id)?),
            kind: parse_kind(&row.kind)?,
            version: parse_version(row.version)?,
            produced_by: row.produced_by,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[async_trait]
impl VersionStore for SqliteVersionStore {
    async fn put(&self, artifact: &Artifact) -> DomainResult<u32> {
        let mut tx = self.pool.begin().await?;

        let (expected,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version) + 1, 0) FROM artifacts WHERE run_id = ? AND kind = ?",
        )
        .bind(artifact.run_id.to_string())
        .bind(artifact.kind.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let expected = parse_version(expected)?;
        if artifact.version != expected {
            return Err(DomainError::VersionConflict {
                run_id: artifact.run_id,
                kind: artifact.kind,
                expected,
                got: artifact.version,
            });
        }

        sqlx::query(
            r#"INSERT INTO artifacts (run_id, kind, version, content, produced_by, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(artifact.run_id.to_string())
        .bind(artifact.kind.as_str())
        .bind(i64::from(artifact.version))
        .bind(&artifact.content)
        .bind(&artifact.produced_by)
        .bind(artifact.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(artifact.version)
    }

    async fn get_kind(&self, run_id: RunId, kind: ArtifactKind, version: u32) -> DomainResult<Artifact> {
        let row: Option<ArtifactRow> = sqlx::query_as(
            "SELECT run_id, kind, version, content, produced_by, created_at FROM artifacts WHERE run_id = ? AND kind = ? AND version = ?",
        )
        .bind(run_id.to_string())
        .bind(kind.as_str())
        .bind(i64::from(version))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DomainError::ArtifactNotFound { run_id, kind, version })?
            .try_into()
    }

    async fn latest(&self, run_id: RunId, kind: ArtifactKind) -> DomainResult<Option<Artifact>> {
        let row: Option<ArtifactRow> = sqlx::query_as(
            "SELECT run_id, kind, version, content, produced_by, created_at FROM artifacts WHERE run_id = ? AND kind = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(run_id.to_string())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_versions(&self, run_id: RunId) -> DomainResult<Vec<VersionMeta>> {
        let rows: Vec<VersionRow> = sqlx::query_as(
            "SELECT run_id, kind, version, produced_by, created_at FROM artifacts WHERE run_id = ? ORDER BY seq",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteVersionStore {
        SqliteVersionStore::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_put_get_latest() {
        let store = setup().await;
        let run = RunId::new();
        let v0 = Artifact::initial(run, ArtifactKind::Draft, "# CSR v0", "composer");

        store.put(&v0).await.unwrap();
        store.put(&v0.revise("# CSR v1", "reviser")).await.unwrap();

        let fetched = store.get(run, 0).await.unwrap();
        assert_eq!(fetched.content, "# CSR v0");
        assert_eq!(fetched.created_at.timestamp(), v0.created_at.timestamp());

        let latest = store.latest(run, ArtifactKind::Draft).await.unwrap().unwrap();
        assert_eq!(latest.version, 1);
        assert_eq!(latest.produced_by, "reviser");
    }

    #[tokio::test]
    async fn test_version_conflict() {
        let store = setup().await;
        let run = RunId::new();

        let err = store
            .put(&Artifact::at_version(run, ArtifactKind::Review, 2, "r", "reviewer"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::VersionConflict { expected: 0, got: 2, .. }));
        assert!(store.list_versions(run).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let store = setup().await;
        let err = store
            .get_kind(RunId::new(), ArtifactKind::Compliance, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ArtifactNotFound { .. }));
    }
}
