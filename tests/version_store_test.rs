//! VersionStore contract, run against both adapters.

use std::sync::Arc;

use medscribe::adapters::memory::InMemoryVersionStore;
use medscribe::adapters::sqlite::{create_migrated_test_pool, initialize_database, SqliteVersionStore};
use medscribe::domain::models::{Artifact, ArtifactKind, DatabaseConfig, RunId};
use medscribe::domain::ports::VersionStore;
use medscribe::domain::DomainError;
use proptest::prelude::*;

async fn sqlite_store() -> Arc<dyn VersionStore> {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    Arc::new(SqliteVersionStore::new(pool))
}

fn memory_store() -> Arc<dyn VersionStore> {
    Arc::new(InMemoryVersionStore::new())
}

/// Store `kinds` in order, each at the next version of its kind.
async fn put_sequence(store: &dyn VersionStore, run_id: RunId, kinds: &[ArtifactKind]) -> Vec<u32> {
    let mut versions = Vec::new();
    for (i, kind) in kinds.iter().enumerate() {
        let next = store.next_version(run_id, *kind).await.unwrap();
        let artifact = Artifact::at_version(run_id, *kind, next, format!("content {i}"), "test");
        versions.push(store.put(&artifact).await.unwrap());
    }
    versions
}

async fn assert_gapless(store: &dyn VersionStore, run_id: RunId) {
    let metas = store.list_versions(run_id).await.unwrap();
    for kind in ArtifactKind::ALL {
        let versions: Vec<u32> = metas.iter().filter(|m| m.kind == kind).map(|m| m.version).collect();
        let expected: Vec<u32> = (0..u32::try_from(versions.len()).unwrap()).collect();
        assert_eq!(versions, expected, "{kind} versions are not gapless");
    }
}

async fn check_contract(store: Arc<dyn VersionStore>) {
    let run_id = RunId::new();
    let other_run = RunId::new();

    let v0 = Artifact::initial(run_id, ArtifactKind::Draft, "first", "composer");
    assert_eq!(store.put(&v0).await.unwrap(), 0);

    // duplicate and gap are both conflicts
    assert!(matches!(
        store.put(&v0).await,
        Err(DomainError::VersionConflict { expected: 1, got: 0, .. })
    ));
    let gap = Artifact::at_version(run_id, ArtifactKind::Draft, 2, "skipped", "reviser");
    assert!(matches!(
        store.put(&gap).await,
        Err(DomainError::VersionConflict { expected: 1, got: 2, .. })
    ));

    let v1 = v0.revise("second", "reviser");
    assert_eq!(store.put(&v1).await.unwrap(), 1);

    // v0 is untouched by the revision
    assert_eq!(store.get(run_id, 0).await.unwrap().content, "first");
    assert_eq!(store.get(run_id, 1).await.unwrap().content, "second");
    assert_eq!(
        store.latest(run_id, ArtifactKind::Draft).await.unwrap().map(|a| a.version),
        Some(1)
    );

    // other kinds and other runs start at zero
    assert_eq!(store.next_version(run_id, ArtifactKind::Review).await.unwrap(), 0);
    assert_eq!(store.next_version(other_run, ArtifactKind::Draft).await.unwrap(), 0);
    assert!(store.latest(other_run, ArtifactKind::Draft).await.unwrap().is_none());
    assert!(matches!(
        store.get(other_run, 0).await,
        Err(DomainError::ArtifactNotFound { .. })
    ));

    let review = Artifact::initial(run_id, ArtifactKind::Review, "report", "reviewer");
    store.put(&review).await.unwrap();
    assert_eq!(
        store.get_kind(run_id, ArtifactKind::Review, 0).await.unwrap().content,
        "report"
    );

    let listed: Vec<(ArtifactKind, u32)> = store
        .list_versions(run_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.kind, m.version))
        .collect();
    assert_eq!(
        listed,
        vec![
            (ArtifactKind::Draft, 0),
            (ArtifactKind::Draft, 1),
            (ArtifactKind::Review, 0)
        ]
    );
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_contract(memory_store()).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    check_contract(sqlite_store().await).await;
}

#[tokio::test]
async fn test_sqlite_versions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("medscribe.db").display().to_string(),
        max_connections: 2,
    };
    let run_id = RunId::new();

    {
        let pool = initialize_database(&config).await.unwrap();
        let store = SqliteVersionStore::new(pool.clone());
        put_sequence(&store, run_id, &[ArtifactKind::Draft, ArtifactKind::Draft]).await;
        pool.close().await;
    }

    let pool = initialize_database(&config).await.unwrap();
    let store = SqliteVersionStore::new(pool);
    assert_eq!(store.next_version(run_id, ArtifactKind::Draft).await.unwrap(), 2);
    assert_eq!(store.get(run_id, 1).await.unwrap().content, "content 1");
}

fn kind_strategy() -> impl Strategy<Value = ArtifactKind> {
    prop_oneof![
        Just(ArtifactKind::Draft),
        Just(ArtifactKind::Review),
        Just(ArtifactKind::Compliance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: versions are gapless and strictly increasing from 0 per kind.
    #[test]
    fn prop_memory_versions_gapless(kinds in prop::collection::vec(kind_strategy(), 0..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = memory_store();
            let run_id = RunId::new();
            put_sequence(store.as_ref(), run_id, &kinds).await;
            assert_gapless(store.as_ref(), run_id).await;
        });
    }

    #[test]
    fn prop_sqlite_versions_gapless(kinds in prop::collection::vec(kind_strategy(), 0..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = sqlite_store().await;
            let run_id = RunId::new();
            put_sequence(store.as_ref(), run_id, &kinds).await;
            assert_gapless(store.as_ref(), run_id).await;
        });
    }

    /// Property: a put at any version other than the next one is rejected.
    #[test]
    fn prop_out_of_order_put_rejected(stored in 0u32..5, offset in 1u32..4) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = memory_store();
            let run_id = RunId::new();
            put_sequence(store.as_ref(), run_id, &vec![ArtifactKind::Draft; stored as usize]).await;

            let ahead = Artifact::at_version(run_id, ArtifactKind::Draft, stored + offset, "ahead", "test");
            let is_conflict = matches!(store.put(&ahead).await, Err(DomainError::VersionConflict { .. }));
            assert!(is_conflict);
            assert_eq!(store.next_version(run_id, ArtifactKind::Draft).await.unwrap(), stored);
        });
    }
}
