//! Import pipeline integration tests
//!
//! Exercise the full classify → conflict → write path against a real
//! database: hierarchy creation, idempotence, the conflict policy matrix,
//! polygon non-clobber, and transactional rollback.

mod helpers;

use helpers::*;
use lotmap_admin::importer::writer::ImportError;
use lotmap_admin::importer::{ConflictDecisions, ConflictPolicy};
use serde_json::json;
use sqlx::SqlitePool;

async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

async fn polygon_text(pool: &SqlitePool, sql: &str) -> Option<String> {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

#[tokio::test]
async fn full_hierarchy_import_orders_parents_before_children() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    let category_id = seed_category(&pool, project_id, "Standard").await;

    // Deliberately scrambled: the lot and block appear before their parents
    let features = vec![
        feature(json!({"MZ 001": "7"})),
        feature(json!({"UV 001": "MZ 001"})),
        feature(json!({"UV 001": "residential"})),
    ];

    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::SkipAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.neighborhoods.created, 1);
    assert_eq!(summary.blocks.created, 1);
    assert_eq!(summary.lots.created, 1);
    assert!(summary.errors.is_empty());

    let mut conn = pool.acquire().await.unwrap();
    let neighborhood =
        lotmap_admin::db::neighborhoods::find_by_name(&mut conn, project_id, "UV 001")
            .await
            .unwrap()
            .expect("neighborhood persisted");
    assert!(neighborhood.polygon.is_some());

    let block =
        lotmap_admin::db::blocks::find_by_name(&mut conn, neighborhood.id, "MZ 001")
            .await
            .unwrap()
            .expect("block persisted");

    let (lot_id, has_polygon) =
        lotmap_admin::db::lots::find_summary_by_number(&mut conn, block.id, "007")
            .await
            .unwrap()
            .expect("lot persisted");
    assert!(has_polygon);

    let lot = lotmap_admin::db::lots::find_by_id(&mut conn, lot_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lot.location, "UV 001 MZ 001 LT 007");
    assert_eq!(lot.category_id, category_id);
    assert_eq!(lot.status, 0);
    assert!(lot.active);
    assert_eq!(lot.sale_price, 0.0);
}

#[tokio::test]
async fn project_feature_fills_only_null_polygon() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let features = vec![feature(json!({"PROYECTO": "Villa Sol"}))];

    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.project.updated, 1);

    let stored =
        polygon_text(&pool, "SELECT polygon FROM projects WHERE name = 'Villa Sol'").await;
    let first = stored.expect("project polygon set");

    // A second import with different geometry must not touch it
    let second_features = vec![geojson::Feature {
        geometry: Some(square(-60.0, -20.0)),
        ..feature(json!({"PROYECTO": "Villa Sol"}))
    }];

    let summary = run_import_tx(
        &pool,
        &second_features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.project.updated, 1);
    let after = polygon_text(&pool, "SELECT polygon FROM projects WHERE name = 'Villa Sol'")
        .await
        .unwrap();
    assert_eq!(after, first, "polygon must be unchanged bit-for-bit");
}

#[tokio::test]
async fn reimport_is_idempotent() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let features = vec![
        feature(json!({"UV 001": "x"})),
        feature(json!({"UV 001": "MZ 001"})),
        feature(json!({"MZ 001": "1"})),
    ];

    let first = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.neighborhoods.created, 1);

    let second = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(second.neighborhoods.created, 0);
    assert_eq!(second.neighborhoods.updated, 1);
    assert_eq!(second.blocks.updated, 1);
    assert_eq!(second.lots.updated, 1);

    // Scoped uniqueness: no duplicates appeared
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM neighborhoods").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM blocks").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM lots").await, 1);
}

#[tokio::test]
async fn existing_polygon_survives_overwrite_all() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let features = vec![feature(json!({"UV 001": "x"}))];
    run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    let first = polygon_text(&pool, "SELECT polygon FROM neighborhoods WHERE name = 'UV 001'")
        .await
        .expect("polygon stored");

    let different = vec![geojson::Feature {
        geometry: Some(square(-1.0, 1.0)),
        ..feature(json!({"UV 001": "x"}))
    }];

    let summary = run_import_tx(
        &pool,
        &different,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.neighborhoods.updated, 1);
    let after = polygon_text(&pool, "SELECT polygon FROM neighborhoods WHERE name = 'UV 001'")
        .await
        .unwrap();
    assert_eq!(after, first);
}

#[tokio::test]
async fn conflict_policy_matrix_for_neighborhood() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    // Persist the conflicting neighborhood without a polygon
    {
        let mut conn = pool.acquire().await.unwrap();
        lotmap_admin::db::neighborhoods::create(&mut conn, project_id, "UV 001", None)
            .await
            .unwrap();
    }

    let features = vec![feature(json!({"UV 001": "x"}))];
    let no_decisions = ConflictDecisions::new();

    // skip_all: not processed
    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::SkipAll,
        &no_decisions,
    )
    .await
    .unwrap();
    assert_eq!(summary.neighborhoods.skipped, 1);
    assert_eq!(summary.neighborhoods.updated, 0);
    assert!(
        polygon_text(&pool, "SELECT polygon FROM neighborhoods WHERE name = 'UV 001'")
            .await
            .is_none()
    );

    // ask with no decision entry: skipped
    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::Ask,
        &no_decisions,
    )
    .await
    .unwrap();
    assert_eq!(summary.neighborhoods.skipped, 1);

    // ask with an overwrite decision for this index: processed
    let mut decisions = ConflictDecisions::new();
    decisions.insert(0, "overwrite".to_string());
    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::Ask,
        &decisions,
    )
    .await
    .unwrap();
    assert_eq!(summary.neighborhoods.updated, 1);
    assert!(
        polygon_text(&pool, "SELECT polygon FROM neighborhoods WHERE name = 'UV 001'")
            .await
            .is_some()
    );

    // overwrite_all: processed (no-op here since the polygon is now set)
    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &no_decisions,
    )
    .await
    .unwrap();
    assert_eq!(summary.neighborhoods.updated, 1);
    assert_eq!(summary.neighborhoods.skipped, 0);
}

#[tokio::test]
async fn unresolved_block_parent_aborts_whole_import() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    // Valid neighborhood plus a lot referencing a block that does not exist
    // and cannot be created (no block feature, no neighborhood for it)
    let features = vec![
        feature(json!({"UV 001": "x"})),
        feature(json!({"MZ 099": "5"})),
    ];

    let err = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap_err();

    match err {
        ImportError::UnresolvedBlock { reference, lot } => {
            assert_eq!(reference, "MZ 099");
            assert_eq!(lot, "005");
        }
        other => panic!("expected UnresolvedBlock, got {other:?}"),
    }

    // Full rollback: the neighborhood from feature 0 must not persist
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM neighborhoods").await, 0);
}

#[tokio::test]
async fn missing_default_category_aborts() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;

    let features = vec![feature(json!({"UV 001": "x"}))];
    let err = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ImportError::NoCategory(id) if id == project_id));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM neighborhoods").await, 0);
}

#[tokio::test]
async fn unknown_project_feature_aborts() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let features = vec![feature(json!({"PROYECTO": "Atlantis"}))];
    let err = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ImportError::ProjectNotFound(name) if name == "ATLANTIS"));
}

#[tokio::test]
async fn project_name_lookup_is_case_insensitive() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    // Normalization uppercases the value; the stored name is mixed case
    let features = vec![feature(json!({"PROYECTO": "Villa Sol"}))];
    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.project.updated, 1);
    assert!(
        polygon_text(&pool, "SELECT polygon FROM projects WHERE name = 'Villa Sol'")
            .await
            .is_some()
    );
}

#[tokio::test]
async fn unrecognized_feature_is_recorded_not_fatal() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let features = vec![
        feature(json!({"foo": "bar"})),
        feature(json!({"UV 001": "x"})),
    ];

    let summary = run_import_tx(
        &pool,
        &features,
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    // The unclassifiable feature does not block the rest
    assert_eq!(summary.neighborhoods.created, 1);
}

#[tokio::test]
async fn feature_without_geometry_is_recorded_and_skipped() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let mut bad = feature(json!({"UV 001": "x"}));
    bad.geometry = None;

    let summary = run_import_tx(
        &pool,
        &[bad],
        &mapping(project_id),
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.neighborhoods.created, 0);
    assert_eq!(summary.neighborhoods.skipped, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("no geometry"));
}

#[tokio::test]
async fn manual_block_map_overrides_name_lookup() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let block_id = {
        let mut conn = pool.acquire().await.unwrap();
        let nid = lotmap_admin::db::neighborhoods::create(&mut conn, project_id, "UV 001", None)
            .await
            .unwrap();
        lotmap_admin::db::blocks::create(&mut conn, nid, "MZ 001", None)
            .await
            .unwrap()
    };

    // The feature references "MZ 050", which is mapped manually onto the
    // existing block; spellings are normalized before comparison
    let mut import_mapping = mapping(project_id);
    import_mapping.block_map.insert("mz50".to_string(), block_id);

    let features = vec![feature(json!({"MZ 050": "3"}))];
    let summary = run_import_tx(
        &pool,
        &features,
        &import_mapping,
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.lots.created, 1);

    let mut conn = pool.acquire().await.unwrap();
    let lot = lotmap_admin::db::lots::find_summary_by_number(&mut conn, block_id, "003")
        .await
        .unwrap();
    assert!(lot.is_some());
}

#[tokio::test]
async fn explicit_neighborhood_id_used_for_legacy_blocks() {
    let (_tmp, pool) = create_test_db().await;
    let project_id = seed_project(&pool, "Villa Sol").await;
    seed_category(&pool, project_id, "Standard").await;

    let neighborhood_id = {
        let mut conn = pool.acquire().await.unwrap();
        lotmap_admin::db::neighborhoods::create(&mut conn, project_id, "UV 009", None)
            .await
            .unwrap()
    };

    // Legacy block feature carries no neighborhood reference at all
    let mut import_mapping = mapping(project_id);
    import_mapping.neighborhood_id = Some(neighborhood_id);

    let features = vec![feature(json!({"CUADRA": "MZ 002"}))];
    let summary = run_import_tx(
        &pool,
        &features,
        &import_mapping,
        ConflictPolicy::OverwriteAll,
        &ConflictDecisions::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.blocks.created, 1);

    let mut conn = pool.acquire().await.unwrap();
    let block = lotmap_admin::db::blocks::find_by_name(&mut conn, neighborhood_id, "MZ 002")
        .await
        .unwrap();
    assert!(block.is_some());
}
