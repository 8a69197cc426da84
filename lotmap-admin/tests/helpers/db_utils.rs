//! Database and fixture helpers shared by the integration suites

use lotmap_admin::db::categories::CategoryInput;
use lotmap_admin::db::projects::ProjectInput;
use lotmap_admin::importer::writer::{run_import, ImportError};
use lotmap_admin::importer::{ConflictDecisions, ConflictPolicy, ImportMapping, ImportSummary};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary test database with the full schema applied
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let db_path = temp_dir.path().join("test_lotmap.db");
    let pool = lotmap_common::db::init_database(&db_path)
        .await
        .expect("initialize test database");
    (temp_dir, pool)
}

/// Insert a project and return its id
pub async fn seed_project(pool: &SqlitePool, name: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    lotmap_admin::db::projects::create(
        &mut conn,
        &ProjectInput {
            name: name.to_string(),
            description: None,
            location: None,
            launch_date: None,
            lot_count: None,
            photo_path: None,
            active: true,
        },
    )
    .await
    .expect("seed project")
}

/// Insert a category and return its id
pub async fn seed_category(pool: &SqlitePool, project_id: i64, name: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    lotmap_admin::db::categories::create(
        &mut conn,
        &CategoryInput {
            project_id,
            name: name.to_string(),
            description: None,
            color: None,
            active: true,
        },
    )
    .await
    .expect("seed category")
}

/// Minimal import mapping targeting one project
pub fn mapping(project_id: i64) -> ImportMapping {
    ImportMapping {
        project_id,
        neighborhood_id: None,
        block_id: None,
        block_map: Default::default(),
    }
}

/// A small closed square starting at the given GeoJSON `[lng, lat]` corner
pub fn square(lng: f64, lat: f64) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
        vec![lng, lat],
        vec![lng + 0.01, lat],
        vec![lng + 0.01, lat + 0.01],
        vec![lng, lat + 0.01],
        vec![lng, lat],
    ]]))
}

/// Build a feature with the given properties and a default geometry
pub fn feature(props: serde_json::Value) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(square(-63.18, -17.78)),
        id: None,
        properties: props.as_object().cloned(),
        foreign_members: None,
    }
}

/// Feature as raw JSON, for request payloads
pub fn feature_json(props: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "type": "Feature",
        "properties": props,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [-63.18, -17.78],
                [-63.17, -17.78],
                [-63.17, -17.77],
                [-63.18, -17.77],
                [-63.18, -17.78],
            ]],
        },
    })
}

/// Run an import inside a transaction, committing on success and rolling
/// back on failure, the same way the execute endpoint does.
pub async fn run_import_tx(
    pool: &SqlitePool,
    features: &[geojson::Feature],
    mapping: &ImportMapping,
    policy: ConflictPolicy,
    decisions: &ConflictDecisions,
) -> Result<ImportSummary, ImportError> {
    let mut tx = pool.begin().await.unwrap();
    match run_import(&mut tx, features, mapping, policy, decisions).await {
        Ok(summary) => {
            tx.commit().await.unwrap();
            Ok(summary)
        }
        Err(e) => {
            tx.rollback().await.unwrap();
            Err(e)
        }
    }
}
