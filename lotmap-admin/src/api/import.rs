//! Import wizard API
//!
//! `analyze` and `conflicts` are read-only passes and always answer 200
//! with a `success` flag — internal failures are reported in the payload so
//! the wizard can show them inline. `execute` opens the one transaction;
//! a fatal import error rolls everything back and answers 500.

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::importer::classify::{analyze_features, classify_features};
use crate::importer::conflict::find_conflicts;
use crate::importer::writer::run_import;
use crate::importer::{ConflictDecisions, ConflictPolicy, ImportMapping};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub geojson: geojson::FeatureCollection,
}

#[derive(Debug, Deserialize)]
pub struct EntitiesRequest {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default)]
    pub idproyecto: Option<i64>,
    #[serde(default)]
    pub idbarrio: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Projects,
    Neighborhoods,
    Blocks,
}

#[derive(Debug, Deserialize)]
pub struct ConflictsRequest {
    pub geojson: geojson::FeatureCollection,
    pub mapping: ImportMapping,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub geojson: geojson::FeatureCollection,
    pub mapping: ImportMapping,
    #[serde(rename = "conflictResolution")]
    pub conflict_resolution: ConflictPolicy,
    #[serde(rename = "conflictDecisions", default)]
    pub conflict_decisions: ConflictDecisions,
}

fn require_features(collection: &geojson::FeatureCollection) -> ApiResult<()> {
    if collection.features.is_empty() {
        return Err(ApiError::field(
            "geojson.features",
            "at least one feature is required",
        ));
    }
    Ok(())
}

/// POST /api/import/analyze
pub async fn analyze(Json(request): Json<AnalyzeRequest>) -> ApiResult<Json<serde_json::Value>> {
    require_features(&request.geojson)?;

    info!(
        total_features = request.geojson.features.len(),
        "analyzing GeoJSON"
    );

    let analysis = analyze_features(&request.geojson.features);

    info!(
        import_type = ?analysis.import_type,
        valid = analysis.valid,
        neighborhoods = analysis.neighborhoods.count,
        blocks = analysis.blocks.count,
        lots = analysis.lots.count,
        errors = analysis.errors.len(),
        "analysis complete"
    );

    Ok(Json(json!({ "success": true, "analysis": analysis })))
}

/// POST /api/import/entities
///
/// Entities available for manual mapping in the wizard.
pub async fn available_entities(
    State(state): State<AppState>,
    Json(request): Json<EntitiesRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;

    let entities = match request.kind {
        EntityKind::Projects => db::projects::list_refs(&mut conn, false).await?,
        EntityKind::Neighborhoods => match request.idproyecto {
            Some(project_id) => {
                db::neighborhoods::list_refs_by_project(&mut conn, project_id).await?
            }
            None => Vec::new(),
        },
        EntityKind::Blocks => match request.idbarrio {
            Some(neighborhood_id) => {
                db::blocks::list_refs_by_neighborhood(&mut conn, neighborhood_id).await?
            }
            None => Vec::new(),
        },
    };

    Ok(Json(json!({ "success": true, "entities": entities })))
}

/// POST /api/import/conflicts
pub async fn detect_conflicts(
    State(state): State<AppState>,
    Json(request): Json<ConflictsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    require_features(&request.geojson)?;

    info!(
        project_id = request.mapping.project_id,
        total_features = request.geojson.features.len(),
        "detecting conflicts"
    );

    let mut conn = state.db.acquire().await?;
    let classified = classify_features(&request.geojson.features);

    match find_conflicts(&mut conn, &request.mapping, &classified).await {
        Ok(report) => {
            info!(
                total = report.total(),
                neighborhoods = report.neighborhoods.len(),
                blocks = report.blocks.len(),
                lots = report.lots.len(),
                "conflicts detected"
            );
            Ok(Json(json!({ "success": true, "conflicts": report })))
        }
        Err(e) => {
            error!(error = %e, "conflict detection failed");
            Ok(Json(json!({
                "success": false,
                "message": "Conflict detection failed",
                "error": e.to_string(),
            })))
        }
    }
}

/// POST /api/import/execute
///
/// The whole import runs inside one transaction; any fatal error rolls it
/// back and nothing from the request persists.
pub async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Response> {
    require_features(&request.geojson)?;

    info!(
        total_features = request.geojson.features.len(),
        project_id = request.mapping.project_id,
        resolution = ?request.conflict_resolution,
        "starting import"
    );

    let mut tx = state.db.begin().await?;

    let result = run_import(
        &mut tx,
        &request.geojson.features,
        &request.mapping,
        request.conflict_resolution,
        &request.conflict_decisions,
    )
    .await;

    match result {
        Ok(summary) => {
            tx.commit().await?;
            info!("import committed");
            Ok((
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Import completed successfully",
                    "summary": summary,
                })),
            )
                .into_response())
        }
        Err(e) => {
            tx.rollback().await?;
            error!(error = %e, "import failed, transaction rolled back");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Import failed",
                    "error": e.to_string(),
                })),
            )
                .into_response())
        }
    }
}

/// GET /api/import/overview
///
/// Per-project hierarchy statistics for the import landing page.
pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let projects = db::projects::list(&mut conn, None).await?;

    let mut rows = Vec::with_capacity(projects.len());
    for project in projects {
        let neighborhoods = db::neighborhoods::stats_by_project(&mut conn, project.id).await?;
        let blocks = db::blocks::stats_by_project(&mut conn, project.id).await?;
        let lots = db::lots::stats_by_project(&mut conn, project.id).await?;

        rows.push(json!({
            "id": project.id,
            "name": project.name,
            "location": project.location,
            "active": project.active,
            "statistics": {
                "neighborhoods": { "total": neighborhoods.0, "with_polygon": neighborhoods.1 },
                "blocks": { "total": blocks.0, "with_polygon": blocks.1 },
                "lots": { "total": lots.0, "with_polygon": lots.1 },
            },
        }));
    }

    Ok(Json(json!({ "success": true, "projects": rows })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/import/analyze", post(analyze))
        .route("/api/import/entities", post(available_entities))
        .route("/api/import/conflicts", post(detect_conflicts))
        .route("/api/import/execute", post(execute))
        .route("/api/import/overview", get(overview))
}
