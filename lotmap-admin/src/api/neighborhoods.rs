//! Neighborhood endpoints
//!
//! Neighborhoods are registered in bulk (a list of names for one project);
//! their polygons arrive later through the importer or the editor.

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub project_id: i64,
    pub names: Vec<String>,
}

/// GET /api/projects/{id}/neighborhoods
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let neighborhoods = db::neighborhoods::list_refs_by_project(&mut conn, project_id).await?;
    Ok(Json(json!({ "success": true, "neighborhoods": neighborhoods })))
}

/// POST /api/neighborhoods
pub async fn bulk_create(
    State(state): State<AppState>,
    Json(request): Json<BulkCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.names.is_empty() {
        return Err(ApiError::field("names", "at least one name is required"));
    }
    if request.names.iter().any(|n| n.trim().is_empty()) {
        return Err(ApiError::field("names", "names must not be empty"));
    }

    let mut conn = state.db.acquire().await?;
    if db::projects::find_by_id(&mut conn, request.project_id).await?.is_none() {
        return Err(ApiError::field("project_id", "project does not exist"));
    }

    let mut created = 0;
    for name in &request.names {
        db::neighborhoods::create(&mut conn, request.project_id, name.trim(), None).await?;
        created += 1;
    }

    info!(project_id = request.project_id, created, "neighborhoods registered");
    Ok(Json(json!({
        "success": true,
        "message": "Neighborhoods registered",
        "created": created,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects/:id/neighborhoods", get(list_by_project))
        .route("/api/neighborhoods", post(bulk_create))
}
