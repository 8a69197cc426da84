//! Block endpoints
//!
//! Blocks are registered in bulk, grouped per neighborhood.

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
pub struct BlockGroup {
    pub neighborhood_id: i64,
    pub names: Vec<String>,
}

/// GET /api/neighborhoods/{id}/blocks
pub async fn list_by_neighborhood(
    State(state): State<AppState>,
    Path(neighborhood_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let blocks = db::blocks::list_refs_by_neighborhood(&mut conn, neighborhood_id).await?;
    Ok(Json(json!({ "success": true, "blocks": blocks })))
}

/// POST /api/blocks
pub async fn bulk_create(
    State(state): State<AppState>,
    Json(groups): Json<Vec<BlockGroup>>,
) -> ApiResult<Json<serde_json::Value>> {
    if groups.is_empty() {
        return Err(ApiError::field("groups", "at least one group is required"));
    }

    let mut conn = state.db.acquire().await?;

    for group in &groups {
        if group.names.is_empty() {
            return Err(ApiError::field("names", "at least one name is required"));
        }
        if !db::neighborhoods::exists(&mut conn, group.neighborhood_id).await? {
            return Err(ApiError::field(
                "neighborhood_id",
                "neighborhood does not exist",
            ));
        }
    }

    let mut created = 0;
    for group in &groups {
        for name in &group.names {
            db::blocks::create(&mut conn, group.neighborhood_id, name.trim(), None).await?;
            created += 1;
        }
    }

    info!(created, "blocks registered");
    Ok(Json(json!({
        "success": true,
        "message": "Blocks registered",
        "created": created,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/neighborhoods/:id/blocks", get(list_by_neighborhood))
        .route("/api/blocks", post(bulk_create))
}
