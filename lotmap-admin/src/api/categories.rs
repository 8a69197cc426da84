//! Category CRUD endpoints

use crate::db::{self, categories::CategoryInput};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use lotmap_common::models::Category;
use serde_json::json;
use tracing::info;

/// GET /api/projects/{id}/categories
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Vec<Category>>> {
    let mut conn = state.db.acquire().await?;
    let categories = db::categories::list_by_project(&mut conn, project_id, false).await?;
    Ok(Json(categories))
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if input.name.trim().is_empty() {
        return Err(ApiError::field("name", "name is required"));
    }

    let mut conn = state.db.acquire().await?;
    if db::projects::find_by_id(&mut conn, input.project_id).await?.is_none() {
        return Err(ApiError::field("project_id", "project does not exist"));
    }

    let id = db::categories::create(&mut conn, &input).await?;
    info!(id, name = %input.name, "category created");

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "id": id }))))
}

/// PUT /api/categories/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<serde_json::Value>> {
    if input.name.trim().is_empty() {
        return Err(ApiError::field("name", "name is required"));
    }

    let mut conn = state.db.acquire().await?;
    if !db::categories::update(&mut conn, id, &input).await? {
        return Err(ApiError::NotFound(format!("Category {} not found", id)));
    }

    Ok(Json(json!({ "success": true, "message": "Category updated" })))
}

/// DELETE /api/categories/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    if !db::categories::delete(&mut conn, id).await? {
        return Err(ApiError::NotFound(format!("Category {} not found", id)));
    }

    info!(id, "category deleted");
    Ok(Json(json!({ "success": true, "message": "Category deleted" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects/:id/categories", get(list_by_project))
        .route("/api/categories", post(create))
        .route("/api/categories/:id", put(update))
        .route("/api/categories/:id", delete(remove))
}
