//! Project CRUD endpoints

use crate::db::{self, projects::ProjectInput};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use lotmap_common::models::Project;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
}

fn validate(input: &ProjectInput) -> ApiResult<()> {
    if input.name.trim().is_empty() {
        return Err(ApiError::field("name", "name is required"));
    }
    if let Some(date) = &input.launch_date {
        if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(ApiError::field("launch_date", "expected YYYY-MM-DD"));
        }
    }
    Ok(())
}

/// GET /api/projects
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    let mut conn = state.db.acquire().await?;
    let projects = db::projects::list(&mut conn, query.search.as_deref()).await?;
    Ok(Json(projects))
}

/// POST /api/projects
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<ProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    validate(&input)?;

    let mut conn = state.db.acquire().await?;
    let id = db::projects::create(&mut conn, &input).await?;
    let project = db::projects::find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::Internal("project vanished after insert".to_string()))?;

    info!(id, name = %project.name, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ProjectInput>,
) -> ApiResult<Json<Project>> {
    validate(&input)?;

    let mut conn = state.db.acquire().await?;
    if !db::projects::update(&mut conn, id, &input).await? {
        return Err(ApiError::NotFound(format!("Project {} not found", id)));
    }

    let project = db::projects::find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    Ok(Json(project))
}

/// DELETE /api/projects/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    if !db::projects::delete(&mut conn, id).await? {
        return Err(ApiError::NotFound(format!("Project {} not found", id)));
    }

    info!(id, "project deleted");
    Ok(Json(json!({ "success": true, "message": "Project deleted" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list))
        .route("/api/projects", post(create))
        .route("/api/projects/:id", put(update))
        .route("/api/projects/:id", delete(remove))
}
