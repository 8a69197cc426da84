//! Lot CRUD endpoints and CSV export

use crate::db::{self, lots::LotInput};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use lotmap_common::models::{status_label, Lot};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
}

fn validate(input: &LotInput) -> ApiResult<()> {
    if input.lot_number.trim().is_empty() {
        return Err(ApiError::field("lot_number", "lot number is required"));
    }
    if !(0..=2).contains(&input.status) {
        return Err(ApiError::field("status", "status must be 0, 1, or 2"));
    }
    Ok(())
}

/// GET /api/lots
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Lot>>> {
    let mut conn = state.db.acquire().await?;
    let lots = db::lots::list(&mut conn, query.project_id, query.location.as_deref()).await?;
    Ok(Json(lots))
}

/// POST /api/lots
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<LotInput>,
) -> ApiResult<(StatusCode, Json<Lot>)> {
    validate(&input)?;

    let mut conn = state.db.acquire().await?;
    if db::blocks::find_context(&mut conn, input.block_id).await?.is_none() {
        return Err(ApiError::field("block_id", "block does not exist"));
    }

    let id = db::lots::create(&mut conn, &input, None).await?;
    let lot = db::lots::find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::Internal("lot vanished after insert".to_string()))?;

    info!(id, lot_number = %lot.lot_number, "lot created");
    Ok((StatusCode::CREATED, Json(lot)))
}

/// PUT /api/lots/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<LotInput>,
) -> ApiResult<Json<Lot>> {
    validate(&input)?;

    let mut conn = state.db.acquire().await?;
    if !db::lots::update(&mut conn, id, &input).await? {
        return Err(ApiError::NotFound(format!("Lot {} not found", id)));
    }

    let lot = db::lots::find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lot {} not found", id)))?;

    Ok(Json(lot))
}

/// DELETE /api/lots/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    if !db::lots::delete(&mut conn, id).await? {
        return Err(ApiError::NotFound(format!("Lot {} not found", id)));
    }

    info!(id, "lot deleted");
    Ok(Json(json!({ "success": true, "message": "Lot deleted" })))
}

/// POST /api/lots/{id}/toggle-active
pub async fn toggle_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let active = db::lots::toggle_active(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lot {} not found", id)))?;

    Ok(Json(json!({
        "id": id,
        "active": active,
        "message": "Active flag updated",
    })))
}

/// GET /api/lots/export.csv
pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let mut conn = state.db.acquire().await?;
    let lots = db::lots::list(&mut conn, query.project_id, query.location.as_deref()).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "location",
            "lot_number",
            "area",
            "down_payment",
            "monthly_payment",
            "sale_price",
            "status",
            "active",
        ])
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    for lot in &lots {
        writer
            .write_record([
                lot.id.to_string(),
                lot.location.clone(),
                lot.lot_number.clone(),
                lot.area.clone(),
                lot.down_payment.to_string(),
                lot.monthly_payment.to_string(),
                lot.sale_price.to_string(),
                status_label(lot.status).to_string(),
                if lot.active { "yes" } else { "no" }.to_string(),
            ])
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(rows = lots.len(), "lots exported to CSV");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"lots.csv\"",
            ),
        ],
        data,
    )
        .into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/lots", get(list))
        .route("/api/lots", post(create))
        .route("/api/lots/export.csv", get(export_csv))
        .route("/api/lots/:id", put(update))
        .route("/api/lots/:id", delete(remove))
        .route("/api/lots/:id/toggle-active", post(toggle_active))
}
