//! Map data API
//!
//! Serves the sales map: project summaries with lot counters and GeoJSON
//! layers for each hierarchy level. Only entities with a stored polygon
//! appear in the layers; the axis swap back to `[lng, lat]` happens in the
//! shared geometry type.

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use lotmap_common::models::{status_label, Project};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub launch_date: Option<String>,
    pub lot_count: Option<i64>,
    pub photo_path: Option<String>,
    pub total_lots: i64,
    pub available_lots: i64,
    pub sold_lots: i64,
    pub reserved_lots: i64,
}

async fn summarize(
    conn: &mut sqlx::SqliteConnection,
    project: Project,
) -> ApiResult<ProjectSummary> {
    let counters = db::lots::counters(conn, project.id).await?;

    Ok(ProjectSummary {
        id: project.id,
        name: project.name,
        description: project.description,
        location: project.location,
        launch_date: project.launch_date,
        lot_count: project.lot_count,
        photo_path: project.photo_path,
        total_lots: counters.total,
        available_lots: counters.available,
        sold_lots: counters.sold,
        reserved_lots: counters.reserved,
    })
}

/// GET /api/map/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let mut conn = state.db.acquire().await?;
    let projects = db::projects::list(&mut conn, None).await?;

    let mut summaries = Vec::new();
    for project in projects.into_iter().filter(|p| p.active) {
        summaries.push(summarize(&mut conn, project).await?);
    }

    Ok(Json(summaries))
}

/// GET /api/map/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProjectSummary>> {
    let mut conn = state.db.acquire().await?;
    let project = db::projects::find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    Ok(Json(summarize(&mut conn, project).await?))
}

fn feature(
    geometry: geojson::Geometry,
    properties: serde_json::Value,
) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: properties.as_object().cloned(),
        foreign_members: None,
    }
}

fn collection(features: Vec<geojson::Feature>) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// GET /api/map/projects/{id}/neighborhoods
pub async fn neighborhoods_geojson(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<geojson::FeatureCollection>> {
    let mut conn = state.db.acquire().await?;
    let neighborhoods = db::neighborhoods::list_with_polygon_by_project(&mut conn, id).await?;

    let features = neighborhoods
        .into_iter()
        .filter_map(|n| {
            let polygon = n.polygon?;
            Some(feature(
                polygon.to_geojson_geometry(),
                json!({ "id": n.id, "name": n.name }),
            ))
        })
        .collect();

    Ok(Json(collection(features)))
}

/// GET /api/map/projects/{id}/blocks
pub async fn blocks_geojson(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<geojson::FeatureCollection>> {
    let mut conn = state.db.acquire().await?;
    let blocks = db::blocks::list_with_polygon_by_project(&mut conn, id).await?;

    let features = blocks
        .into_iter()
        .filter_map(|b| {
            let polygon = b.polygon?;
            Some(feature(
                polygon.to_geojson_geometry(),
                json!({ "id": b.id, "name": b.name, "neighborhood_id": b.neighborhood_id }),
            ))
        })
        .collect();

    Ok(Json(collection(features)))
}

/// GET /api/map/projects/{id}/lots
pub async fn lots_geojson(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<geojson::FeatureCollection>> {
    let mut conn = state.db.acquire().await?;
    let lots = db::lots::list_with_polygon_by_project(&mut conn, id).await?;

    let features = lots
        .into_iter()
        .filter_map(|lot| {
            let polygon = lot.polygon.as_ref()?;
            Some(feature(
                polygon.to_geojson_geometry(),
                json!({
                    "id": lot.id,
                    "lot_number": lot.lot_number,
                    "location": lot.location,
                    "category_id": lot.category_id,
                    "area": lot.area,
                    "down_payment": lot.down_payment,
                    "monthly_payment": lot.monthly_payment,
                    "sale_price": lot.sale_price,
                    "status": lot.status,
                    "status_label": status_label(lot.status),
                    "active": lot.active,
                }),
            ))
        })
        .collect();

    Ok(Json(collection(features)))
}

/// GET /api/map/projects/{id}/categories
pub async fn categories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<lotmap_common::models::Category>>> {
    let mut conn = state.db.acquire().await?;
    let categories = db::categories::list_by_project(&mut conn, id, true).await?;
    Ok(Json(categories))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/map/projects", get(list_projects))
        .route("/api/map/projects/:id", get(get_project))
        .route("/api/map/projects/:id/neighborhoods", get(neighborhoods_geojson))
        .route("/api/map/projects/:id/blocks", get(blocks_geojson))
        .route("/api/map/projects/:id/lots", get(lots_geojson))
        .route("/api/map/projects/:id/categories", get(categories))
}
