//! Polygon editor API
//!
//! Persistence for the drawing editor. Batch saves use the same write
//! primitives as the importer without the classification step: projects
//! are update-only, children are create-or-fill, and stored polygons are
//! never overwritten. The single-polygon PUT is the one deliberate
//! exception — an explicit manual replacement.

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use lotmap_common::models::LOT_STATUS_AVAILABLE;
use lotmap_common::Polygon;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Project,
    Neighborhood,
    Block,
    Lot,
}

#[derive(Debug, Deserialize)]
pub struct DrawnPolygon {
    pub entity_type: EntityType,
    pub geometry: geojson::Geometry,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SavePolygonsRequest {
    pub polygons: Vec<DrawnPolygon>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePolygonRequest {
    pub entity_type: ChildEntityType,
    pub id: i64,
    pub geometry: geojson::Geometry,
}

/// Entities whose polygon can be replaced individually
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildEntityType {
    Neighborhood,
    Block,
    Lot,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EditorCounts {
    pub created: u32,
    pub updated: u32,
    pub failed: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct EditorSummary {
    pub project: EditorCounts,
    pub neighborhoods: EditorCounts,
    pub blocks: EditorCounts,
    pub lots: EditorCounts,
    pub errors: Vec<String>,
}

enum SaveOutcome {
    Created,
    Updated,
    Unchanged,
}

/// GET /api/editor/initial-data
pub async fn initial_data(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let projects = db::projects::list_refs(&mut conn, true).await?;
    let categories = db::categories::list_active(&mut conn).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "projects": projects, "categories": categories },
    })))
}

/// GET /api/editor/projects/{id}/neighborhoods
pub async fn neighborhoods_by_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let neighborhoods = db::neighborhoods::list_refs_by_project(&mut conn, id).await?;
    Ok(Json(json!({ "success": true, "neighborhoods": neighborhoods })))
}

/// GET /api/editor/neighborhoods/{id}/blocks
pub async fn blocks_by_neighborhood(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;
    let blocks = db::blocks::list_refs_by_neighborhood(&mut conn, id).await?;
    Ok(Json(json!({ "success": true, "blocks": blocks })))
}

/// GET /api/editor/projects/{id}/polygons
///
/// Every polygon-bearing entity of a project, for display in the editor.
pub async fn project_polygons(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut conn = state.db.acquire().await?;

    let neighborhoods: Vec<_> = db::neighborhoods::list_with_polygon_by_project(&mut conn, id)
        .await?
        .into_iter()
        .filter_map(|n| {
            let geometry = n.polygon.as_ref()?.to_geojson_geometry();
            Some(json!({ "id": n.id, "name": n.name, "geometry": geometry }))
        })
        .collect();

    let blocks: Vec<_> = db::blocks::list_with_polygon_by_project(&mut conn, id)
        .await?
        .into_iter()
        .filter_map(|b| {
            let geometry = b.polygon.as_ref()?.to_geojson_geometry();
            Some(json!({ "id": b.id, "name": b.name, "geometry": geometry }))
        })
        .collect();

    let lots: Vec<_> = db::lots::list_with_polygon_by_project(&mut conn, id)
        .await?
        .into_iter()
        .filter_map(|l| {
            let geometry = l.polygon.as_ref()?.to_geojson_geometry();
            Some(json!({ "id": l.id, "number": l.lot_number, "geometry": geometry }))
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "neighborhoods": neighborhoods,
            "blocks": blocks,
            "lots": lots,
        },
    })))
}

/// POST /api/editor/polygons
///
/// Batch save. Runs in one transaction; individual failures are recorded
/// and the rest of the batch still commits.
pub async fn save_polygons(
    State(state): State<AppState>,
    Json(request): Json<SavePolygonsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.polygons.is_empty() {
        return Err(ApiError::field("polygons", "at least one polygon is required"));
    }

    let mut tx = state.db.begin().await?;
    let mut summary = EditorSummary::default();

    for (index, drawn) in request.polygons.iter().enumerate() {
        let outcome = save_one(&mut *tx, drawn).await;
        let counts = match drawn.entity_type {
            EntityType::Project => &mut summary.project,
            EntityType::Neighborhood => &mut summary.neighborhoods,
            EntityType::Block => &mut summary.blocks,
            EntityType::Lot => &mut summary.lots,
        };

        match outcome {
            Ok(SaveOutcome::Created) => counts.created += 1,
            Ok(SaveOutcome::Updated) => counts.updated += 1,
            Ok(SaveOutcome::Unchanged) => {}
            Err(message) => {
                counts.failed += 1;
                summary
                    .errors
                    .push(format!("Polygon #{} ({:?}): {}", index, drawn.entity_type, message));
            }
        }
    }

    tx.commit().await?;
    info!(
        errors = summary.errors.len(),
        "editor polygons saved"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Polygons saved",
        "result": summary,
    })))
}

async fn save_one(
    conn: &mut SqliteConnection,
    drawn: &DrawnPolygon,
) -> Result<SaveOutcome, String> {
    let polygon = Polygon::from_geojson(&drawn.geometry).map_err(|e| e.to_string())?;
    let props = &drawn.properties;

    match drawn.entity_type {
        EntityType::Project => save_project(conn, &polygon, props).await,
        EntityType::Neighborhood => save_neighborhood(conn, &polygon, props).await,
        EntityType::Block => save_block(conn, &polygon, props).await,
        EntityType::Lot => save_lot(conn, &polygon, props).await,
    }
}

fn prop_str(props: &serde_json::Value, key: &str) -> Option<String> {
    props.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn prop_i64(props: &serde_json::Value, key: &str) -> Option<i64> {
    props.get(key).and_then(|v| v.as_i64())
}

async fn save_project(
    conn: &mut SqliteConnection,
    polygon: &Polygon,
    props: &serde_json::Value,
) -> Result<SaveOutcome, String> {
    let name = prop_str(props, "name").ok_or_else(|| "project name not specified".to_string())?;

    let project = db::projects::find_by_name(&mut *conn, &name)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Project '{}' does not exist. Create it first.", name))?;

    if project.polygon.is_some() {
        debug!(name = %name, "project already has a polygon");
        return Ok(SaveOutcome::Unchanged);
    }

    db::projects::set_polygon_if_null(&mut *conn, project.id, polygon)
        .await
        .map_err(|e| e.to_string())?;
    info!(name = %name, "project polygon filled");
    Ok(SaveOutcome::Updated)
}

async fn save_neighborhood(
    conn: &mut SqliteConnection,
    polygon: &Polygon,
    props: &serde_json::Value,
) -> Result<SaveOutcome, String> {
    let name = prop_str(props, "name").ok_or_else(|| "neighborhood name not specified".to_string())?;
    let project_id = prop_i64(props, "project_id").ok_or_else(|| "project id not specified".to_string())?;

    if db::projects::find_by_id(&mut *conn, project_id)
        .await
        .map_err(|e| e.to_string())?
        .is_none()
    {
        return Err(format!("Project ID {} does not exist", project_id));
    }

    match db::neighborhoods::find_by_name(&mut *conn, project_id, &name)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(existing) => {
            if existing.polygon.is_some() {
                debug!(name = %name, "neighborhood already has a polygon");
                return Ok(SaveOutcome::Unchanged);
            }
            db::neighborhoods::set_polygon_if_null(&mut *conn, existing.id, polygon)
                .await
                .map_err(|e| e.to_string())?;
            Ok(SaveOutcome::Updated)
        }
        None => {
            db::neighborhoods::create(&mut *conn, project_id, &name, Some(polygon))
                .await
                .map_err(|e| e.to_string())?;
            Ok(SaveOutcome::Created)
        }
    }
}

async fn save_block(
    conn: &mut SqliteConnection,
    polygon: &Polygon,
    props: &serde_json::Value,
) -> Result<SaveOutcome, String> {
    let name = prop_str(props, "name").ok_or_else(|| "block name not specified".to_string())?;
    let neighborhood_id = prop_i64(props, "neighborhood_id").ok_or_else(|| "neighborhood id not specified".to_string())?;

    if !db::neighborhoods::exists(&mut *conn, neighborhood_id)
        .await
        .map_err(|e| e.to_string())?
    {
        return Err(format!("Neighborhood ID {} does not exist", neighborhood_id));
    }

    match db::blocks::find_by_name(&mut *conn, neighborhood_id, &name)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(existing) => {
            if existing.polygon.is_some() {
                debug!(name = %name, "block already has a polygon");
                return Ok(SaveOutcome::Unchanged);
            }
            db::blocks::set_polygon_if_null(&mut *conn, existing.id, polygon)
                .await
                .map_err(|e| e.to_string())?;
            Ok(SaveOutcome::Updated)
        }
        None => {
            db::blocks::create(&mut *conn, neighborhood_id, &name, Some(polygon))
                .await
                .map_err(|e| e.to_string())?;
            Ok(SaveOutcome::Created)
        }
    }
}

async fn save_lot(
    conn: &mut SqliteConnection,
    polygon: &Polygon,
    props: &serde_json::Value,
) -> Result<SaveOutcome, String> {
    let number = prop_str(props, "number").ok_or_else(|| "lot number not specified".to_string())?;
    let block_id = prop_i64(props, "block_id").ok_or_else(|| "block id not specified".to_string())?;
    let project_id = prop_i64(props, "project_id").ok_or_else(|| "project id not specified".to_string())?;

    let block = db::blocks::find_context(&mut *conn, block_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Block ID {} does not exist", block_id))?;

    let category_id = match prop_i64(props, "category_id") {
        Some(id) => id,
        None => db::categories::first_for_project(&mut *conn, project_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("No categories available for project {}", project_id))?
            .id,
    };

    match db::lots::find_summary_by_number(&mut *conn, block_id, &number)
        .await
        .map_err(|e| e.to_string())?
    {
        Some((id, has_polygon)) => {
            if has_polygon {
                debug!(number = %number, "lot already has a polygon");
                return Ok(SaveOutcome::Unchanged);
            }
            db::lots::set_polygon_if_null(&mut *conn, id, polygon)
                .await
                .map_err(|e| e.to_string())?;
            Ok(SaveOutcome::Updated)
        }
        None => {
            let location = format!("{} {} LT {}", block.neighborhood_name, block.name, number);
            let input = db::lots::LotInput {
                project_id,
                category_id,
                block_id,
                lot_number: number,
                location,
                area: prop_str(props, "area").unwrap_or_else(|| "0".to_string()),
                down_payment: 0.0,
                monthly_payment: 0.0,
                sale_price: 0.0,
                status: LOT_STATUS_AVAILABLE,
                active: true,
            };
            db::lots::create(&mut *conn, &input, Some(polygon))
                .await
                .map_err(|e| e.to_string())?;
            Ok(SaveOutcome::Created)
        }
    }
}

/// PUT /api/editor/polygon
///
/// Replace a single entity's polygon unconditionally.
pub async fn update_polygon(
    State(state): State<AppState>,
    Json(request): Json<UpdatePolygonRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let polygon = Polygon::from_geojson(&request.geometry)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut conn = state.db.acquire().await?;
    let conn: &mut SqliteConnection = &mut conn;

    let updated = match request.entity_type {
        ChildEntityType::Neighborhood => {
            db::neighborhoods::set_polygon(conn, request.id, &polygon).await?
        }
        ChildEntityType::Block => db::blocks::set_polygon(conn, request.id, &polygon).await?,
        ChildEntityType::Lot => db::lots::set_polygon(conn, request.id, &polygon).await?,
    };

    if !updated {
        error!(id = request.id, "polygon update target not found");
        return Err(ApiError::NotFound(format!(
            "No entity with ID {} was found",
            request.id
        )));
    }

    Ok(Json(json!({ "success": true, "message": "Polygon updated" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/editor/initial-data", get(initial_data))
        .route("/api/editor/projects/:id/neighborhoods", get(neighborhoods_by_project))
        .route("/api/editor/neighborhoods/:id/blocks", get(blocks_by_neighborhood))
        .route("/api/editor/projects/:id/polygons", get(project_polygons))
        .route("/api/editor/polygons", post(save_polygons))
        .route("/api/editor/polygon", put(update_polygon))
}
