//! Two-phase hierarchy writer
//!
//! Runs on the caller's transaction connection: the import endpoint opens
//! the transaction, and any [`ImportError`] returned from here rolls the
//! whole run back — partial imports are never committed. Entities created
//! earlier in the run are visible to later lookups because every query goes
//! through the same connection.
//!
//! Error discipline: parent resolution failures, a project feature naming a
//! project that does not exist, and a missing default category are fatal.
//! Unusable geometry on an otherwise processable feature is recorded in the
//! summary's error list and the feature is skipped.
//!
//! Polygon rule: an existing entity's polygon is only ever filled when it
//! is null, under every conflict policy. The conflict policy governs the
//! record-level skip decision, not geometry overwrite.

use super::classify::{classify_features, Classified};
use super::conflict::{has_conflict, resolve_block_id, resolve_neighborhood_id, LookupCache};
use super::plan::should_skip;
use super::{ConflictDecisions, ConflictPolicy, ImportMapping, ImportSummary};
use crate::db;
use lotmap_common::models::LOT_STATUS_AVAILABLE;
use lotmap_common::Polygon;
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::{debug, info};

/// Fatal import failures; any of these aborts the whole transaction
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Project '{0}' was not found. Imports only update existing projects.")]
    ProjectNotFound(String),

    #[error("Neighborhood '{reference}' was not found for block '{block}'")]
    UnresolvedNeighborhood { reference: String, block: String },

    #[error("Block '{reference}' was not found for lot '{lot}'")]
    UnresolvedBlock { reference: String, lot: String },

    #[error("Project {0} has no lot categories. Create at least one before importing.")]
    NoCategory(i64),

    #[error("{0}")]
    Storage(#[from] lotmap_common::Error),
}

/// Execute an import over a classified feature list
///
/// Phase 1 processes project features (update-only). Phase 2 processes
/// neighborhoods, then blocks, then lots — dependency order across the
/// whole feature list, so parents created by the same file are in place
/// before any child resolves them, regardless of feature order.
pub async fn run_import(
    conn: &mut SqliteConnection,
    features: &[geojson::Feature],
    mapping: &ImportMapping,
    policy: ConflictPolicy,
    decisions: &ConflictDecisions,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();
    let mut cache = LookupCache::default();

    let default_category = db::categories::first_for_project(conn, mapping.project_id)
        .await
        .map_err(ImportError::Storage)?
        .ok_or(ImportError::NoCategory(mapping.project_id))?;

    let classified = classify_features(features);

    info!(
        total = features.len(),
        project_id = mapping.project_id,
        default_category = default_category.id,
        "processing import features"
    );

    // ------------------------------------------------------------------
    // Phase 1: projects
    // ------------------------------------------------------------------
    for (index, item) in classified.iter().enumerate() {
        let Classified::Project { name } = item else {
            continue;
        };

        let conflicted = has_conflict(conn, mapping, &mut cache, item)
            .await
            .map_err(ImportError::Storage)?;

        // Projects are never created by import, so "overwrite" and "ask"
        // both proceed to the update path; only skip_all skips.
        if conflicted && policy == ConflictPolicy::SkipAll {
            info!(name = %name, "project skipped on conflict");
            summary.project.skipped += 1;
            continue;
        }

        let project = db::projects::find_by_name(conn, name)
            .await
            .map_err(ImportError::Storage)?
            .ok_or_else(|| ImportError::ProjectNotFound(name.clone()))?;

        if project.polygon.is_some() {
            debug!(name = %name, "project already has a polygon");
            summary.project.updated += 1;
            continue;
        }

        match build_polygon(&features[index]) {
            Ok(polygon) => {
                db::projects::set_polygon_if_null(conn, project.id, &polygon)
                    .await
                    .map_err(ImportError::Storage)?;
                info!(name = %name, id = project.id, "project polygon filled");
                summary.project.updated += 1;
            }
            Err(message) => {
                summary
                    .errors
                    .push(format!("Feature #{} (project '{}'): {}", index, name, message));
                summary.project.skipped += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 2a: neighborhoods
    // ------------------------------------------------------------------
    for (index, item) in classified.iter().enumerate() {
        let Classified::Neighborhood { name } = item else {
            continue;
        };

        let conflicted = has_conflict(conn, mapping, &mut cache, item)
            .await
            .map_err(ImportError::Storage)?;
        if should_skip(conflicted, policy, decisions, index) {
            debug!(name = %name, "neighborhood skipped");
            summary.neighborhoods.skipped += 1;
            continue;
        }

        let polygon = match build_polygon(&features[index]) {
            Ok(polygon) => polygon,
            Err(message) => {
                summary.errors.push(format!(
                    "Feature #{} (neighborhood '{}'): {}",
                    index, name, message
                ));
                summary.neighborhoods.skipped += 1;
                continue;
            }
        };

        match db::neighborhoods::find_by_name(conn, mapping.project_id, name)
            .await
            .map_err(ImportError::Storage)?
        {
            Some(existing) => {
                if existing.polygon.is_none() {
                    db::neighborhoods::set_polygon_if_null(conn, existing.id, &polygon)
                        .await
                        .map_err(ImportError::Storage)?;
                    info!(name = %name, id = existing.id, "neighborhood polygon filled");
                } else {
                    debug!(name = %name, "neighborhood already has a polygon");
                }
                summary.neighborhoods.updated += 1;
            }
            None => {
                let id =
                    db::neighborhoods::create(conn, mapping.project_id, name, Some(&polygon))
                        .await
                        .map_err(ImportError::Storage)?;
                info!(name = %name, id, "neighborhood created");
                summary.neighborhoods.created += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 2b: blocks
    // ------------------------------------------------------------------
    for (index, item) in classified.iter().enumerate() {
        let Classified::Block {
            name,
            neighborhood_ref,
        } = item
        else {
            continue;
        };

        let conflicted = has_conflict(conn, mapping, &mut cache, item)
            .await
            .map_err(ImportError::Storage)?;
        if should_skip(conflicted, policy, decisions, index) {
            debug!(name = %name, "block skipped");
            summary.blocks.skipped += 1;
            continue;
        }

        let neighborhood_id =
            resolve_neighborhood_id(conn, mapping, &mut cache, neighborhood_ref.as_deref())
                .await
                .map_err(ImportError::Storage)?
                .ok_or_else(|| ImportError::UnresolvedNeighborhood {
                    reference: reference_or_unspecified(neighborhood_ref),
                    block: name.clone(),
                })?;

        let polygon = match build_polygon(&features[index]) {
            Ok(polygon) => polygon,
            Err(message) => {
                summary
                    .errors
                    .push(format!("Feature #{} (block '{}'): {}", index, name, message));
                summary.blocks.skipped += 1;
                continue;
            }
        };

        match db::blocks::find_by_name(conn, neighborhood_id, name)
            .await
            .map_err(ImportError::Storage)?
        {
            Some(existing) => {
                if existing.polygon.is_none() {
                    db::blocks::set_polygon_if_null(conn, existing.id, &polygon)
                        .await
                        .map_err(ImportError::Storage)?;
                    info!(name = %name, id = existing.id, "block polygon filled");
                } else {
                    debug!(name = %name, "block already has a polygon");
                }
                summary.blocks.updated += 1;
            }
            None => {
                let id = db::blocks::create(conn, neighborhood_id, name, Some(&polygon))
                    .await
                    .map_err(ImportError::Storage)?;
                info!(name = %name, id, neighborhood_id, "block created");
                summary.blocks.created += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 2c: lots
    // ------------------------------------------------------------------
    for (index, item) in classified.iter().enumerate() {
        let Classified::Lot { number, block_ref } = item else {
            continue;
        };

        let conflicted = has_conflict(conn, mapping, &mut cache, item)
            .await
            .map_err(ImportError::Storage)?;
        if should_skip(conflicted, policy, decisions, index) {
            debug!(number = %number, "lot skipped");
            summary.lots.skipped += 1;
            continue;
        }

        let block_id = resolve_block_id(conn, mapping, &mut cache, block_ref.as_deref())
            .await
            .map_err(ImportError::Storage)?
            .ok_or_else(|| ImportError::UnresolvedBlock {
                reference: reference_or_unspecified(block_ref),
                lot: number.clone(),
            })?;

        let block = db::blocks::find_context(conn, block_id)
            .await
            .map_err(ImportError::Storage)?
            .ok_or_else(|| ImportError::UnresolvedBlock {
                reference: reference_or_unspecified(block_ref),
                lot: number.clone(),
            })?;

        let polygon = match build_polygon(&features[index]) {
            Ok(polygon) => polygon,
            Err(message) => {
                summary
                    .errors
                    .push(format!("Feature #{} (lot '{}'): {}", index, number, message));
                summary.lots.skipped += 1;
                continue;
            }
        };

        match db::lots::find_summary_by_number(conn, block_id, number)
            .await
            .map_err(ImportError::Storage)?
        {
            Some((id, has_polygon)) => {
                if !has_polygon {
                    db::lots::set_polygon_if_null(conn, id, &polygon)
                        .await
                        .map_err(ImportError::Storage)?;
                    info!(number = %number, id, "lot polygon filled");
                } else {
                    debug!(number = %number, "lot already has a polygon");
                }
                summary.lots.updated += 1;
            }
            None => {
                let location =
                    format!("{} {} LT {}", block.neighborhood_name, block.name, number);
                let input = db::lots::LotInput {
                    project_id: mapping.project_id,
                    category_id: default_category.id,
                    block_id,
                    lot_number: number.clone(),
                    location,
                    area: "0".to_string(),
                    down_payment: 0.0,
                    monthly_payment: 0.0,
                    sale_price: 0.0,
                    status: LOT_STATUS_AVAILABLE,
                    active: true,
                };
                let id = db::lots::create(conn, &input, Some(&polygon))
                    .await
                    .map_err(ImportError::Storage)?;
                info!(number = %number, id, block_id, "lot created");
                summary.lots.created += 1;
            }
        }
    }

    info!(
        project = ?summary.project,
        neighborhoods = ?summary.neighborhoods,
        blocks = ?summary.blocks,
        lots = ?summary.lots,
        errors = summary.errors.len(),
        "import summary"
    );

    Ok(summary)
}

fn build_polygon(feature: &geojson::Feature) -> Result<Polygon, String> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| "feature has no geometry".to_string())?;

    Polygon::from_geojson(geometry).map_err(|e| e.to_string())
}

fn reference_or_unspecified(reference: &Option<String>) -> String {
    reference
        .clone()
        .unwrap_or_else(|| "(unspecified)".to_string())
}
