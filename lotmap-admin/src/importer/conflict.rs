//! Conflict detection and parent reference resolution
//!
//! A conflict is an imported feature whose target entity already exists
//! under the correct parent scope. Neighborhood/block tokens are resolved
//! to ids through [`LookupCache`], which lives for exactly one request —
//! the cache must never outlive the call that created it, or it would serve
//! stale ids after another request's writes.

use super::classify::Classified;
use super::normalize::normalize_ref;
use super::ImportMapping;
use crate::db;
use lotmap_common::Result;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Name → id lookups memoized for one import/conflict run
#[derive(Debug, Default)]
pub struct LookupCache {
    neighborhoods: HashMap<String, Option<i64>>,
    blocks: HashMap<String, Option<i64>>,
}

/// Resolve a neighborhood token to an id
///
/// An explicit `idbarrio` in the mapping wins over name lookup.
pub async fn resolve_neighborhood_id(
    conn: &mut SqliteConnection,
    mapping: &ImportMapping,
    cache: &mut LookupCache,
    reference: Option<&str>,
) -> Result<Option<i64>> {
    if let Some(id) = mapping.neighborhood_id {
        return Ok(Some(id));
    }

    let reference = match reference {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(None),
    };

    let normalized = normalize_ref(reference);
    let cache_key = format!("{}:{}", mapping.project_id, normalized);

    if let Some(cached) = cache.neighborhoods.get(&cache_key) {
        tracing::debug!(key = %cache_key, "neighborhood id from cache");
        return Ok(*cached);
    }

    let id = db::neighborhoods::find_id_by_name(conn, mapping.project_id, &normalized).await?;
    cache.neighborhoods.insert(cache_key, id);

    if id.is_none() {
        tracing::warn!(
            reference = %reference,
            normalized = %normalized,
            project_id = mapping.project_id,
            "neighborhood not found"
        );
    }

    Ok(id)
}

/// Resolve a block token to an id
///
/// Precedence: explicit `idcuadra`, then the manual `cuadra_map` table,
/// then name lookup scoped to the mapping's project (and neighborhood,
/// when supplied).
pub async fn resolve_block_id(
    conn: &mut SqliteConnection,
    mapping: &ImportMapping,
    cache: &mut LookupCache,
    reference: Option<&str>,
) -> Result<Option<i64>> {
    if let Some(id) = mapping.block_id {
        return Ok(Some(id));
    }

    let reference = match reference {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(None),
    };

    let normalized = normalize_ref(reference);

    for (token, id) in &mapping.block_map {
        if normalize_ref(token) == normalized {
            tracing::debug!(token = %token, id, "block id from manual mapping");
            return Ok(Some(*id));
        }
    }

    let cache_key = match mapping.neighborhood_id {
        Some(nid) => format!("{}:{}:{}", mapping.project_id, nid, normalized),
        None => format!("{}:{}", mapping.project_id, normalized),
    };

    if let Some(cached) = cache.blocks.get(&cache_key) {
        tracing::debug!(key = %cache_key, "block id from cache");
        return Ok(*cached);
    }

    let id = db::blocks::find_id_in_project(
        conn,
        mapping.project_id,
        mapping.neighborhood_id,
        &normalized,
    )
    .await?;
    cache.blocks.insert(cache_key, id);

    if id.is_none() {
        tracing::warn!(
            reference = %reference,
            normalized = %normalized,
            project_id = mapping.project_id,
            "block not found"
        );
    }

    Ok(id)
}

/// Does a same-named entity already exist at the classified feature's scope?
pub async fn has_conflict(
    conn: &mut SqliteConnection,
    mapping: &ImportMapping,
    cache: &mut LookupCache,
    classified: &Classified,
) -> Result<bool> {
    match classified {
        Classified::Project { name } => {
            Ok(db::projects::find_summary_by_name(conn, name).await?.is_some())
        }
        Classified::Neighborhood { name } => Ok(db::neighborhoods::find_summary_by_name(
            conn,
            mapping.project_id,
            name,
        )
        .await?
        .is_some()),
        Classified::Block {
            name,
            neighborhood_ref,
        } => {
            match resolve_neighborhood_id(conn, mapping, cache, neighborhood_ref.as_deref()).await? {
                Some(nid) => Ok(db::blocks::find_summary_by_name(conn, nid, name).await?.is_some()),
                None => Ok(false),
            }
        }
        Classified::Lot { number, block_ref } => {
            match resolve_block_id(conn, mapping, cache, block_ref.as_deref()).await? {
                Some(bid) => {
                    Ok(db::lots::find_summary_by_number(conn, bid, number).await?.is_some())
                }
                None => Ok(false),
            }
        }
        Classified::Unrecognized { .. } => Ok(false),
    }
}

/// One entry of the conflict report
#[derive(Debug, Clone, Serialize)]
pub struct ConflictItem {
    pub index: usize,
    pub name: String,
    pub has_polygon: bool,
    pub id: i64,
}

/// Existing entities an import file would touch, grouped per category
#[derive(Debug, Default, Serialize)]
pub struct ConflictReport {
    pub project: Option<ConflictItem>,
    pub neighborhoods: Vec<ConflictItem>,
    pub blocks: Vec<ConflictItem>,
    pub lots: Vec<ConflictItem>,
}

impl ConflictReport {
    pub fn total(&self) -> usize {
        usize::from(self.project.is_some())
            + self.neighborhoods.len()
            + self.blocks.len()
            + self.lots.len()
    }
}

/// Conflict pass over a classified feature list, no writes
pub async fn find_conflicts(
    conn: &mut SqliteConnection,
    mapping: &ImportMapping,
    classified: &[Classified],
) -> Result<ConflictReport> {
    let mut cache = LookupCache::default();
    let mut report = ConflictReport::default();

    for (index, item) in classified.iter().enumerate() {
        match item {
            Classified::Project { name } => {
                if let Some((id, has_polygon)) =
                    db::projects::find_summary_by_name(conn, name).await?
                {
                    report.project = Some(ConflictItem {
                        index,
                        name: name.clone(),
                        has_polygon,
                        id,
                    });
                }
            }
            Classified::Neighborhood { name } => {
                if let Some((id, has_polygon)) =
                    db::neighborhoods::find_summary_by_name(conn, mapping.project_id, name).await?
                {
                    report.neighborhoods.push(ConflictItem {
                        index,
                        name: name.clone(),
                        has_polygon,
                        id,
                    });
                }
            }
            Classified::Block {
                name,
                neighborhood_ref,
            } => {
                let nid =
                    resolve_neighborhood_id(conn, mapping, &mut cache, neighborhood_ref.as_deref())
                        .await?;
                if let Some(nid) = nid {
                    if let Some((id, has_polygon)) =
                        db::blocks::find_summary_by_name(conn, nid, name).await?
                    {
                        report.blocks.push(ConflictItem {
                            index,
                            name: name.clone(),
                            has_polygon,
                            id,
                        });
                    }
                }
            }
            Classified::Lot { number, block_ref } => {
                let bid = resolve_block_id(conn, mapping, &mut cache, block_ref.as_deref()).await?;
                if let Some(bid) = bid {
                    if let Some((id, has_polygon)) =
                        db::lots::find_summary_by_number(conn, bid, number).await?
                    {
                        report.lots.push(ConflictItem {
                            index,
                            name: number.clone(),
                            has_polygon,
                            id,
                        });
                    }
                }
            }
            Classified::Unrecognized { .. } => {}
        }
    }

    Ok(report)
}
