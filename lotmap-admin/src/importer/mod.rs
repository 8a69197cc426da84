//! GeoJSON import pipeline
//!
//! Surveyor-exported GeoJSON arrives with wildly inconsistent property
//! naming. The pipeline canonicalizes properties ([`normalize`]), assigns
//! each feature a place in the project → neighborhood → block → lot
//! hierarchy ([`classify`]), checks the result against persisted records
//! ([`conflict`]), applies the operator's conflict policy ([`plan`]), and
//! writes parents before children inside one transaction ([`writer`]).

pub mod classify;
pub mod conflict;
pub mod normalize;
pub mod plan;
pub mod writer;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entity mapping supplied by the import wizard
///
/// Wire field names (`idproyecto`, `idbarrio`, `idcuadra`, `cuadra_map`)
/// are the established wizard contract. Explicit ids bypass name lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportMapping {
    /// Target project; all relative references resolve inside it
    #[serde(rename = "idproyecto")]
    pub project_id: i64,
    /// Optional explicit neighborhood override
    #[serde(rename = "idbarrio", default)]
    pub neighborhood_id: Option<i64>,
    /// Optional explicit block override
    #[serde(rename = "idcuadra", default)]
    pub block_id: Option<i64>,
    /// Manual token → block id table
    #[serde(rename = "cuadra_map", default)]
    pub block_map: HashMap<String, i64>,
}

/// How conflicting features are handled during an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    OverwriteAll,
    SkipAll,
    Ask,
}

/// Per-feature decisions under [`ConflictPolicy::Ask`], keyed by feature index
pub type ConflictDecisions = HashMap<usize, String>;

/// Marker value opting a conflicting feature into processing
pub const DECISION_OVERWRITE: &str = "overwrite";

/// Created / updated / skipped counters for one entity category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

/// Result of one import run
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub project: CategoryCounts,
    pub neighborhoods: CategoryCounts,
    pub blocks: CategoryCounts,
    pub lots: CategoryCounts,
    /// Per-feature failures that were recorded rather than aborting the run
    pub errors: Vec<String>,
}
