//! Database queries for lotmap-admin
//!
//! Every function takes `&mut SqliteConnection` so the same primitives run
//! on a pool connection for plain reads and on the transaction connection
//! during an import or editor save. Writes made earlier in a transaction
//! are therefore visible to later lookups in the same run.

pub mod blocks;
pub mod categories;
pub mod lots;
pub mod neighborhoods;
pub mod projects;

use lotmap_common::{Polygon, Result};
use serde::Serialize;

/// Minimal id/name pair for selector endpoints
#[derive(Debug, Clone, Serialize)]
pub struct EntityRef {
    pub id: i64,
    pub name: String,
}

/// Decode a TEXT polygon column value
pub(crate) fn polygon_from_column(raw: Option<String>) -> Result<Option<Polygon>> {
    raw.as_deref().map(Polygon::from_db_json).transpose()
}
