//! Entity models for the sales hierarchy
//!
//! Projects own neighborhoods, neighborhoods own blocks, blocks own lots.
//! Rows are mapped by hand in the db modules (the polygon column is JSON
//! text), so these are plain structs rather than `FromRow` derives.

use crate::geo::Polygon;
use serde::Serialize;

/// Lot sale status values stored in `lots.status`
pub const LOT_STATUS_AVAILABLE: i64 = 0;
pub const LOT_STATUS_SOLD: i64 = 1;
pub const LOT_STATUS_RESERVED: i64 = 2;

/// Human label for a lot status, for map tooltips and exports
pub fn status_label(status: i64) -> &'static str {
    match status {
        LOT_STATUS_AVAILABLE => "Available",
        LOT_STATUS_SOLD => "Sold",
        LOT_STATUS_RESERVED => "Reserved",
        _ => "Unknown",
    }
}

/// Top-level development parcel
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub launch_date: Option<String>,
    pub lot_count: Option<i64>,
    pub photo_path: Option<String>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
}

/// Named sub-area of a project ("UV NNN" in surveyor data)
#[derive(Debug, Clone, Serialize)]
pub struct Neighborhood {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
}

/// Named sub-area of a neighborhood ("MZ NNN")
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub id: i64,
    pub neighborhood_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
}

/// Individually sellable parcel within a block
#[derive(Debug, Clone, Serialize)]
pub struct Lot {
    pub id: i64,
    pub project_id: i64,
    pub category_id: i64,
    pub block_id: i64,
    pub lot_number: String,
    pub location: String,
    pub area: String,
    pub down_payment: f64,
    pub monthly_payment: f64,
    pub sale_price: f64,
    pub status: i64,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
}

/// Lot category (pricing/display grouping within a project)
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(status_label(LOT_STATUS_AVAILABLE), "Available");
        assert_eq!(status_label(LOT_STATUS_SOLD), "Sold");
        assert_eq!(status_label(LOT_STATUS_RESERVED), "Reserved");
        assert_eq!(status_label(99), "Unknown");
    }
}
