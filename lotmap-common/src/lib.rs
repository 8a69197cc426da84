//! # LotMap Common Library
//!
//! Shared code for the LotMap back office:
//! - Database initialization and schema
//! - Entity models (projects, neighborhoods, blocks, lots, categories)
//! - Geometry types and the GeoJSON boundary conversion
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod models;

pub use error::{Error, Result};
pub use geo::{GeoPoint, Polygon};
