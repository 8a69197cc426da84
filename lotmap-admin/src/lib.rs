//! lotmap-admin library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod importer;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health::routes())
        .merge(api::projects::routes())
        .merge(api::neighborhoods::routes())
        .merge(api::blocks::routes())
        .merge(api::lots::routes())
        .merge(api::categories::routes())
        .merge(api::map::routes())
        .merge(api::editor::routes())
        .merge(api::import::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
