//! lotmap-admin - back-office service
//!
//! REST API for the land-development sales back office: project /
//! neighborhood / block / lot administration, map data, the polygon
//! editor, and the GeoJSON bulk importer.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lotmap_admin::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting lotmap-admin");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let root_folder = lotmap_common::config::resolve_root_folder();
    let db_path = lotmap_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db_pool = lotmap_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    let state = AppState::new(db_pool);
    let app = lotmap_admin::build_router(state);

    let port = lotmap_common::config::resolve_port();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
