//! Neighborhood queries

use super::EntityRef;
use lotmap_common::{models::Neighborhood, Polygon, Result};
use sqlx::{Row, SqliteConnection};

const COLUMNS: &str = "id, project_id, name, polygon";

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Neighborhood> {
    Ok(Neighborhood {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        name: row.try_get("name")?,
        polygon: super::polygon_from_column(row.try_get("polygon")?)?,
    })
}

pub async fn list_refs_by_project(
    conn: &mut SqliteConnection,
    project_id: i64,
) -> Result<Vec<EntityRef>> {
    let rows = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, name FROM neighborhoods WHERE project_id = ? ORDER BY name",
    )
    .bind(project_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|(id, name)| EntityRef { id, name }).collect())
}

pub async fn list_with_polygon_by_project(
    conn: &mut SqliteConnection,
    project_id: i64,
) -> Result<Vec<Neighborhood>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM neighborhoods WHERE project_id = ? AND polygon IS NOT NULL ORDER BY name"
    ))
    .bind(project_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(from_row).collect()
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Neighborhood>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM neighborhoods WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

pub async fn find_by_name(
    conn: &mut SqliteConnection,
    project_id: i64,
    name: &str,
) -> Result<Option<Neighborhood>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM neighborhoods WHERE project_id = ? AND name = ?"
    ))
    .bind(project_id)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(from_row).transpose()
}

pub async fn find_id_by_name(
    conn: &mut SqliteConnection,
    project_id: i64,
    name: &str,
) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM neighborhoods WHERE project_id = ? AND name = ?",
    )
    .bind(project_id)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// (id, has_polygon) by scoped name, for conflict reports
pub async fn find_summary_by_name(
    conn: &mut SqliteConnection,
    project_id: i64,
    name: &str,
) -> Result<Option<(i64, bool)>> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT id, polygon IS NOT NULL FROM neighborhoods WHERE project_id = ? AND name = ?",
    )
    .bind(project_id)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(id, has_polygon)| (id, has_polygon != 0)))
}

pub async fn create(
    conn: &mut SqliteConnection,
    project_id: i64,
    name: &str,
    polygon: Option<&Polygon>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO neighborhoods (project_id, name, polygon) VALUES (?, ?, ?)")
        .bind(project_id)
        .bind(name)
        .bind(polygon.map(Polygon::to_db_json))
        .execute(conn)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Fill the polygon only when none is stored yet
pub async fn set_polygon_if_null(
    conn: &mut SqliteConnection,
    id: i64,
    polygon: &Polygon,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE neighborhoods SET polygon = ?, updated_at = datetime('now') WHERE id = ? AND polygon IS NULL",
    )
    .bind(polygon.to_db_json())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the polygon unconditionally (explicit manual edit)
pub async fn set_polygon(conn: &mut SqliteConnection, id: i64, polygon: &Polygon) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE neighborhoods SET polygon = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(polygon.to_db_json())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM neighborhoods WHERE id = ?)")
        .bind(id)
        .fetch_one(conn)
        .await?;

    Ok(found != 0)
}

/// (total, with_polygon) counts for the import overview
pub async fn stats_by_project(conn: &mut SqliteConnection, project_id: i64) -> Result<(i64, i64)> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(polygon) FROM neighborhoods WHERE project_id = ?",
    )
    .bind(project_id)
    .fetch_one(conn)
    .await?;

    Ok(row)
}
