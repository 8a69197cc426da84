//! Project queries

use super::EntityRef;
use lotmap_common::{models::Project, Polygon, Result};
use serde::Deserialize;
use sqlx::{Row, SqliteConnection};

/// Fields accepted when creating or updating a project
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub launch_date: Option<String>,
    #[serde(default)]
    pub lot_count: Option<i64>,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

const COLUMNS: &str =
    "id, name, description, location, launch_date, lot_count, photo_path, active, polygon";

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        launch_date: row.try_get("launch_date")?,
        lot_count: row.try_get("lot_count")?,
        photo_path: row.try_get("photo_path")?,
        active: row.try_get::<i64, _>("active")? != 0,
        polygon: super::polygon_from_column(row.try_get("polygon")?)?,
    })
}

/// List projects, newest first, optionally filtered by a name substring
pub async fn list(conn: &mut SqliteConnection, search: Option<&str>) -> Result<Vec<Project>> {
    let rows = match search {
        Some(needle) => {
            sqlx::query(&format!(
                "SELECT {COLUMNS} FROM projects WHERE name LIKE ? ORDER BY created_at DESC"
            ))
            .bind(format!("%{}%", needle))
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC"))
                .fetch_all(&mut *conn)
                .await?
        }
    };

    rows.iter().map(from_row).collect()
}

/// Projects as id/name pairs for selectors
pub async fn list_refs(conn: &mut SqliteConnection, only_active: bool) -> Result<Vec<EntityRef>> {
    let sql = if only_active {
        "SELECT id, name FROM projects WHERE active = 1 ORDER BY name"
    } else {
        "SELECT id, name FROM projects ORDER BY name"
    };

    let rows = sqlx::query_as::<_, (i64, String)>(sql).fetch_all(conn).await?;

    Ok(rows.into_iter().map(|(id, name)| EntityRef { id, name }).collect())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM projects WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Name lookup; case-insensitive via the column's NOCASE collation
pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM projects WHERE name = ?"))
        .bind(name)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// (id, has_polygon) by name, for conflict reports
pub async fn find_summary_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<(i64, bool)>> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT id, polygon IS NOT NULL FROM projects WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(id, has_polygon)| (id, has_polygon != 0)))
}

pub async fn create(conn: &mut SqliteConnection, input: &ProjectInput) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO projects (name, description, location, launch_date, lot_count, photo_path, active)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.location)
    .bind(&input.launch_date)
    .bind(input.lot_count)
    .bind(&input.photo_path)
    .bind(input.active as i64)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(conn: &mut SqliteConnection, id: i64, input: &ProjectInput) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET name = ?, description = ?, location = ?, launch_date = ?,
            lot_count = ?, photo_path = ?, active = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.location)
    .bind(&input.launch_date)
    .bind(input.lot_count)
    .bind(&input.photo_path)
    .bind(input.active as i64)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Fill the polygon only when none is stored yet ("first write wins")
pub async fn set_polygon_if_null(
    conn: &mut SqliteConnection,
    id: i64,
    polygon: &Polygon,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE projects SET polygon = ?, updated_at = datetime('now') WHERE id = ? AND polygon IS NULL",
    )
    .bind(polygon.to_db_json())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
