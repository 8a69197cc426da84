//! Block queries

use super::EntityRef;
use lotmap_common::{models::Block, Polygon, Result};
use sqlx::{Row, SqliteConnection};

const COLUMNS: &str = "id, neighborhood_id, name, polygon";

/// A block together with the names needed to label its lots
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub id: i64,
    pub name: String,
    pub neighborhood_id: i64,
    pub neighborhood_name: String,
    pub project_id: i64,
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Block> {
    Ok(Block {
        id: row.try_get("id")?,
        neighborhood_id: row.try_get("neighborhood_id")?,
        name: row.try_get("name")?,
        polygon: super::polygon_from_column(row.try_get("polygon")?)?,
    })
}

pub async fn list_refs_by_neighborhood(
    conn: &mut SqliteConnection,
    neighborhood_id: i64,
) -> Result<Vec<EntityRef>> {
    let rows = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, name FROM blocks WHERE neighborhood_id = ? ORDER BY name",
    )
    .bind(neighborhood_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|(id, name)| EntityRef { id, name }).collect())
}

pub async fn list_with_polygon_by_project(
    conn: &mut SqliteConnection,
    project_id: i64,
) -> Result<Vec<Block>> {
    let rows = sqlx::query(
        r#"
        SELECT b.id, b.neighborhood_id, b.name, b.polygon
        FROM blocks b
        JOIN neighborhoods n ON n.id = b.neighborhood_id
        WHERE n.project_id = ? AND b.polygon IS NOT NULL
        ORDER BY b.name
        "#,
    )
    .bind(project_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(from_row).collect()
}

pub async fn find_by_name(
    conn: &mut SqliteConnection,
    neighborhood_id: i64,
    name: &str,
) -> Result<Option<Block>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM blocks WHERE neighborhood_id = ? AND name = ?"
    ))
    .bind(neighborhood_id)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(from_row).transpose()
}

/// (id, has_polygon) by scoped name, for conflict reports
pub async fn find_summary_by_name(
    conn: &mut SqliteConnection,
    neighborhood_id: i64,
    name: &str,
) -> Result<Option<(i64, bool)>> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT id, polygon IS NOT NULL FROM blocks WHERE neighborhood_id = ? AND name = ?",
    )
    .bind(neighborhood_id)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(id, has_polygon)| (id, has_polygon != 0)))
}

/// Block id by name within a project, optionally narrowed to one neighborhood
pub async fn find_id_in_project(
    conn: &mut SqliteConnection,
    project_id: i64,
    neighborhood_id: Option<i64>,
    name: &str,
) -> Result<Option<i64>> {
    let id = match neighborhood_id {
        Some(nid) => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT b.id FROM blocks b
                JOIN neighborhoods n ON n.id = b.neighborhood_id
                WHERE n.project_id = ? AND n.id = ? AND b.name = ?
                "#,
            )
            .bind(project_id)
            .bind(nid)
            .bind(name)
            .fetch_optional(conn)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT b.id FROM blocks b
                JOIN neighborhoods n ON n.id = b.neighborhood_id
                WHERE n.project_id = ? AND b.name = ?
                "#,
            )
            .bind(project_id)
            .bind(name)
            .fetch_optional(conn)
            .await?
        }
    };

    Ok(id)
}

pub async fn find_context(
    conn: &mut SqliteConnection,
    block_id: i64,
) -> Result<Option<BlockContext>> {
    let row = sqlx::query_as::<_, (i64, String, i64, String, i64)>(
        r#"
        SELECT b.id, b.name, n.id, n.name, n.project_id
        FROM blocks b
        JOIN neighborhoods n ON n.id = b.neighborhood_id
        WHERE b.id = ?
        "#,
    )
    .bind(block_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(id, name, neighborhood_id, neighborhood_name, project_id)| BlockContext {
        id,
        name,
        neighborhood_id,
        neighborhood_name,
        project_id,
    }))
}

pub async fn create(
    conn: &mut SqliteConnection,
    neighborhood_id: i64,
    name: &str,
    polygon: Option<&Polygon>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO blocks (neighborhood_id, name, polygon) VALUES (?, ?, ?)")
        .bind(neighborhood_id)
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
        "UPDATE blocks SET polygon = ?, updated_at = datetime('now') WHERE id = ? AND polygon IS NULL",
    )
    .bind(polygon.to_db_json())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the polygon unconditionally (explicit manual edit)
pub async fn set_polygon(conn: &mut SqliteConnection, id: i64, polygon: &Polygon) -> Result<bool> {
    let result = sqlx::query("UPDATE blocks SET polygon = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(polygon.to_db_json())
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// (total, with_polygon) counts for the import overview
pub async fn stats_by_project(conn: &mut SqliteConnection, project_id: i64) -> Result<(i64, i64)> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COUNT(b.polygon)
        FROM blocks b
        JOIN neighborhoods n ON n.id = b.neighborhood_id
        WHERE n.project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_one(conn)
    .await?;

    Ok(row)
}
