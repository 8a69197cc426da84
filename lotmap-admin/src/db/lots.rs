//! Lot queries

use lotmap_common::{models::Lot, Polygon, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection};

const COLUMNS: &str = "id, project_id, category_id, block_id, lot_number, location, area, \
                       down_payment, monthly_payment, sale_price, status, active, polygon";

/// Fields accepted when creating a lot
#[derive(Debug, Clone, Deserialize)]
pub struct LotInput {
    pub project_id: i64,
    pub category_id: i64,
    pub block_id: i64,
    pub lot_number: String,
    pub location: String,
    #[serde(default = "default_area")]
    pub area: String,
    #[serde(default)]
    pub down_payment: f64,
    #[serde(default)]
    pub monthly_payment: f64,
    #[serde(default)]
    pub sale_price: f64,
    #[serde(default)]
    pub status: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_area() -> String {
    "0".to_string()
}

fn default_active() -> bool {
    true
}

/// Per-project lot counters for the map panel
#[derive(Debug, Clone, Serialize)]
pub struct LotCounters {
    pub total: i64,
    pub available: i64,
    pub sold: i64,
    pub reserved: i64,
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lot> {
    Ok(Lot {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        category_id: row.try_get("category_id")?,
        block_id: row.try_get("block_id")?,
        lot_number: row.try_get("lot_number")?,
        location: row.try_get("location")?,
        area: row.try_get("area")?,
        down_payment: row.try_get("down_payment")?,
        monthly_payment: row.try_get("monthly_payment")?,
        sale_price: row.try_get("sale_price")?,
        status: row.try_get("status")?,
        active: row.try_get::<i64, _>("active")? != 0,
        polygon: super::polygon_from_column(row.try_get("polygon")?)?,
    })
}

/// List lots, optionally filtered by project and location substring
pub async fn list(
    conn: &mut SqliteConnection,
    project_id: Option<i64>,
    location: Option<&str>,
) -> Result<Vec<Lot>> {
    let mut sql = format!("SELECT {COLUMNS} FROM lots WHERE 1 = 1");
    if project_id.is_some() {
        sql.push_str(" AND project_id = ?");
    }
    if location.is_some() {
        sql.push_str(" AND location LIKE ?");
    }
    sql.push_str(" ORDER BY location");

    let mut query = sqlx::query(&sql);
    if let Some(pid) = project_id {
        query = query.bind(pid);
    }
    if let Some(needle) = location {
        query = query.bind(format!("%{}%", needle));
    }

    let rows = query.fetch_all(conn).await?;
    rows.iter().map(from_row).collect()
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Lot>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM lots WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// (id, has_polygon) by scoped number, for conflict reports
pub async fn find_summary_by_number(
    conn: &mut SqliteConnection,
    block_id: i64,
    lot_number: &str,
) -> Result<Option<(i64, bool)>> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT id, polygon IS NOT NULL FROM lots WHERE block_id = ? AND lot_number = ?",
    )
    .bind(block_id)
    .bind(lot_number)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(id, has_polygon)| (id, has_polygon != 0)))
}

pub async fn create(
    conn: &mut SqliteConnection,
    input: &LotInput,
    polygon: Option<&Polygon>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO lots (project_id, category_id, block_id, lot_number, location, area,
                          down_payment, monthly_payment, sale_price, status, active, polygon)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.project_id)
    .bind(input.category_id)
    .bind(input.block_id)
    .bind(&input.lot_number)
    .bind(&input.location)
    .bind(&input.area)
    .bind(input.down_payment)
    .bind(input.monthly_payment)
    .bind(input.sale_price)
    .bind(input.status)
    .bind(input.active as i64)
    .bind(polygon.map(Polygon::to_db_json))
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(conn: &mut SqliteConnection, id: i64, input: &LotInput) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE lots
        SET project_id = ?, category_id = ?, block_id = ?, lot_number = ?, location = ?,
            area = ?, down_payment = ?, monthly_payment = ?, sale_price = ?, status = ?,
            active = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(input.project_id)
    .bind(input.category_id)
    .bind(input.block_id)
    .bind(&input.lot_number)
    .bind(&input.location)
    .bind(&input.area)
    .bind(input.down_payment)
    .bind(input.monthly_payment)
    .bind(input.sale_price)
    .bind(input.status)
    .bind(input.active as i64)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM lots WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Flip the active flag; returns the new value, or None when the lot is missing
pub async fn toggle_active(conn: &mut SqliteConnection, id: i64) -> Result<Option<bool>> {
    let result = sqlx::query(
        "UPDATE lots SET active = NOT active, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let active = sqlx::query_scalar::<_, i64>("SELECT active FROM lots WHERE id = ?")
        .bind(id)
        .fetch_one(conn)
        .await?;

    Ok(Some(active != 0))
}

pub async fn list_with_polygon_by_project(
    conn: &mut SqliteConnection,
    project_id: i64,
) -> Result<Vec<Lot>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM lots WHERE project_id = ? AND active = 1 AND polygon IS NOT NULL ORDER BY location"
    ))
    .bind(project_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Fill the polygon only when none is stored yet
pub async fn set_polygon_if_null(
    conn: &mut SqliteConnection,
    id: i64,
    polygon: &Polygon,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE lots SET polygon = ?, updated_at = datetime('now') WHERE id = ? AND polygon IS NULL",
    )
    .bind(polygon.to_db_json())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the polygon unconditionally (explicit manual edit)
pub async fn set_polygon(conn: &mut SqliteConnection, id: i64, polygon: &Polygon) -> Result<bool> {
    let result = sqlx::query("UPDATE lots SET polygon = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(polygon.to_db_json())
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Sale-status counters; inactive lots only count once sold/reserved
pub async fn counters(conn: &mut SqliteConnection, project_id: i64) -> Result<LotCounters> {
    let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        r#"
        SELECT
            COUNT(CASE WHEN active = 1 THEN 1 END),
            COUNT(CASE WHEN status = 0 AND active = 1 THEN 1 END),
            COUNT(CASE WHEN status = 1 THEN 1 END),
            COUNT(CASE WHEN status = 2 THEN 1 END)
        FROM lots WHERE project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_one(conn)
    .await?;

    Ok(LotCounters {
        total: row.0,
        available: row.1,
        sold: row.2,
        reserved: row.3,
    })
}

/// (total, with_polygon) counts for the import overview
pub async fn stats_by_project(conn: &mut SqliteConnection, project_id: i64) -> Result<(i64, i64)> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(polygon) FROM lots WHERE project_id = ?",
    )
    .bind(project_id)
    .fetch_one(conn)
    .await?;

    Ok(row)
}
