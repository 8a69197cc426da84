//! Category queries

use lotmap_common::{models::Category, Result};
use serde::Deserialize;
use sqlx::SqliteConnection;

/// Fields accepted when creating or updating a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub project_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

type CategoryRow = (i64, i64, String, Option<String>, Option<String>, i64);

fn from_row(row: CategoryRow) -> Category {
    Category {
        id: row.0,
        project_id: row.1,
        name: row.2,
        description: row.3,
        color: row.4,
        active: row.5 != 0,
    }
}

const COLUMNS: &str = "id, project_id, name, description, color, active";

pub async fn list_by_project(
    conn: &mut SqliteConnection,
    project_id: i64,
    only_active: bool,
) -> Result<Vec<Category>> {
    let sql = if only_active {
        format!("SELECT {COLUMNS} FROM categories WHERE project_id = ? AND active = 1 ORDER BY name")
    } else {
        format!("SELECT {COLUMNS} FROM categories WHERE project_id = ? ORDER BY name")
    };

    let rows = sqlx::query_as::<_, CategoryRow>(&sql)
        .bind(project_id)
        .fetch_all(conn)
        .await?;

    Ok(rows.into_iter().map(from_row).collect())
}

/// Active categories across every project, for the editor's initial data
pub async fn list_active(conn: &mut SqliteConnection) -> Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE active = 1 ORDER BY project_id, name"
    ))
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(from_row).collect())
}

/// Default category for imports: the project's first by id
pub async fn first_for_project(
    conn: &mut SqliteConnection,
    project_id: i64,
) -> Result<Option<Category>> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE project_id = ? ORDER BY id LIMIT 1"
    ))
    .bind(project_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(from_row))
}

pub async fn create(conn: &mut SqliteConnection, input: &CategoryInput) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO categories (project_id, name, description, color, active) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(input.project_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.color)
    .bind(input.active as i64)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(conn: &mut SqliteConnection, id: i64, input: &CategoryInput) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE categories
        SET project_id = ?, name = ?, description = ?, color = ?, active = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(input.project_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.color)
    .bind(input.active as i64)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
