//! Fundraiser categories (soft-deleted).

use crowdfund_core::CategoryStatus;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{fetch_page, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub c_uuid: String,
    pub name: String,
    pub description: String,
    pub status: CategoryStatus,
    pub is_default: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for Category {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Category {
            c_uuid: row.try_get("c_uuid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            status: status_col(row, "status")?,
            is_default: row.try_get("is_default")?,
            is_deleted: row.try_get("is_deleted")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str =
    "SELECT c_uuid, name, description, status, is_default, is_deleted, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, category: &Category) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO categories
            (c_uuid, name, description, status, is_default, is_deleted, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&category.c_uuid)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.status.as_str())
    .bind(category.is_default)
    .bind(category.is_deleted)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Live (not soft-deleted) category by uuid.
pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, c_uuid: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(&format!(
        "{COLUMNS} FROM categories WHERE c_uuid = ?1 AND is_deleted = 0"
    ))
    .bind(c_uuid)
    .fetch_optional(exec)
    .await?;
    Ok(category)
}

/// Whether another live category already uses `name` (case-insensitive).
pub async fn name_taken<'e, E: SqliteExecutor<'e>>(
    exec: E,
    name: &str,
    except: Option<&str>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM categories
        WHERE  name = ?1 COLLATE NOCASE AND is_deleted = 0 AND c_uuid != COALESCE(?2, '')
        "#,
    )
    .bind(name)
    .bind(except)
    .fetch_one(exec)
    .await?;
    Ok(count > 0)
}

pub async fn update<'e, E: SqliteExecutor<'e>>(exec: E, category: &Category) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE categories
        SET    name = ?1, description = ?2, status = ?3, is_default = ?4, updated_at = ?5
        WHERE  c_uuid = ?6
        "#,
    )
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.status.as_str())
    .bind(category.is_default)
    .bind(category.updated_at)
    .bind(&category.c_uuid)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn soft_delete<'e, E: SqliteExecutor<'e>>(exec: E, c_uuid: &str, now: i64) -> Result<()> {
    sqlx::query("UPDATE categories SET is_deleted = 1, updated_at = ?1 WHERE c_uuid = ?2")
        .bind(now)
        .bind(c_uuid)
        .execute(exec)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub status: Option<CategoryStatus>,
    pub search: Option<String>,
}

/// Live categories only.
pub async fn list(
    pool: &SqlitePool,
    filter: &CategoryFilter,
    page: PageRequest,
) -> Result<Page<Category>> {
    fetch_page(pool, COLUMNS, "categories", "is_default DESC, name", page, |qb| {
        let mut w = Where::new(qb);
        w.eq("is_deleted", false);
        if let Some(status) = filter.status {
            w.eq("status", status.as_str().to_string());
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            w.search(&["name", "description"], term);
        }
    })
    .await
}
