//! FAQ entries shown on the public site (soft-deleted).

use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use super::{fetch_page, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Faq {
    pub faq_uuid: String,
    pub question: String,
    pub answer: String,
    pub sort_order: i64,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

const COLUMNS: &str =
    "SELECT faq_uuid, question, answer, sort_order, is_active, is_deleted, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, faq: &Faq) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO faqs
            (faq_uuid, question, answer, sort_order, is_active, is_deleted, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&faq.faq_uuid)
    .bind(&faq.question)
    .bind(&faq.answer)
    .bind(faq.sort_order)
    .bind(faq.is_active)
    .bind(faq.is_deleted)
    .bind(faq.created_at)
    .bind(faq.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, faq_uuid: &str) -> Result<Option<Faq>> {
    let faq = sqlx::query_as::<_, Faq>(&format!(
        "{COLUMNS} FROM faqs WHERE faq_uuid = ?1 AND is_deleted = 0"
    ))
    .bind(faq_uuid)
    .fetch_optional(exec)
    .await?;
    Ok(faq)
}

pub async fn update<'e, E: SqliteExecutor<'e>>(exec: E, faq: &Faq) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE faqs
        SET    question = ?1, answer = ?2, sort_order = ?3, is_active = ?4, updated_at = ?5
        WHERE  faq_uuid = ?6
        "#,
    )
    .bind(&faq.question)
    .bind(&faq.answer)
    .bind(faq.sort_order)
    .bind(faq.is_active)
    .bind(faq.updated_at)
    .bind(&faq.faq_uuid)
    .execute(exec)
    .await?;
    Ok(())
}

/// Returns `false` when there was no live FAQ to delete.
pub async fn soft_delete<'e, E: SqliteExecutor<'e>>(exec: E, faq_uuid: &str, now: i64) -> Result<bool> {
    let rows = sqlx::query(
        "UPDATE faqs SET is_deleted = 1, updated_at = ?1 WHERE faq_uuid = ?2 AND is_deleted = 0",
    )
    .bind(now)
    .bind(faq_uuid)
    .execute(exec)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

pub async fn list(
    pool: &SqlitePool,
    only_active: bool,
    search: Option<&str>,
    page: PageRequest,
) -> Result<Page<Faq>> {
    fetch_page(pool, COLUMNS, "faqs", "sort_order, created_at", page, |qb| {
        let mut w = Where::new(qb);
        w.eq("is_deleted", false);
        if only_active {
            w.eq("is_active", true);
        }
        if let Some(term) = search.filter(|t| !t.trim().is_empty()) {
            w.search(&["question", "answer"], term);
        }
    })
    .await
}
