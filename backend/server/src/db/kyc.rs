//! Identity-verification submissions.

use crowdfund_core::KycStatus;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{fetch_page, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct KycRecord {
    pub k_uuid: String,
    pub k_fk_uc_uuid: String,
    pub full_name: String,
    pub document_type: String,
    pub document_number: String,
    pub status: KycStatus,
    pub reject_reason: Option<String>,
    pub reviewed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for KycRecord {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(KycRecord {
            k_uuid: row.try_get("k_uuid")?,
            k_fk_uc_uuid: row.try_get("k_fk_uc_uuid")?,
            full_name: row.try_get("full_name")?,
            document_type: row.try_get("document_type")?,
            document_number: row.try_get("document_number")?,
            status: status_col(row, "status")?,
            reject_reason: row.try_get("reject_reason")?,
            reviewed_at: row.try_get("reviewed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "SELECT k_uuid, k_fk_uc_uuid, full_name, document_type, document_number, \
                       status, reject_reason, reviewed_at, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, record: &KycRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO kyc_records
            (k_uuid, k_fk_uc_uuid, full_name, document_type, document_number, status,
             reject_reason, reviewed_at, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&record.k_uuid)
    .bind(&record.k_fk_uc_uuid)
    .bind(&record.full_name)
    .bind(&record.document_type)
    .bind(&record.document_number)
    .bind(record.status.as_str())
    .bind(&record.reject_reason)
    .bind(record.reviewed_at)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, k_uuid: &str) -> Result<Option<KycRecord>> {
    let record = sqlx::query_as::<_, KycRecord>(&format!("{COLUMNS} FROM kyc_records WHERE k_uuid = ?1"))
        .bind(k_uuid)
        .fetch_optional(exec)
        .await?;
    Ok(record)
}

/// Most recent submission of a user.
pub async fn latest_for_user<'e, E: SqliteExecutor<'e>>(
    exec: E,
    u_uuid: &str,
) -> Result<Option<KycRecord>> {
    let record = sqlx::query_as::<_, KycRecord>(&format!(
        "{COLUMNS} FROM kyc_records WHERE k_fk_uc_uuid = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
    ))
    .bind(u_uuid)
    .fetch_optional(exec)
    .await?;
    Ok(record)
}

pub async fn set_review<'e, E: SqliteExecutor<'e>>(
    exec: E,
    k_uuid: &str,
    status: KycStatus,
    reject_reason: Option<&str>,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE kyc_records
        SET    status = ?1, reject_reason = ?2, reviewed_at = ?3, updated_at = ?3
        WHERE  k_uuid = ?4
        "#,
    )
    .bind(status.as_str())
    .bind(reject_reason)
    .bind(now)
    .bind(k_uuid)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn list(
    pool: &SqlitePool,
    status: Option<KycStatus>,
    page: PageRequest,
) -> Result<Page<KycRecord>> {
    fetch_page(pool, COLUMNS, "kyc_records", "created_at DESC, k_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(status) = status {
            w.eq("status", status.as_str().to_string());
        }
    })
    .await
}
