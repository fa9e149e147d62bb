//! Security reports submitted from the public site.

use crowdfund_core::ReportStatus;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{fetch_page, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct SecurityReport {
    pub r_uuid: String,
    pub reporter_email: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: ReportStatus,
    pub admin_note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for SecurityReport {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(SecurityReport {
            r_uuid: row.try_get("r_uuid")?,
            reporter_email: row.try_get("reporter_email")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            severity: row.try_get("severity")?,
            status: status_col(row, "status")?,
            admin_note: row.try_get("admin_note")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "SELECT r_uuid, reporter_email, title, description, severity, status, \
                       admin_note, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, report: &SecurityReport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO security_reports
            (r_uuid, reporter_email, title, description, severity, status, admin_note,
             created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&report.r_uuid)
    .bind(&report.reporter_email)
    .bind(&report.title)
    .bind(&report.description)
    .bind(&report.severity)
    .bind(report.status.as_str())
    .bind(&report.admin_note)
    .bind(report.created_at)
    .bind(report.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Returns `false` when the report does not exist.
pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    exec: E,
    r_uuid: &str,
    status: ReportStatus,
    admin_note: Option<&str>,
    now: i64,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE security_reports
        SET    status = ?1, admin_note = COALESCE(?2, admin_note), updated_at = ?3
        WHERE  r_uuid = ?4
        "#,
    )
    .bind(status.as_str())
    .bind(admin_note)
    .bind(now)
    .bind(r_uuid)
    .execute(exec)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, r_uuid: &str) -> Result<Option<SecurityReport>> {
    let report = sqlx::query_as::<_, SecurityReport>(&format!(
        "{COLUMNS} FROM security_reports WHERE r_uuid = ?1"
    ))
    .bind(r_uuid)
    .fetch_optional(exec)
    .await?;
    Ok(report)
}

pub async fn list(
    pool: &SqlitePool,
    status: Option<ReportStatus>,
    page: PageRequest,
) -> Result<Page<SecurityReport>> {
    fetch_page(pool, COLUMNS, "security_reports", "created_at DESC, r_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(status) = status {
            w.eq("status", status.as_str().to_string());
        }
    })
    .await
}
