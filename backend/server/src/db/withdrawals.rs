//! Wallet-to-bank withdrawal requests.

use crowdfund_core::WithdrawalStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{decimal_col, fetch_page, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Withdrawal {
    pub w_uuid: String,
    pub w_fk_uc_uuid: String,
    pub amount: Decimal,
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub status: WithdrawalStatus,
    pub admin_note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for Withdrawal {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Withdrawal {
            w_uuid: row.try_get("w_uuid")?,
            w_fk_uc_uuid: row.try_get("w_fk_uc_uuid")?,
            amount: decimal_col(row, "amount")?,
            account_holder_name: row.try_get("account_holder_name")?,
            account_number: row.try_get("account_number")?,
            ifsc_code: row.try_get("ifsc_code")?,
            status: status_col(row, "status")?,
            admin_note: row.try_get("admin_note")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "SELECT w_uuid, w_fk_uc_uuid, amount, account_holder_name, account_number, \
                       ifsc_code, status, admin_note, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, withdrawal: &Withdrawal) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO withdrawals
            (w_uuid, w_fk_uc_uuid, amount, account_holder_name, account_number, ifsc_code,
             status, admin_note, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&withdrawal.w_uuid)
    .bind(&withdrawal.w_fk_uc_uuid)
    .bind(withdrawal.amount.to_string())
    .bind(&withdrawal.account_holder_name)
    .bind(&withdrawal.account_number)
    .bind(&withdrawal.ifsc_code)
    .bind(withdrawal.status.as_str())
    .bind(&withdrawal.admin_note)
    .bind(withdrawal.created_at)
    .bind(withdrawal.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, w_uuid: &str) -> Result<Option<Withdrawal>> {
    let withdrawal =
        sqlx::query_as::<_, Withdrawal>(&format!("{COLUMNS} FROM withdrawals WHERE w_uuid = ?1"))
            .bind(w_uuid)
            .fetch_optional(exec)
            .await?;
    Ok(withdrawal)
}

/// Whether the user already has a PENDING request.
pub async fn has_pending<'e, E: SqliteExecutor<'e>>(exec: E, u_uuid: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM withdrawals WHERE w_fk_uc_uuid = ?1 AND status = ?2")
            .bind(u_uuid)
            .bind(WithdrawalStatus::Pending.as_str())
            .fetch_one(exec)
            .await?;
    Ok(count > 0)
}

pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    exec: E,
    w_uuid: &str,
    status: WithdrawalStatus,
    admin_note: Option<&str>,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE withdrawals
        SET    status = ?1, admin_note = COALESCE(?2, admin_note), updated_at = ?3
        WHERE  w_uuid = ?4
        "#,
    )
    .bind(status.as_str())
    .bind(admin_note)
    .bind(now)
    .bind(w_uuid)
    .execute(exec)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct WithdrawalFilter {
    pub status: Option<WithdrawalStatus>,
    pub user: Option<String>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &WithdrawalFilter,
    page: PageRequest,
) -> Result<Page<Withdrawal>> {
    fetch_page(pool, COLUMNS, "withdrawals", "created_at DESC, w_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(status) = filter.status {
            w.eq("status", status.as_str().to_string());
        }
        if let Some(user) = &filter.user {
            w.eq("w_fk_uc_uuid", user.clone());
        }
    })
    .await
}
