//! Payouts: one per donation, carrying the owner's net amount.

use crowdfund_core::PayoutStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{decimal_col, fetch_page, json_col, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Payout {
    pub p_uuid: String,
    /// Originating donation.
    pub p_fk_d_uuid: String,
    /// Recipient (fund owner).
    pub p_fk_uc_uuid: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: PayoutStatus,
    /// Rejection reason lives under `reason`.
    pub meta: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for Payout {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Payout {
            p_uuid: row.try_get("p_uuid")?,
            p_fk_d_uuid: row.try_get("p_fk_d_uuid")?,
            p_fk_uc_uuid: row.try_get("p_fk_uc_uuid")?,
            amount: decimal_col(row, "amount")?,
            fee: decimal_col(row, "fee")?,
            status: status_col(row, "status")?,
            meta: json_col(row, "meta")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str =
    "SELECT p_uuid, p_fk_d_uuid, p_fk_uc_uuid, amount, fee, status, meta, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, payout: &Payout) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payouts
            (p_uuid, p_fk_d_uuid, p_fk_uc_uuid, amount, fee, status, meta, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&payout.p_uuid)
    .bind(&payout.p_fk_d_uuid)
    .bind(&payout.p_fk_uc_uuid)
    .bind(payout.amount.to_string())
    .bind(payout.fee.to_string())
    .bind(payout.status.as_str())
    .bind(serde_json::to_string(&payout.meta)?)
    .bind(payout.created_at)
    .bind(payout.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, p_uuid: &str) -> Result<Option<Payout>> {
    let payout = sqlx::query_as::<_, Payout>(&format!("{COLUMNS} FROM payouts WHERE p_uuid = ?1"))
        .bind(p_uuid)
        .fetch_optional(exec)
        .await?;
    Ok(payout)
}

pub async fn find_by_donation<'e, E: SqliteExecutor<'e>>(
    exec: E,
    d_uuid: &str,
) -> Result<Option<Payout>> {
    let payout = sqlx::query_as::<_, Payout>(&format!("{COLUMNS} FROM payouts WHERE p_fk_d_uuid = ?1"))
        .bind(d_uuid)
        .fetch_optional(exec)
        .await?;
    Ok(payout)
}

pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    exec: E,
    p_uuid: &str,
    status: PayoutStatus,
    meta: &Value,
    now: i64,
) -> Result<()> {
    sqlx::query("UPDATE payouts SET status = ?1, meta = ?2, updated_at = ?3 WHERE p_uuid = ?4")
        .bind(status.as_str())
        .bind(serde_json::to_string(meta)?)
        .bind(now)
        .bind(p_uuid)
        .execute(exec)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PayoutFilter {
    pub status: Option<PayoutStatus>,
    pub recipient: Option<String>,
}

pub async fn list(pool: &SqlitePool, filter: &PayoutFilter, page: PageRequest) -> Result<Page<Payout>> {
    fetch_page(pool, COLUMNS, "payouts", "created_at DESC, p_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(status) = filter.status {
            w.eq("status", status.as_str().to_string());
        }
        if let Some(recipient) = &filter.recipient {
            w.eq("p_fk_uc_uuid", recipient.clone());
        }
    })
    .await
}
