//! Donations and their fee split.

use crowdfund_core::{round_money, DonationStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{decimal_col, fetch_page, json_col, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Donation {
    pub d_uuid: String,
    /// Donor; `None` for unauthenticated donations.
    pub d_fk_uc_uuid: Option<String>,
    pub d_fk_f_uuid: String,
    /// Gross amount.
    pub amount: Decimal,
    pub platform_fee: Decimal,
    /// Net amount paid out to the fund owner.
    pub amount_to_owner: Decimal,
    pub is_anonymous: bool,
    pub status: DonationStatus,
    /// Free-form; admin fraud reasons live under `fraud_reason`.
    pub meta: Value,
    pub payment_intent_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Donation {
    /// Copy safe to show on a public fund page: anonymous donors lose their id.
    pub fn public_view(mut self) -> Self {
        if self.is_anonymous {
            self.d_fk_uc_uuid = None;
        }
        self.meta = Value::Object(Default::default());
        self.payment_intent_id = None;
        self
    }
}

impl<'r> FromRow<'r, SqliteRow> for Donation {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Donation {
            d_uuid: row.try_get("d_uuid")?,
            d_fk_uc_uuid: row.try_get("d_fk_uc_uuid")?,
            d_fk_f_uuid: row.try_get("d_fk_f_uuid")?,
            amount: decimal_col(row, "amount")?,
            platform_fee: decimal_col(row, "platform_fee")?,
            amount_to_owner: decimal_col(row, "amount_to_owner")?,
            is_anonymous: row.try_get("is_anonymous")?,
            status: status_col(row, "status")?,
            meta: json_col(row, "meta")?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "SELECT d_uuid, d_fk_uc_uuid, d_fk_f_uuid, amount, platform_fee, amount_to_owner, \
                       is_anonymous, status, meta, payment_intent_id, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, donation: &Donation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO donations
            (d_uuid, d_fk_uc_uuid, d_fk_f_uuid, amount, platform_fee, amount_to_owner,
             is_anonymous, status, meta, payment_intent_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&donation.d_uuid)
    .bind(&donation.d_fk_uc_uuid)
    .bind(&donation.d_fk_f_uuid)
    .bind(donation.amount.to_string())
    .bind(donation.platform_fee.to_string())
    .bind(donation.amount_to_owner.to_string())
    .bind(donation.is_anonymous)
    .bind(donation.status.as_str())
    .bind(serde_json::to_string(&donation.meta)?)
    .bind(&donation.payment_intent_id)
    .bind(donation.created_at)
    .bind(donation.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, d_uuid: &str) -> Result<Option<Donation>> {
    let donation = sqlx::query_as::<_, Donation>(&format!("{COLUMNS} FROM donations WHERE d_uuid = ?1"))
        .bind(d_uuid)
        .fetch_optional(exec)
        .await?;
    Ok(donation)
}

pub async fn find_by_payment_intent<'e, E: SqliteExecutor<'e>>(
    exec: E,
    payment_intent_id: &str,
) -> Result<Option<Donation>> {
    let donation = sqlx::query_as::<_, Donation>(&format!(
        "{COLUMNS} FROM donations WHERE payment_intent_id = ?1"
    ))
    .bind(payment_intent_id)
    .fetch_optional(exec)
    .await?;
    Ok(donation)
}

pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    exec: E,
    d_uuid: &str,
    status: DonationStatus,
    meta: &Value,
    now: i64,
) -> Result<()> {
    sqlx::query("UPDATE donations SET status = ?1, meta = ?2, updated_at = ?3 WHERE d_uuid = ?4")
        .bind(status.as_str())
        .bind(serde_json::to_string(meta)?)
        .bind(now)
        .bind(d_uuid)
        .execute(exec)
        .await?;
    Ok(())
}

/// Sum of SUCCESS donation amounts for a fund.
pub async fn raised_total<'e, E: SqliteExecutor<'e>>(exec: E, f_uuid: &str) -> Result<Decimal> {
    let amounts: Vec<String> =
        sqlx::query_scalar("SELECT amount FROM donations WHERE d_fk_f_uuid = ?1 AND status = ?2")
            .bind(f_uuid)
            .bind(DonationStatus::Success.as_str())
            .fetch_all(exec)
            .await?;

    // Amounts are written by this service; an unparsable row is skipped, not fatal.
    let total = amounts
        .iter()
        .filter_map(|a| a.parse::<Decimal>().ok())
        .sum::<Decimal>();
    Ok(round_money(total))
}

#[derive(Debug, Clone, Default)]
pub struct DonationFilter {
    pub status: Option<DonationStatus>,
    pub fund: Option<String>,
    pub donor: Option<String>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &DonationFilter,
    page: PageRequest,
) -> Result<Page<Donation>> {
    fetch_page(pool, COLUMNS, "donations", "created_at DESC, d_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(status) = filter.status {
            w.eq("status", status.as_str().to_string());
        }
        if let Some(fund) = &filter.fund {
            w.eq("d_fk_f_uuid", fund.clone());
        }
        if let Some(donor) = &filter.donor {
            w.eq("d_fk_uc_uuid", donor.clone());
        }
    })
    .await
}
