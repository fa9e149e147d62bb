//! Fundraisers.

use crowdfund_core::FundStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{decimal_col, fetch_page, json_col, status_col, Page, PageRequest, Where};
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Fund {
    pub f_uuid: String,
    /// Owner (requester) of the fundraiser.
    pub f_fk_uc_uuid: String,
    pub f_fk_c_uuid: String,
    pub title: String,
    pub purpose: String,
    /// Goal amount.
    pub amount: Decimal,
    /// Unix seconds.
    pub deadline: i64,
    pub story: String,
    pub images: Vec<String>,
    pub video: Option<String>,
    pub status: FundStatus,
    pub pause_reason: Option<String>,
    pub approved_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> FromRow<'r, SqliteRow> for Fund {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Fund {
            f_uuid: row.try_get("f_uuid")?,
            f_fk_uc_uuid: row.try_get("f_fk_uc_uuid")?,
            f_fk_c_uuid: row.try_get("f_fk_c_uuid")?,
            title: row.try_get("title")?,
            purpose: row.try_get("purpose")?,
            amount: decimal_col(row, "amount")?,
            deadline: row.try_get("deadline")?,
            story: row.try_get("story")?,
            images: json_col(row, "images")?,
            video: row.try_get("video")?,
            status: status_col(row, "status")?,
            pause_reason: row.try_get("pause_reason")?,
            approved_at: row.try_get("approved_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "SELECT f_uuid, f_fk_uc_uuid, f_fk_c_uuid, title, purpose, amount, deadline, \
                       story, images, video, status, pause_reason, approved_at, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, fund: &Fund) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO funds
            (f_uuid, f_fk_uc_uuid, f_fk_c_uuid, title, purpose, amount, deadline, story,
             images, video, status, pause_reason, approved_at, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&fund.f_uuid)
    .bind(&fund.f_fk_uc_uuid)
    .bind(&fund.f_fk_c_uuid)
    .bind(&fund.title)
    .bind(&fund.purpose)
    .bind(fund.amount.to_string())
    .bind(fund.deadline)
    .bind(&fund.story)
    .bind(serde_json::to_string(&fund.images)?)
    .bind(&fund.video)
    .bind(fund.status.as_str())
    .bind(&fund.pause_reason)
    .bind(fund.approved_at)
    .bind(fund.created_at)
    .bind(fund.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, f_uuid: &str) -> Result<Option<Fund>> {
    let fund = sqlx::query_as::<_, Fund>(&format!("{COLUMNS} FROM funds WHERE f_uuid = ?1"))
        .bind(f_uuid)
        .fetch_optional(exec)
        .await?;
    Ok(fund)
}

/// Write a status change. `approved_at` is only overwritten when `Some`.
pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    exec: E,
    f_uuid: &str,
    status: FundStatus,
    pause_reason: Option<&str>,
    approved_at: Option<i64>,
    now: i64,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE funds
        SET    status = ?1,
               pause_reason = ?2,
               approved_at = COALESCE(?3, approved_at),
               updated_at = ?4
        WHERE  f_uuid = ?5
        "#,
    )
    .bind(status.as_str())
    .bind(pause_reason)
    .bind(approved_at)
    .bind(now)
    .bind(f_uuid)
    .execute(exec)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Owner edit of the descriptive fields. Status is left untouched.
pub async fn update_details<'e, E: SqliteExecutor<'e>>(exec: E, fund: &Fund) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE funds
        SET    f_fk_c_uuid = ?1, title = ?2, purpose = ?3, amount = ?4, deadline = ?5,
               story = ?6, images = ?7, video = ?8, updated_at = ?9
        WHERE  f_uuid = ?10
        "#,
    )
    .bind(&fund.f_fk_c_uuid)
    .bind(&fund.title)
    .bind(&fund.purpose)
    .bind(fund.amount.to_string())
    .bind(fund.deadline)
    .bind(&fund.story)
    .bind(serde_json::to_string(&fund.images)?)
    .bind(&fund.video)
    .bind(fund.updated_at)
    .bind(&fund.f_uuid)
    .execute(exec)
    .await?;
    Ok(())
}

/// Number of ACTIVE or PENDING funds in a category.
pub async fn count_blocking_category<'e, E: SqliteExecutor<'e>>(exec: E, c_uuid: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM funds WHERE f_fk_c_uuid = ?1 AND status IN (?2, ?3)",
    )
    .bind(c_uuid)
    .bind(FundStatus::Active.as_str())
    .bind(FundStatus::Pending.as_str())
    .fetch_one(exec)
    .await?;
    Ok(count)
}

#[derive(Debug, Clone, Default)]
pub struct FundFilter {
    pub status: Option<FundStatus>,
    pub owner: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

pub async fn list(pool: &SqlitePool, filter: &FundFilter, page: PageRequest) -> Result<Page<Fund>> {
    fetch_page(pool, COLUMNS, "funds", "created_at DESC, f_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(status) = filter.status {
            w.eq("status", status.as_str().to_string());
        }
        if let Some(owner) = &filter.owner {
            w.eq("f_fk_uc_uuid", owner.clone());
        }
        if let Some(category) = &filter.category {
            w.eq("f_fk_c_uuid", category.clone());
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            w.search(&["title", "purpose"], term);
        }
    })
    .await
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::db::{new_uuid, now};

    pub async fn fund(pool: &SqlitePool, owner: &str, category: &str, status: FundStatus) -> Fund {
        let ts = now();
        let fund = Fund {
            f_uuid: new_uuid(),
            f_fk_uc_uuid: owner.to_string(),
            f_fk_c_uuid: category.to_string(),
            title: "Clean water for Kiambu".to_string(),
            purpose: "Community well".to_string(),
            amount: Decimal::new(500_000, 2),
            deadline: ts + 30 * 86_400,
            story: String::new(),
            images: vec![],
            video: None,
            status,
            pause_reason: None,
            approved_at: None,
            created_at: ts,
            updated_at: ts,
        };
        insert(pool, &fund).await.unwrap();
        fund
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::{categories, users};

    #[tokio::test]
    async fn test_list_filters_by_status_and_search() {
        let pool = crate::db::memory_pool().await;
        let owner = users::fixtures::user(&pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&pool, "Health", false).await;

        fixtures::fund(&pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Active).await;
        fixtures::fund(&pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Pending).await;

        let filter = FundFilter {
            status: Some(FundStatus::Active),
            search: Some("water".into()),
            ..Default::default()
        };
        let page = list(&pool, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].status, FundStatus::Active);

        let blocking = count_blocking_category(&pool, &cat.c_uuid).await.unwrap();
        assert_eq!(blocking, 2);
    }

    #[tokio::test]
    async fn test_set_status_keeps_approval_stamp() {
        let pool = crate::db::memory_pool().await;
        let owner = users::fixtures::user(&pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&pool, "Health", false).await;
        let fund = fixtures::fund(&pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Pending).await;

        set_status(&pool, &fund.f_uuid, FundStatus::Active, None, Some(100), 100).await.unwrap();
        set_status(&pool, &fund.f_uuid, FundStatus::Paused, Some("audit"), None, 200).await.unwrap();

        let loaded = find(&pool, &fund.f_uuid).await.unwrap().unwrap();
        assert_eq!(loaded.status, FundStatus::Paused);
        assert_eq!(loaded.pause_reason.as_deref(), Some("audit"));
        assert_eq!(loaded.approved_at, Some(100));
    }
}
