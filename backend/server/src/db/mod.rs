//! Ledger store: SQLite pool, migrations, pagination and one submodule per
//! record kind.
//!
//! Query helpers are generic over [`sqlx::SqliteExecutor`] so that the same
//! function runs against the pool or inside a transaction.

pub mod categories;
pub mod donations;
pub mod faqs;
pub mod funds;
pub mod kyc;
pub mod payouts;
pub mod reports;
pub mod users;
pub mod withdrawals;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let url = if url.contains('?') || url.contains(":memory:") {
        url
    } else {
        format!("{url}?mode=rwc")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Single-connection in-memory pool with migrations applied.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    pool
}

/// Current unix time in seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ─────────────────────────────────────────────────────────
// Pagination
// ─────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Page selector accepted by every list endpoint (1-based).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, req: PageRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + req.limit - 1) / req.limit
        };
        Self {
            total,
            page: req.page,
            limit: req.limit,
            total_pages,
        }
    }
}

/// One page of records plus its pagination block.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Run a filtered `SELECT` as a page.
///
/// `filters` appends `WHERE ...` clauses to both the count and the row query,
/// so the total always matches the rows being paged over.
pub(crate) async fn fetch_page<T, F>(
    pool: &SqlitePool,
    select: &str,
    from: &str,
    order_by: &str,
    page: PageRequest,
    filters: F,
) -> Result<Page<T>>
where
    T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'_, Sqlite>),
{
    let page = page.normalized();

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
    count.push(from);
    filters(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut rows = QueryBuilder::<Sqlite>::new(select);
    rows.push(" FROM ");
    rows.push(from);
    filters(&mut rows);
    rows.push(" ORDER BY ");
    rows.push(order_by);
    rows.push(" LIMIT ");
    rows.push_bind(page.limit);
    rows.push(" OFFSET ");
    rows.push_bind(page.offset());
    let items = rows.build_query_as::<T>().fetch_all(pool).await?;

    Ok(Page {
        items,
        pagination: Pagination::new(total, page),
    })
}

/// Collects `AND`-joined `WHERE` clauses for a [`QueryBuilder`].
pub(crate) struct Where<'q, 'a> {
    qb: &'q mut QueryBuilder<'a, Sqlite>,
    started: bool,
}

impl<'q, 'a> Where<'q, 'a> {
    pub fn new(qb: &'q mut QueryBuilder<'a, Sqlite>) -> Self {
        Self { qb, started: false }
    }

    /// Start a new clause and hand back the builder to push it.
    pub fn and(&mut self) -> &mut QueryBuilder<'a, Sqlite> {
        self.qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        self.qb
    }

    /// `column = value`.
    pub fn eq<T>(&mut self, column: &str, value: T)
    where
        T: 'a + Send + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
    {
        self.and().push(column).push(" = ").push_bind(value);
    }

    /// Case-insensitive substring match over several columns. `%` and `_` in
    /// `term` match literally.
    pub fn search(&mut self, columns: &[&str], term: &str) {
        let pattern = format!("%{}%", escape_like(term.trim()));
        let qb = self.and();
        qb.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        qb.push(")");
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ─────────────────────────────────────────────────────────
// Column decoding
// ─────────────────────────────────────────────────────────

fn decode_error<E>(column: &str, source: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

/// Decimals are stored as TEXT.
pub(crate) fn decimal_col(row: &SqliteRow, column: &str) -> std::result::Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| decode_error(column, e))
}

/// Status columns hold the wire name of a core status enum.
pub(crate) fn status_col<T>(row: &SqliteRow, column: &str) -> std::result::Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| decode_error(column, e))
}

/// JSON columns (`meta`, `images`).
pub(crate) fn json_col<T>(row: &SqliteRow, column: &str) -> std::result::Result<T, sqlx::Error>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| decode_error(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_is_clamped() {
        let req = PageRequest { page: 0, limit: 1000 }.normalized();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_PAGE_LIMIT);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let req = PageRequest { page: 2, limit: 10 };
        assert_eq!(Pagination::new(21, req).total_pages, 3);
        assert_eq!(Pagination::new(0, req).total_pages, 0);
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        use crate::auth::Role;
        use crate::db::users::{self, UserFilter};

        let pool = memory_pool().await;
        users::fixtures::user(&pool, Role::User, Decimal::ZERO, None).await;

        let search = |term: &str| UserFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let hits = users::list(&pool, &search("%"), PageRequest::default()).await.unwrap();
        assert_eq!(hits.pagination.total, 0);
        let hits = users::list(&pool, &search("_"), PageRequest::default()).await.unwrap();
        assert_eq!(hits.pagination.total, 0);
        let hits = users::list(&pool, &search("example.test"), PageRequest::default()).await.unwrap();
        assert_eq!(hits.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_migrations_apply_to_memory_pool() {
        let pool = memory_pool().await;
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('funds', 'donations', 'payouts', 'withdrawals')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 4);
    }
}
