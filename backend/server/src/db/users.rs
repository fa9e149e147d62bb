//! Users: fund owners, donors and staff accounts.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteExecutor, SqlitePool};

use super::{decimal_col, fetch_page, status_col, Page, PageRequest, Where};
use crate::auth::Role;
use crate::errors::Result;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub u_uuid: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub balance: Decimal,
    #[serde(serialize_with = "mask_token")]
    pub payout_card_token: Option<String>,
    #[serde(skip)]
    pub push_token: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Only the last four characters of a card token leave the server.
fn mask_token<S: Serializer>(token: &Option<String>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match token {
        Some(t) => {
            let skip = t.chars().count().saturating_sub(4);
            let tail: String = t.chars().skip(skip).collect();
            s.serialize_some(&format!("****{tail}"))
        }
        None => s.serialize_none(),
    }
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(User {
            u_uuid: row.try_get("u_uuid")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: status_col(row, "role")?,
            balance: decimal_col(row, "balance")?,
            payout_card_token: row.try_get("payout_card_token")?,
            push_token: row.try_get("push_token")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "SELECT u_uuid, name, email, password_hash, role, balance, payout_card_token, \
                       push_token, is_active, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users
            (u_uuid, name, email, password_hash, role, balance, payout_card_token,
             push_token, is_active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&user.u_uuid)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.balance.to_string())
    .bind(&user.payout_card_token)
    .bind(&user.push_token)
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find<'e, E: SqliteExecutor<'e>>(exec: E, u_uuid: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("{COLUMNS} FROM users WHERE u_uuid = ?1"))
        .bind(u_uuid)
        .fetch_optional(exec)
        .await?;
    Ok(user)
}

pub async fn find_by_email<'e, E: SqliteExecutor<'e>>(exec: E, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "{COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"
    ))
    .bind(email)
    .fetch_optional(exec)
    .await?;
    Ok(user)
}

pub async fn set_balance<'e, E: SqliteExecutor<'e>>(
    exec: E,
    u_uuid: &str,
    balance: Decimal,
    now: i64,
) -> Result<()> {
    sqlx::query("UPDATE users SET balance = ?1, updated_at = ?2 WHERE u_uuid = ?3")
        .bind(balance.to_string())
        .bind(now)
        .bind(u_uuid)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_payout_card<'e, E: SqliteExecutor<'e>>(
    exec: E,
    u_uuid: &str,
    token: Option<&str>,
    now: i64,
) -> Result<()> {
    sqlx::query("UPDATE users SET payout_card_token = ?1, updated_at = ?2 WHERE u_uuid = ?3")
        .bind(token)
        .bind(now)
        .bind(u_uuid)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_push_token<'e, E: SqliteExecutor<'e>>(
    exec: E,
    u_uuid: &str,
    token: Option<&str>,
    now: i64,
) -> Result<()> {
    sqlx::query("UPDATE users SET push_token = ?1, updated_at = ?2 WHERE u_uuid = ?3")
        .bind(token)
        .bind(now)
        .bind(u_uuid)
        .execute(exec)
        .await?;
    Ok(())
}

/// Returns `false` when no such user exists.
pub async fn set_active<'e, E: SqliteExecutor<'e>>(
    exec: E,
    u_uuid: &str,
    is_active: bool,
    now: i64,
) -> Result<bool> {
    let rows = sqlx::query("UPDATE users SET is_active = ?1, updated_at = ?2 WHERE u_uuid = ?3")
        .bind(is_active)
        .bind(now)
        .bind(u_uuid)
        .execute(exec)
        .await?
        .rows_affected();
    Ok(rows > 0)
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn list(pool: &SqlitePool, filter: &UserFilter, page: PageRequest) -> Result<Page<User>> {
    fetch_page(pool, COLUMNS, "users", "created_at DESC, u_uuid", page, |qb| {
        let mut w = Where::new(qb);
        if let Some(role) = filter.role {
            w.eq("role", role.as_str().to_string());
        }
        if let Some(active) = filter.is_active {
            w.eq("is_active", active);
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            w.search(&["name", "email"], term);
        }
    })
    .await
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::db::{new_uuid, now};

    /// Insert a user with the given role, balance and payout card.
    pub async fn user(
        pool: &SqlitePool,
        role: Role,
        balance: Decimal,
        payout_card: Option<&str>,
    ) -> User {
        let ts = now();
        let id = new_uuid();
        let user = User {
            email: format!("{id}@example.test"),
            u_uuid: id,
            name: "Test User".to_string(),
            password_hash: "not-a-hash".to_string(),
            role,
            balance,
            payout_card_token: payout_card.map(str::to_string),
            push_token: None,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };
        insert(pool, &user).await.unwrap();
        user
    }
}
