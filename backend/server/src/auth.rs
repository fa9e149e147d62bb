//! Password hashing, bearer tokens, roles and request extractors.
//!
//! Tokens are HS256 JWTs whose `sub` is the user uuid. Every authenticated
//! request reloads the user so that blocked accounts and role changes take
//! effect immediately; permission keys are derived from the stored role.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::AppState;
use crate::db::{self, users::User};
use crate::errors::{ApiError, Result, ServerError};

/// Permission keys checked by admin handlers.
pub mod perm {
    pub const FUNDRAISERS: &str = "fundraisers";
    pub const DONATIONS: &str = "donations";
    pub const PAYOUTS: &str = "payouts";
    pub const WITHDRAWALS: &str = "withdrawals";
    pub const USERS: &str = "users";
    pub const CATEGORIES: &str = "categories";
    pub const FAQS: &str = "faqs";
    pub const KYC: &str = "kyc";
    pub const REPORTS: &str = "reports";

    pub const ALL: &[&str] = &[
        FUNDRAISERS,
        DONATIONS,
        PAYOUTS,
        WITHDRAWALS,
        USERS,
        CATEGORIES,
        FAQS,
        KYC,
        REPORTS,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Finance,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Finance => "finance",
            Self::Moderator => "moderator",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Self::User => &[],
            Self::Admin => perm::ALL,
            Self::Finance => &[perm::PAYOUTS, perm::WITHDRAWALS, perm::DONATIONS],
            Self::Moderator => &[
                perm::FUNDRAISERS,
                perm::CATEGORIES,
                perm::FAQS,
                perm::KYC,
                perm::REPORTS,
                perm::USERS,
            ],
        }
    }

    pub fn is_staff(&self) -> bool {
        !self.permissions().is_empty()
    }

    /// Whether every permission of `other` is also held by `self`.
    pub fn covers(&self, other: Role) -> bool {
        let mine = self.permissions();
        other.permissions().iter().all(|p| mine.contains(p))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "finance" => Ok(Self::Finance),
            "moderator" => Ok(Self::Moderator),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────
// Passwords
// ─────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::PasswordHash(e.to_string()))
}

/// `false` for a wrong password or an unparsable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            debug!("Stored password hash is unreadable: {e}");
            false
        }
    }
}

// ─────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(user: &User, secret: &str, ttl_secs: i64) -> Result<String> {
    let iat = db::now();
    let claims = Claims {
        sub: user.u_uuid.clone(),
        role: user.role,
        permissions: user.role.permissions().iter().map(|p| p.to_string()).collect(),
        iat,
        exp: iat + ttl_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn resolve_user(state: &AppState, token: &str) -> std::result::Result<User, ApiError> {
    let claims = verify_token(token, &state.config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;
    let user = db::users::find(&state.pool, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is blocked".to_string()));
    }
    Ok(user)
}

// ─────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────

/// Authenticated caller; 401 without a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer(parts)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        resolve_user(state, token).await.map(AuthUser)
    }
}

/// Caller identity when a token is present. A missing header yields `None`;
/// a present but invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        match bearer(parts) {
            Some(token) => resolve_user(state, token).await.map(|u| MaybeUser(Some(u))),
            None => Ok(MaybeUser(None)),
        }
    }
}

/// Staff caller (any role with at least one permission key).
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl AdminUser {
    /// 403 unless the caller's role grants `permission`.
    pub fn require(&self, permission: &str) -> std::result::Result<(), ApiError> {
        if self.0.role.permissions().iter().any(|p| *p == permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Missing permission: {permission}"
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
