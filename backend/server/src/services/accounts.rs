//! Registration, login and account settings.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::{hash_password, issue_token, verify_password, Role};
use crate::db::users::{self, User};
use crate::db::{new_uuid, now};
use crate::errors::{ApiError, ApiResult, Result};
use rust_decimal::Decimal;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ApiError::Validation("A valid email is required".to_string())),
    }
}

fn new_user(name: &str, email: String, password_hash: String, role: Role) -> User {
    let ts = now();
    User {
        u_uuid: new_uuid(),
        name: name.trim().to_string(),
        email,
        password_hash,
        role,
        balance: Decimal::ZERO,
        payout_card_token: None,
        push_token: None,
        is_active: true,
        created_at: ts,
        updated_at: ts,
    }
}

pub async fn register(state: &AppState, input: RegisterInput) -> ApiResult<Session> {
    if input.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    let email = normalize_email(&input.email)?;
    if input.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let user = new_user(&input.name, email, hash_password(&input.password)?, Role::User);
    users::insert(&state.pool, &user).await?;
    info!("User {} registered", user.u_uuid);

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;
    Ok(Session { token, user })
}

pub async fn login(state: &AppState, input: LoginInput) -> ApiResult<Session> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let email = input.email.trim().to_ascii_lowercase();
    let user = users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&input.password, &user.password_hash) {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is blocked".to_string()));
    }

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;
    Ok(Session { token, user })
}

/// Seed the configured admin account when its email is not registered yet.
pub async fn bootstrap_admin(state: &AppState) -> Result<()> {
    let Some((email, password)) = &state.config.bootstrap_admin else {
        return Ok(());
    };
    let email = email.trim().to_ascii_lowercase();
    if users::find_by_email(&state.pool, &email).await?.is_some() {
        return Ok(());
    }
    let user = new_user("Administrator", email, hash_password(password)?, Role::Admin);
    users::insert(&state.pool, &user).await?;
    info!("Bootstrap admin {} created", user.email);
    Ok(())
}

pub async fn set_payout_card(state: &AppState, user: &User, token: Option<String>) -> ApiResult<User> {
    let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let ts = now();
    users::set_payout_card(&state.pool, &user.u_uuid, token.as_deref(), ts).await?;

    let mut user = user.clone();
    user.payout_card_token = token;
    user.updated_at = ts;
    Ok(user)
}

pub async fn set_push_token(state: &AppState, user: &User, token: Option<String>) -> ApiResult<()> {
    let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    users::set_push_token(&state.pool, &user.u_uuid, token.as_deref(), now()).await?;
    Ok(())
}

/// Block or unblock an account. Staff cannot block themselves, and cannot
/// touch accounts whose role holds permissions they lack.
pub async fn set_active(
    state: &AppState,
    actor: &User,
    u_uuid: &str,
    is_active: bool,
) -> ApiResult<User> {
    if actor.u_uuid == u_uuid && !is_active {
        return Err(ApiError::Validation("You cannot block your own account".to_string()));
    }
    let mut target = users::find(&state.pool, u_uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if !actor.role.covers(target.role) {
        warn!(
            "{} ({}) tried to change status of {} ({})",
            actor.u_uuid, actor.role, target.u_uuid, target.role
        );
        return Err(ApiError::Forbidden(format!(
            "A {} cannot change the status of a {} account",
            actor.role, target.role
        )));
    }

    let ts = now();
    if !users::set_active(&state.pool, u_uuid, is_active, ts).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    if !is_active {
        warn!("User {u_uuid} blocked by {}", actor.u_uuid);
    }
    target.is_active = is_active;
    target.updated_at = ts;
    Ok(target)
}
