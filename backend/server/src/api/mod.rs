//! Axum REST API: shared state, the response envelope and the router.
//!
//! Every response uses `{status, message, payload?, pagination?}`. Most routes
//! are POST with a JSON body, reads included.

pub mod admin;
pub mod private;
pub mod public;
pub mod webhook;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{Page, Pagination};
use crate::notify::Outbox;

pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub outbox: Outbox,
}

// ─────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

pub type Reply<T> = Json<Envelope<T>>;

pub fn ok<T: Serialize>(message: impl Into<String>, payload: T) -> Reply<T> {
    Json(Envelope {
        status: true,
        message: message.into(),
        payload: Some(payload),
        pagination: None,
    })
}

/// Success without a payload.
pub fn done(message: impl Into<String>) -> Reply<()> {
    Json(Envelope {
        status: true,
        message: message.into(),
        payload: None,
        pagination: None,
    })
}

pub fn paged<T: Serialize>(message: impl Into<String>, page: Page<T>) -> Reply<Vec<T>> {
    Json(Envelope {
        status: true,
        message: message.into(),
        payload: Some(page.items),
        pagination: Some(page.pagination),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/register", post(public::register))
        .route("/login", post(public::login))
        .route("/fundraiser-list", post(public::fundraiser_list))
        .route("/fundraiser-detail", post(public::fundraiser_detail))
        .route("/fundraiser-donations", post(public::fundraiser_donations))
        .route("/category-list", post(public::category_list))
        .route("/faq-list", post(public::faq_list))
        .route("/security-report", post(public::security_report));

    let private = Router::new()
        .route("/profile", post(private::profile))
        .route("/payout-card", post(private::payout_card))
        .route("/push-token", post(private::push_token))
        .route("/fundraiser-create", post(private::fundraiser_create))
        .route("/fundraiser-update", post(private::fundraiser_update))
        .route("/my-fundraisers", post(private::my_fundraisers))
        .route("/donation-start", post(private::donation_start))
        .route("/my-donations", post(private::my_donations))
        .route("/withdrawal-request", post(private::withdrawal_request))
        .route("/my-withdrawals", post(private::my_withdrawals))
        .route("/kyc-submit", post(private::kyc_submit))
        .route("/kyc-status", post(private::kyc_status));

    let admin = Router::new()
        .route("/fundraiser-list", post(admin::fundraiser_list))
        .route("/fundraiser-approve", post(admin::fundraiser_approve))
        .route("/fundraiser-reject", post(admin::fundraiser_reject))
        .route("/fundraiser-pause", post(admin::fundraiser_pause))
        .route("/fundraiser-resume", post(admin::fundraiser_resume))
        .route("/fundraiser-close", post(admin::fundraiser_close))
        .route("/donation-list", post(admin::donation_list))
        .route("/donation-mark-safe", post(admin::donation_mark_safe))
        .route("/donation-mark-fraud", post(admin::donation_mark_fraud))
        .route("/payout-list", post(admin::payout_list))
        .route("/approvePayout", post(admin::approve_payout))
        .route("/rejectPayout", post(admin::reject_payout))
        .route("/updatePayoutStatus", post(admin::update_payout_status))
        .route("/withdrawal-list", post(admin::withdrawal_list))
        .route("/approveWithdrawal", post(admin::approve_withdrawal))
        .route("/rejectWithdrawal", post(admin::reject_withdrawal))
        .route("/processWithdrawal", post(admin::process_withdrawal))
        .route("/user-list", post(admin::user_list))
        .route("/user-status", post(admin::user_status))
        .route("/category-list", post(admin::category_list))
        .route("/category-create", post(admin::category_create))
        .route("/category-update", post(admin::category_update))
        .route("/category-delete", post(admin::category_delete))
        .route("/faq-list", post(admin::faq_list))
        .route("/faq-create", post(admin::faq_create))
        .route("/faq-update", post(admin::faq_update))
        .route("/faq-delete", post(admin::faq_delete))
        .route("/kyc-list", post(admin::kyc_list))
        .route("/kyc-approve", post(admin::kyc_approve))
        .route("/kyc-reject", post(admin::kyc_reject))
        .route("/report-list", post(admin::report_list))
        .route("/report-update-status", post(admin::report_update_status));

    Router::new()
        .route("/health", get(health))
        .nest("/public", public)
        .nest("/private", private)
        .nest("/admin/private", admin)
        .route("/webhook/stripe", post(webhook::stripe))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
impl AppState {
    /// Fresh in-memory database, test config and a log-only notifier.
    pub async fn for_tests() -> Self {
        Self::for_tests_with(Arc::new(crate::notify::LogNotifier)).await
    }

    pub async fn for_tests_with(notifier: Arc<dyn crate::notify::Notifier>) -> Self {
        AppState {
            pool: crate::db::memory_pool().await,
            config: Config::for_tests(),
            outbox: Outbox::new(notifier),
        }
    }
}
