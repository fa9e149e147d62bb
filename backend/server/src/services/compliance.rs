//! KYC review and security reports.

use crowdfund_core::{KycError, KycStatus, ReportStatus};
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::AppState;
use crate::db::kyc::{self, KycRecord};
use crate::db::reports::{self, SecurityReport};
use crate::db::users::User;
use crate::db::{new_uuid, now, users};
use crate::errors::{ApiError, ApiResult};

pub const DEFAULT_KYC_REJECT_REASON: &str = "Documents could not be verified";

#[derive(Debug, Clone, Deserialize)]
pub struct KycInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub document_number: String,
}

/// One PENDING submission per user at a time.
pub async fn submit_kyc(state: &AppState, user: &User, input: KycInput) -> ApiResult<KycRecord> {
    let required = [
        ("full_name", &input.full_name),
        ("document_type", &input.document_type),
        ("document_number", &input.document_number),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(KycError::MissingField(*field).into());
    }

    if let Some(latest) = kyc::latest_for_user(&state.pool, &user.u_uuid).await? {
        if latest.status == KycStatus::Pending {
            return Err(KycError::AlreadyPending.into());
        }
    }

    let ts = now();
    let record = KycRecord {
        k_uuid: new_uuid(),
        k_fk_uc_uuid: user.u_uuid.clone(),
        full_name: input.full_name.trim().to_string(),
        document_type: input.document_type.trim().to_string(),
        document_number: input.document_number.trim().to_string(),
        status: KycStatus::Pending,
        reject_reason: None,
        reviewed_at: None,
        created_at: ts,
        updated_at: ts,
    };
    kyc::insert(&state.pool, &record).await?;
    info!("KYC {} submitted by {}", record.k_uuid, user.u_uuid);
    Ok(record)
}

async fn review(
    state: &AppState,
    k_uuid: &str,
    status: KycStatus,
    reason: Option<String>,
) -> ApiResult<KycRecord> {
    let mut record = kyc::find(&state.pool, k_uuid)
        .await?
        .ok_or(KycError::NotFound)?;
    if record.status != KycStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "KYC submission was already reviewed ({})",
            record.status
        )));
    }

    let ts = now();
    kyc::set_review(&state.pool, k_uuid, status, reason.as_deref(), ts).await?;
    record.status = status;
    record.reject_reason = reason;
    record.reviewed_at = Some(ts);
    record.updated_at = ts;
    info!("KYC {k_uuid} reviewed: {status}");

    if let Ok(Some(owner)) = users::find(&state.pool, &record.k_fk_uc_uuid).await {
        let body = match &record.reject_reason {
            Some(reason) => format!("Your verification was rejected: {reason}"),
            None => "Your identity has been verified.".to_string(),
        };
        state.outbox.mail(&owner.email, "Verification update", body);
    }
    Ok(record)
}

pub async fn approve_kyc(state: &AppState, k_uuid: &str) -> ApiResult<KycRecord> {
    review(state, k_uuid, KycStatus::Approved, None).await
}

pub async fn reject_kyc(state: &AppState, k_uuid: &str, reason: Option<String>) -> ApiResult<KycRecord> {
    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_KYC_REJECT_REASON.to_string());
    review(state, k_uuid, KycStatus::Rejected, Some(reason)).await
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportInput {
    pub reporter_email: String,
    pub title: String,
    pub description: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "medium".to_string()
}

const SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];

pub async fn submit_report(state: &AppState, input: ReportInput) -> ApiResult<SecurityReport> {
    if input.title.trim().is_empty() || input.description.trim().is_empty() {
        return Err(ApiError::Validation(
            "Title and description are required".to_string(),
        ));
    }
    if !input.reporter_email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".to_string()));
    }
    let severity = input.severity.trim().to_ascii_lowercase();
    if !SEVERITIES.contains(&severity.as_str()) {
        return Err(ApiError::Validation(format!(
            "Severity must be one of {}",
            SEVERITIES.join(", ")
        )));
    }

    let ts = now();
    let report = SecurityReport {
        r_uuid: new_uuid(),
        reporter_email: input.reporter_email.trim().to_string(),
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        severity,
        status: ReportStatus::Open,
        admin_note: None,
        created_at: ts,
        updated_at: ts,
    };
    reports::insert(&state.pool, &report).await?;
    warn!("Security report {} ({}) received", report.r_uuid, report.severity);
    Ok(report)
}

pub async fn update_report_status(
    state: &AppState,
    r_uuid: &str,
    status: ReportStatus,
    admin_note: Option<String>,
) -> ApiResult<SecurityReport> {
    let note = admin_note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if !reports::set_status(&state.pool, r_uuid, status, note.as_deref(), now()).await? {
        return Err(ApiError::NotFound("Security report not found".to_string()));
    }
    reports::find(&state.pool, r_uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Security report not found".to_string()))
}
