//! Staff routes under `/admin/private`. Each handler checks the permission
//! key for its area before doing anything.

use std::sync::Arc;

use axum::{extract::State, Json};
use crowdfund_core::{
    DonationStatus, FundAction, FundStatus, KycStatus, PayoutStatus, ReportStatus,
    WithdrawalStatus,
};
use serde::Deserialize;

use super::{done, ok, paged, AppState, Reply};
use crate::auth::{perm, AdminUser, Role};
use crate::db::categories::{self, Category, CategoryFilter};
use crate::db::donations::{self, Donation, DonationFilter};
use crate::db::faqs::{self, Faq};
use crate::db::funds::{self, Fund, FundFilter};
use crate::db::kyc::{self, KycRecord};
use crate::db::payouts::{self, Payout, PayoutFilter};
use crate::db::reports::{self, SecurityReport};
use crate::db::users::{self, User, UserFilter};
use crate::db::withdrawals::{self, Withdrawal, WithdrawalFilter};
use crate::db::PageRequest;
use crate::errors::ApiResult;
use crate::services::catalog::{self, CategoryInput, FaqInput};
use crate::services::{accounts, compliance, fundraisers, payouts as payout_service, settlement};
use crate::services::withdrawals as withdrawal_service;

// ─────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListBody<F> {
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(flatten)]
    pub filter: F,
}

#[derive(Debug, Default, Deserialize)]
pub struct FundListFilter {
    pub status: Option<FundStatus>,
    pub owner_uuid: Option<String>,
    pub category_uuid: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DonationListFilter {
    pub status: Option<DonationStatus>,
    pub fund_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayoutListFilter {
    pub status: Option<PayoutStatus>,
    pub recipient_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WithdrawalListFilter {
    pub status: Option<WithdrawalStatus>,
    pub user_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchFilter {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KycListFilter {
    pub status: Option<KycStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportListFilter {
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct FundActionBody {
    pub fund_uuid: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DonationActionBody {
    pub d_uuid: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutActionBody {
    pub p_uuid: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutStatusBody {
    pub p_uuid: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalActionBody {
    pub w_uuid: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusBody {
    pub u_uuid: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdateBody {
    pub c_uuid: String,
    #[serde(flatten)]
    pub input: CategoryInput,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRef {
    pub c_uuid: String,
}

#[derive(Debug, Deserialize)]
pub struct FaqUpdateBody {
    pub faq_uuid: String,
    #[serde(flatten)]
    pub input: FaqInput,
}

#[derive(Debug, Deserialize)]
pub struct FaqRef {
    pub faq_uuid: String,
}

#[derive(Debug, Deserialize)]
pub struct KycActionBody {
    pub k_uuid: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportStatusBody {
    pub r_uuid: String,
    pub status: ReportStatus,
    pub admin_note: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Fundraisers
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/fundraiser-list`
pub async fn fundraiser_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<FundListFilter>>,
) -> ApiResult<Reply<Vec<Fund>>> {
    admin.require(perm::FUNDRAISERS)?;
    let filter = FundFilter {
        status: body.filter.status,
        owner: body.filter.owner_uuid,
        category: body.filter.category_uuid,
        search: body.filter.search,
    };
    let page = funds::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Fundraisers fetched", page))
}

async fn moderate(
    state: &AppState,
    admin: &AdminUser,
    body: FundActionBody,
    action: FundAction,
) -> ApiResult<Reply<Fund>> {
    admin.require(perm::FUNDRAISERS)?;
    let fund = fundraisers::moderate(state, &body.fund_uuid, action, body.reason).await?;
    Ok(ok(format!("Fundraiser {}", fund.status.as_str().to_lowercase()), fund))
}

/// `POST /admin/private/fundraiser-approve`
pub async fn fundraiser_approve(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FundActionBody>,
) -> ApiResult<Reply<Fund>> {
    moderate(&state, &admin, body, FundAction::Approve).await
}

/// `POST /admin/private/fundraiser-reject`
pub async fn fundraiser_reject(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FundActionBody>,
) -> ApiResult<Reply<Fund>> {
    moderate(&state, &admin, body, FundAction::Reject).await
}

/// `POST /admin/private/fundraiser-pause`
pub async fn fundraiser_pause(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FundActionBody>,
) -> ApiResult<Reply<Fund>> {
    moderate(&state, &admin, body, FundAction::Pause).await
}

/// `POST /admin/private/fundraiser-resume`
pub async fn fundraiser_resume(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FundActionBody>,
) -> ApiResult<Reply<Fund>> {
    moderate(&state, &admin, body, FundAction::Resume).await
}

/// `POST /admin/private/fundraiser-close`
pub async fn fundraiser_close(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FundActionBody>,
) -> ApiResult<Reply<Fund>> {
    moderate(&state, &admin, body, FundAction::Close).await
}

// ─────────────────────────────────────────────────────────
// Donations
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/donation-list`
pub async fn donation_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<DonationListFilter>>,
) -> ApiResult<Reply<Vec<Donation>>> {
    admin.require(perm::DONATIONS)?;
    let filter = DonationFilter {
        status: body.filter.status,
        fund: body.filter.fund_uuid,
        donor: None,
    };
    let page = donations::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Donations fetched", page))
}

/// `POST /admin/private/donation-mark-safe`
pub async fn donation_mark_safe(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<DonationActionBody>,
) -> ApiResult<Reply<Donation>> {
    admin.require(perm::DONATIONS)?;
    let donation = settlement::mark_safe(&state, &body.d_uuid).await?;
    Ok(ok("Donation marked as safe", donation))
}

/// `POST /admin/private/donation-mark-fraud`
pub async fn donation_mark_fraud(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<DonationActionBody>,
) -> ApiResult<Reply<Donation>> {
    admin.require(perm::DONATIONS)?;
    let donation = settlement::mark_fraud(&state, &body.d_uuid, body.reason).await?;
    Ok(ok("Donation marked as fraud", donation))
}

// ─────────────────────────────────────────────────────────
// Payouts
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/payout-list`
pub async fn payout_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<PayoutListFilter>>,
) -> ApiResult<Reply<Vec<Payout>>> {
    admin.require(perm::PAYOUTS)?;
    let filter = PayoutFilter {
        status: body.filter.status,
        recipient: body.filter.recipient_uuid,
    };
    let page = payouts::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Payouts fetched", page))
}

/// `POST /admin/private/approvePayout`
pub async fn approve_payout(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<PayoutActionBody>,
) -> ApiResult<Reply<Payout>> {
    admin.require(perm::PAYOUTS)?;
    let payout = payout_service::approve(&state, &body.p_uuid).await?;
    Ok(ok("Payout approved", payout))
}

/// `POST /admin/private/rejectPayout`
pub async fn reject_payout(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<PayoutActionBody>,
) -> ApiResult<Reply<Payout>> {
    admin.require(perm::PAYOUTS)?;
    let payout = payout_service::reject(&state, &body.p_uuid, body.reason).await?;
    Ok(ok("Payout rejected", payout))
}

/// `POST /admin/private/updatePayoutStatus`
pub async fn update_payout_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<PayoutStatusBody>,
) -> ApiResult<Reply<Payout>> {
    admin.require(perm::PAYOUTS)?;
    let payout = payout_service::update_status(&state, &body.p_uuid, &body.status).await?;
    Ok(ok("Payout status updated", payout))
}

// ─────────────────────────────────────────────────────────
// Withdrawals
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/withdrawal-list`
pub async fn withdrawal_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<WithdrawalListFilter>>,
) -> ApiResult<Reply<Vec<Withdrawal>>> {
    admin.require(perm::WITHDRAWALS)?;
    let filter = WithdrawalFilter {
        status: body.filter.status,
        user: body.filter.user_uuid,
    };
    let page = withdrawals::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Withdrawals fetched", page))
}

/// `POST /admin/private/approveWithdrawal`
pub async fn approve_withdrawal(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<WithdrawalActionBody>,
) -> ApiResult<Reply<Withdrawal>> {
    admin.require(perm::WITHDRAWALS)?;
    let withdrawal = withdrawal_service::approve(&state, &body.w_uuid).await?;
    Ok(ok("Withdrawal approved", withdrawal))
}

/// `POST /admin/private/rejectWithdrawal`
pub async fn reject_withdrawal(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<WithdrawalActionBody>,
) -> ApiResult<Reply<Withdrawal>> {
    admin.require(perm::WITHDRAWALS)?;
    let withdrawal = withdrawal_service::reject(&state, &body.w_uuid, body.reason).await?;
    Ok(ok("Withdrawal rejected and amount refunded", withdrawal))
}

/// `POST /admin/private/processWithdrawal`
pub async fn process_withdrawal(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<WithdrawalActionBody>,
) -> ApiResult<Reply<Withdrawal>> {
    admin.require(perm::WITHDRAWALS)?;
    let withdrawal = withdrawal_service::mark_processing(&state, &body.w_uuid).await?;
    Ok(ok("Withdrawal is being processed", withdrawal))
}

// ─────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/user-list`
pub async fn user_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<UserListFilter>>,
) -> ApiResult<Reply<Vec<User>>> {
    admin.require(perm::USERS)?;
    let filter = UserFilter {
        role: body.filter.role,
        is_active: body.filter.is_active,
        search: body.filter.search,
    };
    let page = users::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Users fetched", page))
}

/// `POST /admin/private/user-status`: block or unblock.
pub async fn user_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<UserStatusBody>,
) -> ApiResult<Reply<User>> {
    admin.require(perm::USERS)?;
    let user = accounts::set_active(&state, &admin.0, &body.u_uuid, body.is_active).await?;
    let message = if user.is_active { "User unblocked" } else { "User blocked" };
    Ok(ok(message, user))
}

// ─────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/category-list`: all live categories.
pub async fn category_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<SearchFilter>>,
) -> ApiResult<Reply<Vec<Category>>> {
    admin.require(perm::CATEGORIES)?;
    let filter = CategoryFilter {
        status: None,
        search: body.filter.search,
    };
    let page = categories::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Categories fetched", page))
}

/// `POST /admin/private/category-create`
pub async fn category_create(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<CategoryInput>,
) -> ApiResult<Reply<Category>> {
    admin.require(perm::CATEGORIES)?;
    let category = catalog::create_category(&state, body).await?;
    Ok(ok("Category created", category))
}

/// `POST /admin/private/category-update`
pub async fn category_update(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<CategoryUpdateBody>,
) -> ApiResult<Reply<Category>> {
    admin.require(perm::CATEGORIES)?;
    let category = catalog::update_category(&state, &body.c_uuid, body.input).await?;
    Ok(ok("Category updated", category))
}

/// `POST /admin/private/category-delete`
pub async fn category_delete(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<CategoryRef>,
) -> ApiResult<Reply<()>> {
    admin.require(perm::CATEGORIES)?;
    catalog::delete_category(&state, &body.c_uuid).await?;
    Ok(done("Category deleted"))
}

// ─────────────────────────────────────────────────────────
// FAQs
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/faq-list`: active and inactive entries.
pub async fn faq_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<SearchFilter>>,
) -> ApiResult<Reply<Vec<Faq>>> {
    admin.require(perm::FAQS)?;
    let page = faqs::list(&state.pool, false, body.filter.search.as_deref(), body.page).await?;
    Ok(paged("FAQs fetched", page))
}

/// `POST /admin/private/faq-create`
pub async fn faq_create(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FaqInput>,
) -> ApiResult<Reply<Faq>> {
    admin.require(perm::FAQS)?;
    let faq = catalog::create_faq(&state, body).await?;
    Ok(ok("FAQ created", faq))
}

/// `POST /admin/private/faq-update`
pub async fn faq_update(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FaqUpdateBody>,
) -> ApiResult<Reply<Faq>> {
    admin.require(perm::FAQS)?;
    let faq = catalog::update_faq(&state, &body.faq_uuid, body.input).await?;
    Ok(ok("FAQ updated", faq))
}

/// `POST /admin/private/faq-delete`
pub async fn faq_delete(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<FaqRef>,
) -> ApiResult<Reply<()>> {
    admin.require(perm::FAQS)?;
    catalog::delete_faq(&state, &body.faq_uuid).await?;
    Ok(done("FAQ deleted"))
}

// ─────────────────────────────────────────────────────────
// KYC and security reports
// ─────────────────────────────────────────────────────────

/// `POST /admin/private/kyc-list`
pub async fn kyc_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<KycListFilter>>,
) -> ApiResult<Reply<Vec<KycRecord>>> {
    admin.require(perm::KYC)?;
    let page = kyc::list(&state.pool, body.filter.status, body.page).await?;
    Ok(paged("KYC submissions fetched", page))
}

/// `POST /admin/private/kyc-approve`
pub async fn kyc_approve(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<KycActionBody>,
) -> ApiResult<Reply<KycRecord>> {
    admin.require(perm::KYC)?;
    let record = compliance::approve_kyc(&state, &body.k_uuid).await?;
    Ok(ok("KYC approved", record))
}

/// `POST /admin/private/kyc-reject`
pub async fn kyc_reject(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<KycActionBody>,
) -> ApiResult<Reply<KycRecord>> {
    admin.require(perm::KYC)?;
    let record = compliance::reject_kyc(&state, &body.k_uuid, body.reason).await?;
    Ok(ok("KYC rejected", record))
}

/// `POST /admin/private/report-list`
pub async fn report_list(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ListBody<ReportListFilter>>,
) -> ApiResult<Reply<Vec<SecurityReport>>> {
    admin.require(perm::REPORTS)?;
    let page = reports::list(&state.pool, body.filter.status, body.page).await?;
    Ok(paged("Security reports fetched", page))
}

/// `POST /admin/private/report-update-status`
pub async fn report_update_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<ReportStatusBody>,
) -> ApiResult<Reply<SecurityReport>> {
    admin.require(perm::REPORTS)?;
    let report =
        compliance::update_report_status(&state, &body.r_uuid, body.status, body.admin_note)
            .await?;
    Ok(ok("Security report updated", report))
}
