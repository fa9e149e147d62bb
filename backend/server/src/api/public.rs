//! Unauthenticated routes under `/public`.

use std::sync::Arc;

use axum::{extract::State, Json};
use crowdfund_core::{CategoryStatus, DonationStatus, FundError, FundStatus};
use serde::Deserialize;

use super::{ok, paged, AppState, Reply};
use crate::db::categories::{self, Category, CategoryFilter};
use crate::db::donations::{self, Donation, DonationFilter};
use crate::db::faqs::{self, Faq};
use crate::db::funds::{self, Fund, FundFilter};
use crate::db::reports::SecurityReport;
use crate::db::PageRequest;
use crate::errors::ApiResult;
use crate::services::accounts::{self, LoginInput, RegisterInput, Session};
use crate::services::compliance::{self, ReportInput};
use crate::services::fundraisers::{self, FundDetail};

#[derive(Debug, Deserialize)]
pub struct FundListBody {
    #[serde(flatten)]
    pub page: PageRequest,
    pub search: Option<String>,
    pub category_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FundRef {
    pub fund_uuid: String,
}

#[derive(Debug, Deserialize)]
pub struct FundDonationsBody {
    pub fund_uuid: String,
    #[serde(flatten)]
    pub page: PageRequest,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(flatten)]
    pub page: PageRequest,
    pub search: Option<String>,
}

/// `POST /public/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterInput>,
) -> ApiResult<Reply<Session>> {
    let session = accounts::register(&state, body).await?;
    Ok(ok("Registration successful", session))
}

/// `POST /public/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginInput>,
) -> ApiResult<Reply<Session>> {
    let session = accounts::login(&state, body).await?;
    Ok(ok("Login successful", session))
}

/// `POST /public/fundraiser-list`: ACTIVE fundraisers only.
pub async fn fundraiser_list(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FundListBody>,
) -> ApiResult<Reply<Vec<Fund>>> {
    let filter = FundFilter {
        status: Some(FundStatus::Active),
        category: body.category_uuid,
        search: body.search,
        ..Default::default()
    };
    let page = funds::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Fundraisers fetched", page))
}

/// `POST /public/fundraiser-detail`
///
/// Fundraisers that never went live (PENDING, REJECTED) are not public.
pub async fn fundraiser_detail(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FundRef>,
) -> ApiResult<Reply<FundDetail>> {
    let detail = fundraisers::detail(&state, &body.fund_uuid).await?;
    if matches!(detail.fund.status, FundStatus::Pending | FundStatus::Rejected) {
        return Err(FundError::NotFound.into());
    }
    Ok(ok("Fundraiser fetched", detail))
}

/// `POST /public/fundraiser-donations`
pub async fn fundraiser_donations(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FundDonationsBody>,
) -> ApiResult<Reply<Vec<Donation>>> {
    let filter = DonationFilter {
        status: Some(DonationStatus::Success),
        fund: Some(body.fund_uuid),
        donor: None,
    };
    let mut page = donations::list(&state.pool, &filter, body.page).await?;
    page.items = page.items.into_iter().map(Donation::public_view).collect();
    Ok(paged("Donations fetched", page))
}

/// `POST /public/category-list`
pub async fn category_list(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Reply<Vec<Category>>> {
    let filter = CategoryFilter {
        status: Some(CategoryStatus::Active),
        search: body.search,
    };
    let page = categories::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Categories fetched", page))
}

/// `POST /public/faq-list`
pub async fn faq_list(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Reply<Vec<Faq>>> {
    let page = faqs::list(&state.pool, true, body.search.as_deref(), body.page).await?;
    Ok(paged("FAQs fetched", page))
}

/// `POST /public/security-report`
pub async fn security_report(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReportInput>,
) -> ApiResult<Reply<SecurityReport>> {
    let report = compliance::submit_report(&state, body).await?;
    Ok(ok("Report received. Thank you.", report))
}
