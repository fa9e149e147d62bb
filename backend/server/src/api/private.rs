//! Routes under `/private`. All require a bearer token except
//! `donation-start`, which also accepts guests.

use std::sync::Arc;

use axum::{extract::State, Json};
use crowdfund_core::FundStatus;
use serde::Deserialize;

use super::{done, ok, paged, AppState, Reply};
use crate::auth::{AuthUser, MaybeUser};
use crate::db::donations::{self, Donation, DonationFilter};
use crate::db::funds::{self, Fund, FundFilter};
use crate::db::kyc::{self, KycRecord};
use crate::db::users::User;
use crate::db::withdrawals::{self, Withdrawal, WithdrawalFilter};
use crate::db::PageRequest;
use crate::errors::ApiResult;
use crate::services::accounts;
use crate::services::compliance::{self, KycInput};
use crate::services::fundraisers::{self, FundDraft};
use crate::services::settlement::{self, DonationRequest, Settlement};
use crate::services::withdrawals::{self as withdrawal_service, WithdrawalRequest};

#[derive(Debug, Deserialize)]
pub struct PayoutCardBody {
    pub payout_card_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushTokenBody {
    pub push_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FundUpdateBody {
    pub fund_uuid: String,
    #[serde(flatten)]
    pub draft: FundDraft,
}

#[derive(Debug, Deserialize)]
pub struct MyFundsBody {
    #[serde(flatten)]
    pub page: PageRequest,
    pub status: Option<FundStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PageBody {
    #[serde(flatten)]
    pub page: PageRequest,
}

/// `POST /private/profile`: the caller, including wallet balance.
pub async fn profile(AuthUser(user): AuthUser) -> Reply<User> {
    ok("Profile fetched", user)
}

/// `POST /private/payout-card`: set or clear the payout card token.
pub async fn payout_card(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<PayoutCardBody>,
) -> ApiResult<Reply<User>> {
    let user = accounts::set_payout_card(&state, &user, body.payout_card_token).await?;
    Ok(ok("Payout card updated", user))
}

/// `POST /private/push-token`
pub async fn push_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<PushTokenBody>,
) -> ApiResult<Reply<()>> {
    accounts::set_push_token(&state, &user, body.push_token).await?;
    Ok(done("Push token updated"))
}

/// `POST /private/fundraiser-create`
pub async fn fundraiser_create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<FundDraft>,
) -> ApiResult<Reply<Fund>> {
    let fund = fundraisers::create(&state, &user, body).await?;
    Ok(ok("Fundraiser submitted for review", fund))
}

/// `POST /private/fundraiser-update`
pub async fn fundraiser_update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<FundUpdateBody>,
) -> ApiResult<Reply<Fund>> {
    let fund = fundraisers::update(&state, &user, &body.fund_uuid, body.draft).await?;
    Ok(ok("Fundraiser updated", fund))
}

/// `POST /private/my-fundraisers`
pub async fn my_fundraisers(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<MyFundsBody>,
) -> ApiResult<Reply<Vec<Fund>>> {
    let filter = FundFilter {
        status: body.status,
        owner: Some(user.u_uuid),
        ..Default::default()
    };
    let page = funds::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Fundraisers fetched", page))
}

/// `POST /private/donation-start`
pub async fn donation_start(
    State(state): State<Arc<AppState>>,
    MaybeUser(donor): MaybeUser,
    Json(body): Json<DonationRequest>,
) -> ApiResult<Reply<Settlement>> {
    let settled = settlement::start_donation(&state, donor.as_ref(), body).await?;
    Ok(ok("Donation successful", settled))
}

/// `POST /private/my-donations`
pub async fn my_donations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<PageBody>,
) -> ApiResult<Reply<Vec<Donation>>> {
    let filter = DonationFilter {
        donor: Some(user.u_uuid),
        ..Default::default()
    };
    let page = donations::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Donations fetched", page))
}

/// `POST /private/withdrawal-request`
pub async fn withdrawal_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<WithdrawalRequest>,
) -> ApiResult<Reply<Withdrawal>> {
    let withdrawal = withdrawal_service::request(&state, &user.u_uuid, body).await?;
    Ok(ok("Withdrawal request submitted", withdrawal))
}

/// `POST /private/my-withdrawals`
pub async fn my_withdrawals(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<PageBody>,
) -> ApiResult<Reply<Vec<Withdrawal>>> {
    let filter = WithdrawalFilter {
        user: Some(user.u_uuid),
        ..Default::default()
    };
    let page = withdrawals::list(&state.pool, &filter, body.page).await?;
    Ok(paged("Withdrawals fetched", page))
}

/// `POST /private/kyc-submit`
pub async fn kyc_submit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<KycInput>,
) -> ApiResult<Reply<KycRecord>> {
    let record = compliance::submit_kyc(&state, &user, body).await?;
    Ok(ok("KYC submitted for review", record))
}

/// `POST /private/kyc-status`: latest submission, if any.
pub async fn kyc_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Reply<Option<KycRecord>>> {
    let record = kyc::latest_for_user(&state.pool, &user.u_uuid).await?;
    Ok(ok("KYC status fetched", record))
}
