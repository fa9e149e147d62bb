//! Donation settlement: turns a donation request into a Donation + Payout
//! pair, plus the admin overrides and payment-provider callbacks that move a
//! donation's status afterwards.

use crowdfund_core::{
    calculate_fee, DonationError, DonationStatus, FundStatus, PayoutStatus, TransitionPolicy,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::AppState;
use crate::db::donations::{self, Donation};
use crate::db::payouts::{self, Payout};
use crate::db::users::User;
use crate::db::{self, funds, new_uuid, now};
use crate::errors::ApiResult;
use crate::notify::PushMessage;

pub const DEFAULT_FRAUD_REASON: &str = "Marked as fraud by admin";

#[derive(Debug, Clone, Deserialize)]
pub struct DonationRequest {
    pub fund_uuid: String,
    pub amount: Decimal,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub donation: Donation,
    pub payout: Payout,
}

/// Settle a donation whose payment already succeeded upstream.
///
/// Nothing is written unless the fund exists and its owner has a payout card
/// on file. The donation and its payout are written in one transaction.
pub async fn start_donation(
    state: &AppState,
    donor: Option<&User>,
    req: DonationRequest,
) -> ApiResult<Settlement> {
    if req.amount <= Decimal::ZERO {
        return Err(DonationError::InvalidAmount.into());
    }

    let fund = funds::find(&state.pool, &req.fund_uuid)
        .await?
        .ok_or(DonationError::FundNotFound)?;

    let owner = db::users::find(&state.pool, &fund.f_fk_uc_uuid)
        .await?
        .filter(|owner| owner.payout_card_token.is_some())
        .ok_or(DonationError::PayoutCardMissing)?;

    if fund.status != FundStatus::Active {
        if state.config.transition_policy == TransitionPolicy::Strict {
            return Err(DonationError::FundNotAcceptingDonations(fund.status).into());
        }
        warn!(
            "Donation accepted for fund {} in status {}",
            fund.f_uuid, fund.status
        );
    }

    let split = calculate_fee(req.amount);
    let ts = now();

    let donation = Donation {
        d_uuid: new_uuid(),
        d_fk_uc_uuid: donor.map(|d| d.u_uuid.clone()),
        d_fk_f_uuid: fund.f_uuid.clone(),
        amount: req.amount,
        platform_fee: split.fee,
        amount_to_owner: split.net,
        is_anonymous: req.is_anonymous || donor.is_none(),
        status: DonationStatus::Success,
        meta: json!({}),
        payment_intent_id: req.payment_intent_id.filter(|id| !id.trim().is_empty()),
        created_at: ts,
        updated_at: ts,
    };
    let payout = Payout {
        p_uuid: new_uuid(),
        p_fk_d_uuid: donation.d_uuid.clone(),
        p_fk_uc_uuid: owner.u_uuid.clone(),
        amount: split.net,
        fee: split.fee,
        status: PayoutStatus::Sent,
        meta: json!({}),
        created_at: ts,
        updated_at: ts,
    };

    let mut tx = state.pool.begin().await?;
    donations::insert(&mut *tx, &donation).await?;
    payouts::insert(&mut *tx, &payout).await?;
    tx.commit().await?;

    info!(
        "Donation {} of {} to fund {} settled (fee {}, payout {})",
        donation.d_uuid, donation.amount, fund.f_uuid, split.fee, split.net
    );

    let body = format!(
        "Your fundraiser \"{}\" received a donation of {}. {} is on its way to your payout card.",
        fund.title, donation.amount, payout.amount
    );
    state
        .outbox
        .mail(&owner.email, "You received a donation", body.clone());
    state.outbox.push(PushMessage {
        user_id: owner.u_uuid.clone(),
        title: "New donation".to_string(),
        body,
        tokens: owner.push_token.iter().cloned().collect(),
        data: json!({ "fund_uuid": fund.f_uuid, "d_uuid": donation.d_uuid }),
    });

    Ok(Settlement { donation, payout })
}

/// Admin override: the donation is legitimate.
pub async fn mark_safe(state: &AppState, d_uuid: &str) -> ApiResult<Donation> {
    let mut donation = donations::find(&state.pool, d_uuid)
        .await?
        .ok_or(DonationError::NotFound)?;

    if let Value::Object(map) = &mut donation.meta {
        map.remove("fraud_reason");
    }
    donation.status = DonationStatus::Success;
    donation.updated_at = now();

    donations::set_status(
        &state.pool,
        d_uuid,
        donation.status,
        &donation.meta,
        donation.updated_at,
    )
    .await?;
    info!("Donation {d_uuid} marked safe");
    Ok(donation)
}

/// Admin override: the donation is fraudulent. The reason is kept in `meta`.
pub async fn mark_fraud(state: &AppState, d_uuid: &str, reason: Option<String>) -> ApiResult<Donation> {
    let mut donation = donations::find(&state.pool, d_uuid)
        .await?
        .ok_or(DonationError::NotFound)?;

    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_FRAUD_REASON.to_string());

    if !donation.meta.is_object() {
        donation.meta = json!({});
    }
    donation.meta["fraud_reason"] = Value::String(reason);
    donation.status = DonationStatus::Failed;
    donation.updated_at = now();

    donations::set_status(
        &state.pool,
        d_uuid,
        donation.status,
        &donation.meta,
        donation.updated_at,
    )
    .await?;
    warn!("Donation {d_uuid} marked as fraud");
    Ok(donation)
}

/// Apply a payment-provider outcome to the donation carrying `payment_intent_id`.
///
/// Returns `None` when no donation references the intent.
pub async fn apply_payment_outcome(
    state: &AppState,
    payment_intent_id: &str,
    status: DonationStatus,
) -> ApiResult<Option<Donation>> {
    let Some(mut donation) = donations::find_by_payment_intent(&state.pool, payment_intent_id).await?
    else {
        return Ok(None);
    };

    donation.status = status;
    donation.updated_at = now();
    donations::set_status(
        &state.pool,
        &donation.d_uuid,
        status,
        &donation.meta,
        donation.updated_at,
    )
    .await?;
    info!(
        "Donation {} set to {} by payment intent {payment_intent_id}",
        donation.d_uuid, status
    );
    Ok(Some(donation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::{categories, users};
    use crate::errors::ApiError;
    use crowdfund_core::invariants;
    use rust_decimal_macros::dec;

    async fn active_fund(state: &AppState, card: Option<&str>) -> (User, funds::Fund) {
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, card).await;
        let cat = categories::fixtures::category(&state.pool, "Medical", false).await;
        let fund =
            funds::fixtures::fund(&state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Active).await;
        (owner, fund)
    }

    fn request(fund: &funds::Fund, amount: Decimal) -> DonationRequest {
        DonationRequest {
            fund_uuid: fund.f_uuid.clone(),
            amount,
            is_anonymous: false,
            payment_intent_id: None,
        }
    }

    async fn count(state: &AppState, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&state.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_settlement_creates_linked_payout() {
        let state = AppState::for_tests().await;
        let (owner, fund) = active_fund(&state, Some("card_tok_1")).await;
        let donor = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;

        let settled = start_donation(&state, Some(&donor), request(&fund, dec!(100)))
            .await
            .unwrap();

        let d = &settled.donation;
        let p = &settled.payout;
        invariants::assert_donation_split(d.amount, d.platform_fee, d.amount_to_owner);
        invariants::assert_payout_matches_donation(d.amount_to_owner, d.platform_fee, p.amount, p.fee);
        assert_eq!(p.p_fk_d_uuid, d.d_uuid);
        assert_eq!(p.p_fk_uc_uuid, owner.u_uuid);
        assert_eq!(p.status, PayoutStatus::Sent);
        assert_eq!(d.d_fk_uc_uuid.as_deref(), Some(donor.u_uuid.as_str()));

        let stored = payouts::find_by_donation(&state.pool, &d.d_uuid).await.unwrap().unwrap();
        assert_eq!(stored.p_uuid, p.p_uuid);
        assert_eq!(stored.amount, dec!(97.2));
    }

    #[tokio::test]
    async fn test_missing_payout_card_writes_nothing() {
        let state = AppState::for_tests().await;
        let (_, fund) = active_fund(&state, None).await;

        let err = start_donation(&state, None, request(&fund, dec!(25))).await.unwrap_err();
        assert!(matches!(err, ApiError::Donation(DonationError::PayoutCardMissing)));
        assert_eq!(count(&state, "donations").await, 0);
        assert_eq!(count(&state, "payouts").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_fund_is_not_found() {
        let state = AppState::for_tests().await;
        let req = DonationRequest {
            fund_uuid: "missing".into(),
            amount: dec!(10),
            is_anonymous: true,
            payment_intent_id: None,
        };
        let err = start_donation(&state, None, req).await.unwrap_err();
        assert!(matches!(err, ApiError::Donation(DonationError::FundNotFound)));
    }

    #[tokio::test]
    async fn test_unauthenticated_donation_is_anonymous() {
        let state = AppState::for_tests().await;
        let (_, fund) = active_fund(&state, Some("card")).await;

        let settled = start_donation(&state, None, request(&fund, dec!(10))).await.unwrap();
        assert!(settled.donation.is_anonymous);
        assert!(settled.donation.d_fk_uc_uuid.is_none());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_undo_settlement() {
        let notifier = std::sync::Arc::new(crate::notify::testing::RecordingNotifier::failing());
        let state = AppState::for_tests_with(notifier).await;
        let (_, fund) = active_fund(&state, Some("card")).await;

        start_donation(&state, None, request(&fund, dec!(40))).await.unwrap();
        state.outbox.drain().await;
        assert_eq!(count(&state, "donations").await, 1);
        assert_eq!(count(&state, "payouts").await, 1);
    }

    #[tokio::test]
    async fn test_fraud_then_safe_overrides() {
        let state = AppState::for_tests().await;
        let (_, fund) = active_fund(&state, Some("card")).await;
        let settled = start_donation(&state, None, request(&fund, dec!(60))).await.unwrap();
        let id = settled.donation.d_uuid;

        let flagged = mark_fraud(&state, &id, Some("stolen card".into())).await.unwrap();
        assert_eq!(flagged.status, DonationStatus::Failed);
        let stored = donations::find(&state.pool, &id).await.unwrap().unwrap();
        assert_eq!(stored.meta["fraud_reason"], "stolen card");

        let cleared = mark_safe(&state, &id).await.unwrap();
        assert_eq!(cleared.status, DonationStatus::Success);
        let stored = donations::find(&state.pool, &id).await.unwrap().unwrap();
        assert!(stored.meta.get("fraud_reason").is_none());
    }

    #[tokio::test]
    async fn test_payment_outcome_matches_intent() {
        let state = AppState::for_tests().await;
        let (_, fund) = active_fund(&state, Some("card")).await;
        let mut req = request(&fund, dec!(15));
        req.payment_intent_id = Some("pi_abc".into());
        start_donation(&state, None, req).await.unwrap();

        let updated = apply_payment_outcome(&state, "pi_abc", DonationStatus::Failed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, DonationStatus::Failed);
        assert!(apply_payment_outcome(&state, "pi_other", DonationStatus::Success)
            .await
            .unwrap()
            .is_none());
    }
}
