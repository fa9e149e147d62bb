//! Admin payout operations.

use crowdfund_core::lifecycle::{parse_payout_status, plan_payout_transition};
use crowdfund_core::{PayoutError, PayoutStatus};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::AppState;
use crate::db::now;
use crate::db::payouts::{self, Payout};
use crate::errors::ApiResult;

pub const DEFAULT_PAYOUT_REJECT_REASON: &str = "Rejected by admin";

async fn apply(
    state: &AppState,
    p_uuid: &str,
    target: PayoutStatus,
    reason: Option<String>,
) -> ApiResult<Payout> {
    let mut payout = payouts::find(&state.pool, p_uuid)
        .await?
        .ok_or(PayoutError::NotFound)?;

    let t = plan_payout_transition(payout.status, target, state.config.transition_policy)?;
    if !t.on_table {
        warn!(
            "Payout {p_uuid} moved outside the transition table ({} -> {})",
            t.from, t.to
        );
    }

    if let Some(reason) = reason {
        if !payout.meta.is_object() {
            payout.meta = json!({});
        }
        payout.meta["reason"] = Value::String(reason);
    }
    payout.status = t.to;
    payout.updated_at = now();

    payouts::set_status(&state.pool, p_uuid, payout.status, &payout.meta, payout.updated_at).await?;
    info!("Payout {p_uuid} {} -> {}", t.from, t.to);
    Ok(payout)
}

/// Mark the payout SENT.
pub async fn approve(state: &AppState, p_uuid: &str) -> ApiResult<Payout> {
    apply(state, p_uuid, PayoutStatus::Sent, None).await
}

/// Mark the payout FAILED and keep the reason in `meta.reason`.
pub async fn reject(state: &AppState, p_uuid: &str, reason: Option<String>) -> ApiResult<Payout> {
    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_PAYOUT_REJECT_REASON.to_string());
    apply(state, p_uuid, PayoutStatus::Failed, Some(reason)).await
}

/// Set a status given as free text. Anything outside PENDING/SENT/FAILED is
/// refused with `PAY-E1002`.
pub async fn update_status(state: &AppState, p_uuid: &str, raw: &str) -> ApiResult<Payout> {
    let target = parse_payout_status(raw)?;
    apply(state, p_uuid, target, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::{categories, funds, users};
    use crate::errors::ApiError;
    use crate::services::settlement::{start_donation, DonationRequest};
    use crowdfund_core::{ErrorKind, FundStatus, TransitionPolicy};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn settled_payout(state: &AppState) -> Payout {
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, Some("card")).await;
        let cat = categories::fixtures::category(&state.pool, "Animals", false).await;
        let fund = funds::fixtures::fund(&state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Active).await;
        let req = DonationRequest {
            fund_uuid: fund.f_uuid,
            amount: dec!(50),
            is_anonymous: false,
            payment_intent_id: None,
        };
        start_donation(state, None, req).await.unwrap().payout
    }

    #[tokio::test]
    async fn test_reject_records_reason() {
        let state = AppState::for_tests().await;
        let payout = settled_payout(&state).await;

        let failed = reject(&state, &payout.p_uuid, Some("card expired".into())).await.unwrap();
        assert_eq!(failed.status, PayoutStatus::Failed);

        let stored = payouts::find(&state.pool, &payout.p_uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Failed);
        assert_eq!(stored.meta["reason"], "card expired");
        assert_eq!(stored.amount, payout.amount);

        let resent = approve(&state, &payout.p_uuid).await.unwrap();
        assert_eq!(resent.status, PayoutStatus::Sent);
    }

    #[tokio::test]
    async fn test_update_status_accepts_known_values_only() {
        let state = AppState::for_tests().await;
        let payout = settled_payout(&state).await;

        let err = update_status(&state, &payout.p_uuid, "REFUNDED").await.unwrap_err();
        assert!(matches!(err, ApiError::Payout(PayoutError::UnknownStatus(_))));

        let updated = update_status(&state, &payout.p_uuid, " failed ").await.unwrap();
        assert_eq!(updated.status, PayoutStatus::Failed);
    }

    #[tokio::test]
    async fn test_sent_payout_back_to_pending_depends_on_policy() {
        let mut state = AppState::for_tests().await;
        let payout = settled_payout(&state).await;
        assert_eq!(payout.status, PayoutStatus::Sent);

        state.config.transition_policy = TransitionPolicy::Strict;
        let err = update_status(&state, &payout.p_uuid, "PENDING").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Payout(PayoutError::InvalidTransition {
                from: PayoutStatus::Sent,
                to: PayoutStatus::Pending
            })
        ));
        if let ApiError::Payout(e) = &err {
            assert_eq!(e.code(), "PAY-E1003");
        }
        let stored = payouts::find(&state.pool, &payout.p_uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Sent);

        state.config.transition_policy = TransitionPolicy::Permissive;
        let pending = update_status(&state, &payout.p_uuid, "PENDING").await.unwrap();
        assert_eq!(pending.status, PayoutStatus::Pending);
        let stored = payouts::find(&state.pool, &payout.p_uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_payout_is_not_found() {
        let state = AppState::for_tests().await;
        let err = approve(&state, "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::Payout(PayoutError::NotFound)));
    }
}
