//! Wallet withdrawals.
//!
//! The balance is debited when the request is made and credited back when an
//! admin rejects it. Both balance moves happen in the same transaction as the
//! withdrawal write.

use crowdfund_core::lifecycle::plan_withdrawal_transition;
use crowdfund_core::withdrawal::{self as rules, BankDetails};
use crowdfund_core::{WithdrawalError, WithdrawalStatus};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::AppState;
use crate::db::withdrawals::{self, Withdrawal};
use crate::db::{new_uuid, now, users};
use crate::errors::ApiResult;

pub const DEFAULT_WITHDRAWAL_REJECT_REASON: &str = "Rejected by admin";

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub account_holder_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub ifsc_code: String,
}

impl WithdrawalRequest {
    fn bank(&self) -> BankDetails {
        BankDetails {
            account_holder_name: self.account_holder_name.clone(),
            account_number: self.account_number.clone(),
            ifsc_code: self.ifsc_code.clone(),
        }
    }
}

pub async fn request(state: &AppState, u_uuid: &str, req: WithdrawalRequest) -> ApiResult<Withdrawal> {
    let bank = rules::check_input(req.amount, &req.bank())?;

    let mut tx = state.pool.begin().await?;

    let user = users::find(&mut *tx, u_uuid)
        .await?
        .ok_or(WithdrawalError::UserNotFound)?;
    let pending = withdrawals::has_pending(&mut *tx, u_uuid).await?;
    let bank = rules::validate_request(req.amount, &bank, user.balance, pending)?;

    let ts = now();
    let balance = rules::debit(user.balance, req.amount);
    users::set_balance(&mut *tx, u_uuid, balance, ts).await?;

    let withdrawal = Withdrawal {
        w_uuid: new_uuid(),
        w_fk_uc_uuid: u_uuid.to_string(),
        amount: req.amount,
        account_holder_name: bank.account_holder_name,
        account_number: bank.account_number,
        ifsc_code: bank.ifsc_code,
        status: WithdrawalStatus::Pending,
        admin_note: None,
        created_at: ts,
        updated_at: ts,
    };
    withdrawals::insert(&mut *tx, &withdrawal).await?;
    tx.commit().await?;

    info!(
        "Withdrawal {} of {} requested by {u_uuid}, balance now {balance}",
        withdrawal.w_uuid, withdrawal.amount
    );
    Ok(withdrawal)
}

fn plan(
    state: &AppState,
    withdrawal: &Withdrawal,
    target: WithdrawalStatus,
) -> ApiResult<()> {
    let t = plan_withdrawal_transition(withdrawal.status, target, state.config.transition_policy)?;
    if !t.on_table {
        warn!(
            "Withdrawal {} moved outside the transition table ({} -> {})",
            withdrawal.w_uuid, t.from, t.to
        );
    }
    Ok(())
}

async fn set_status(
    state: &AppState,
    w_uuid: &str,
    target: WithdrawalStatus,
) -> ApiResult<Withdrawal> {
    let mut withdrawal = withdrawals::find(&state.pool, w_uuid)
        .await?
        .ok_or(WithdrawalError::NotFound)?;
    plan(state, &withdrawal, target)?;

    let from = withdrawal.status;
    withdrawal.status = target;
    withdrawal.updated_at = now();
    withdrawals::set_status(&state.pool, w_uuid, target, None, withdrawal.updated_at).await?;
    info!("Withdrawal {w_uuid} {from} -> {target}");
    Ok(withdrawal)
}

pub async fn mark_processing(state: &AppState, w_uuid: &str) -> ApiResult<Withdrawal> {
    set_status(state, w_uuid, WithdrawalStatus::Processing).await
}

/// Funds went out; the balance was already debited at request time.
pub async fn approve(state: &AppState, w_uuid: &str) -> ApiResult<Withdrawal> {
    let withdrawal = set_status(state, w_uuid, WithdrawalStatus::Completed).await?;
    notify_user(state, &withdrawal, "Your withdrawal is complete").await;
    Ok(withdrawal)
}

/// Refund the amount onto the current balance and record the reason.
pub async fn reject(state: &AppState, w_uuid: &str, reason: Option<String>) -> ApiResult<Withdrawal> {
    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_WITHDRAWAL_REJECT_REASON.to_string());

    let mut tx = state.pool.begin().await?;

    let mut withdrawal = withdrawals::find(&mut *tx, w_uuid)
        .await?
        .ok_or(WithdrawalError::NotFound)?;
    plan(state, &withdrawal, WithdrawalStatus::Rejected)?;

    let user = users::find(&mut *tx, &withdrawal.w_fk_uc_uuid)
        .await?
        .ok_or(WithdrawalError::UserNotFound)?;

    let ts = now();
    let balance = rules::refund(user.balance, withdrawal.amount);
    users::set_balance(&mut *tx, &user.u_uuid, balance, ts).await?;
    withdrawals::set_status(&mut *tx, w_uuid, WithdrawalStatus::Rejected, Some(&reason), ts).await?;
    tx.commit().await?;

    info!(
        "Withdrawal {w_uuid} rejected, {} refunded to {} (balance {balance})",
        withdrawal.amount, user.u_uuid
    );

    withdrawal.status = WithdrawalStatus::Rejected;
    withdrawal.admin_note = Some(reason);
    withdrawal.updated_at = ts;
    notify_user(state, &withdrawal, "Your withdrawal was rejected").await;
    Ok(withdrawal)
}

async fn notify_user(state: &AppState, withdrawal: &Withdrawal, subject: &str) {
    let user = match users::find(&state.pool, &withdrawal.w_fk_uc_uuid).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            warn!("User lookup for withdrawal {} failed: {e}", withdrawal.w_uuid);
            return;
        }
    };
    let mut body = format!("Withdrawal of {} is now {}.", withdrawal.amount, withdrawal.status);
    if let Some(note) = &withdrawal.admin_note {
        body.push_str(&format!(" Note: {note}"));
    }
    state.outbox.mail(&user.email, subject, body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::errors::ApiError;
    use crowdfund_core::invariants;
    use crowdfund_core::TransitionPolicy;
    use rust_decimal_macros::dec;

    fn req(amount: Decimal) -> WithdrawalRequest {
        WithdrawalRequest {
            amount,
            account_holder_name: "Asha Rao".into(),
            account_number: "001122334455".into(),
            ifsc_code: "sbin0001234".into(),
        }
    }

    async fn balance_of(state: &AppState, u_uuid: &str) -> Decimal {
        users::find(&state.pool, u_uuid).await.unwrap().unwrap().balance
    }

    #[tokio::test]
    async fn test_request_debits_and_reject_refunds() {
        let state = AppState::for_tests().await;
        let user = users::fixtures::user(&state.pool, Role::User, dec!(500), None).await;

        let w = request(&state, &user.u_uuid, req(dec!(200))).await.unwrap();
        assert_eq!(w.status, WithdrawalStatus::Pending);
        assert_eq!(w.ifsc_code, "SBIN0001234");
        assert_eq!(balance_of(&state, &user.u_uuid).await, dec!(300));

        let rejected = reject(&state, &w.w_uuid, Some("Bank details mismatch".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);

        let after = balance_of(&state, &user.u_uuid).await;
        invariants::assert_refund_exact(dec!(300), after, w.amount);
        invariants::assert_balance_non_negative(after);

        let stored = withdrawals::find(&state.pool, &w.w_uuid).await.unwrap().unwrap();
        assert_eq!(stored.admin_note.as_deref(), Some("Bank details mismatch"));
    }

    #[tokio::test]
    async fn test_insufficient_balance_writes_nothing() {
        let state = AppState::for_tests().await;
        let user = users::fixtures::user(&state.pool, Role::User, dec!(50), None).await;

        let err = request(&state, &user.u_uuid, req(dec!(80))).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Withdrawal(WithdrawalError::InsufficientBalance { .. })
        ));
        assert_eq!(balance_of(&state, &user.u_uuid).await, dec!(50));
    }

    #[tokio::test]
    async fn test_input_checked_before_user_lookup() {
        let state = AppState::for_tests().await;

        let err = request(&state, "no-such-user", req(Decimal::ZERO)).await.unwrap_err();
        assert!(matches!(err, ApiError::Withdrawal(WithdrawalError::InvalidAmount)));

        let mut missing_ifsc = req(dec!(10));
        missing_ifsc.ifsc_code = "  ".into();
        let err = request(&state, "no-such-user", missing_ifsc).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Withdrawal(WithdrawalError::MissingBankDetail("ifsc_code"))
        ));

        let err = request(&state, "no-such-user", req(dec!(10))).await.unwrap_err();
        assert!(matches!(err, ApiError::Withdrawal(WithdrawalError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_second_pending_request_is_refused() {
        let state = AppState::for_tests().await;
        let user = users::fixtures::user(&state.pool, Role::User, dec!(500), None).await;

        request(&state, &user.u_uuid, req(dec!(100))).await.unwrap();
        let err = request(&state, &user.u_uuid, req(dec!(100))).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Withdrawal(WithdrawalError::PendingRequestExists)
        ));
        assert_eq!(balance_of(&state, &user.u_uuid).await, dec!(400));
    }

    #[tokio::test]
    async fn test_approve_keeps_debited_balance() {
        let state = AppState::for_tests().await;
        let user = users::fixtures::user(&state.pool, Role::User, dec!(500), None).await;
        let w = request(&state, &user.u_uuid, req(dec!(125.50))).await.unwrap();

        mark_processing(&state, &w.w_uuid).await.unwrap();
        let done = approve(&state, &w.w_uuid).await.unwrap();
        assert_eq!(done.status, WithdrawalStatus::Completed);
        assert_eq!(balance_of(&state, &user.u_uuid).await, dec!(374.50));
    }

    #[tokio::test]
    async fn test_strict_policy_blocks_double_reject() {
        let mut state = AppState::for_tests().await;
        state.config.transition_policy = TransitionPolicy::Strict;
        let user = users::fixtures::user(&state.pool, Role::User, dec!(100), None).await;
        let w = request(&state, &user.u_uuid, req(dec!(40))).await.unwrap();

        reject(&state, &w.w_uuid, None).await.unwrap();
        let err = reject(&state, &w.w_uuid, None).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Withdrawal(WithdrawalError::InvalidTransition { .. })
        ));
        assert_eq!(balance_of(&state, &user.u_uuid).await, dec!(100));
    }
}
