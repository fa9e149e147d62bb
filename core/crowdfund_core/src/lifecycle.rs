//! Status transition tables for fundraisers, payouts and withdrawals.
//!
//! Admin actions name a target status directly. The tables below describe the
//! intended flow; whether a move outside the table is applied or refused is
//! decided by [`TransitionPolicy`].

use serde::{Deserialize, Serialize};

use crate::errors::{FundError, PayoutError, WithdrawalError};
use crate::types::{FundStatus, PayoutStatus, WithdrawalStatus};

pub const DEFAULT_REJECT_REASON: &str = "Rejected by admin";
pub const DEFAULT_PAUSE_REASON: &str = "Paused by admin";
pub const DEFAULT_CLOSE_REASON: &str = "Closed by admin";

/// How off-table transitions are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Apply every requested move; report off-table ones.
    #[default]
    Permissive,
    /// Refuse moves that are not in the table.
    Strict,
}

/// A planned status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
    /// `false` when the move is outside the transition table and was only
    /// allowed because the policy is permissive.
    pub on_table: bool,
}

fn plan<S, E>(
    from: S,
    to: S,
    allowed: &[S],
    policy: TransitionPolicy,
    refuse: impl FnOnce(S, S) -> E,
) -> Result<Transition<S>, E>
where
    S: Copy + PartialEq,
{
    let on_table = allowed.contains(&to);
    if !on_table && policy == TransitionPolicy::Strict {
        return Err(refuse(from, to));
    }
    Ok(Transition { from, to, on_table })
}

fn clean_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

// ─────────────────────────────────────────────────────────
// Fundraisers
// ─────────────────────────────────────────────────────────

/// Admin moderation actions on a fundraiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundAction {
    Approve,
    Reject,
    Pause,
    Resume,
    Close,
}

impl FundAction {
    pub fn target(&self) -> FundStatus {
        match self {
            Self::Approve | Self::Resume => FundStatus::Active,
            Self::Reject => FundStatus::Rejected,
            Self::Pause => FundStatus::Paused,
            Self::Close => FundStatus::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Close => "close",
        }
    }
}

impl FundStatus {
    /// Statuses reachable from `self` in the intended flow.
    pub fn allowed_next(&self) -> &'static [FundStatus] {
        match self {
            Self::Pending => &[FundStatus::Active, FundStatus::Rejected],
            Self::Active => &[FundStatus::Paused, FundStatus::Closed],
            Self::Paused => &[FundStatus::Active, FundStatus::Closed],
            Self::Rejected | Self::Closed => &[],
        }
    }
}

/// What happens to `pause_reason` as part of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonUpdate {
    Keep,
    Set(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundTransition {
    pub action: FundAction,
    pub transition: Transition<FundStatus>,
    pub reason: ReasonUpdate,
}

/// Work out the effect of `action` on a fund currently in `current`.
pub fn plan_fund_transition(
    current: FundStatus,
    action: FundAction,
    reason: Option<String>,
    policy: TransitionPolicy,
) -> Result<FundTransition, FundError> {
    let transition = plan(
        current,
        action.target(),
        current.allowed_next(),
        policy,
        |from, to| FundError::InvalidTransition { from, to },
    )?;

    let reason = clean_reason(reason);
    let reason = match action {
        FundAction::Approve => ReasonUpdate::Keep,
        FundAction::Resume => ReasonUpdate::Clear,
        FundAction::Reject => {
            ReasonUpdate::Set(reason.unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string()))
        }
        FundAction::Pause => {
            ReasonUpdate::Set(reason.unwrap_or_else(|| DEFAULT_PAUSE_REASON.to_string()))
        }
        FundAction::Close => {
            ReasonUpdate::Set(reason.unwrap_or_else(|| DEFAULT_CLOSE_REASON.to_string()))
        }
    };

    Ok(FundTransition {
        action,
        transition,
        reason,
    })
}

// ─────────────────────────────────────────────────────────
// Payouts
// ─────────────────────────────────────────────────────────

impl PayoutStatus {
    pub fn allowed_next(&self) -> &'static [PayoutStatus] {
        match self {
            Self::Pending => &[PayoutStatus::Sent, PayoutStatus::Failed],
            Self::Sent => &[PayoutStatus::Failed],
            Self::Failed => &[PayoutStatus::Pending, PayoutStatus::Sent],
        }
    }
}

pub fn plan_payout_transition(
    current: PayoutStatus,
    target: PayoutStatus,
    policy: TransitionPolicy,
) -> Result<Transition<PayoutStatus>, PayoutError> {
    plan(
        current,
        target,
        current.allowed_next(),
        policy,
        |from, to| PayoutError::InvalidTransition { from, to },
    )
}

/// Parse a free-form status string from the admin tooling.
pub fn parse_payout_status(raw: &str) -> Result<PayoutStatus, PayoutError> {
    raw.trim()
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| PayoutError::UnknownStatus(raw.to_string()))
}

// ─────────────────────────────────────────────────────────
// Withdrawals
// ─────────────────────────────────────────────────────────

impl WithdrawalStatus {
    pub fn allowed_next(&self) -> &'static [WithdrawalStatus] {
        match self {
            Self::Pending => &[
                WithdrawalStatus::Processing,
                WithdrawalStatus::Completed,
                WithdrawalStatus::Rejected,
            ],
            Self::Processing => &[WithdrawalStatus::Completed, WithdrawalStatus::Rejected],
            Self::Completed | Self::Rejected => &[],
        }
    }
}

pub fn plan_withdrawal_transition(
    current: WithdrawalStatus,
    target: WithdrawalStatus,
    policy: TransitionPolicy,
) -> Result<Transition<WithdrawalStatus>, WithdrawalError> {
    plan(
        current,
        target,
        current.allowed_next(),
        policy,
        |from, to| WithdrawalError::InvalidTransition { from, to },
    )
}
