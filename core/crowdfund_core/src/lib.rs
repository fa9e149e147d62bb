//! # Crowdfund Core
//!
//! Pure domain rules shared by the crowdfunding backend. Nothing in this crate
//! performs I/O; the server loads records, asks these functions what the new
//! state should be, and persists the answer.
//!
//! | Concern              | Entry Point(s)                                        |
//! |----------------------|-------------------------------------------------------|
//! | Platform fee         | [`fee::calculate_fee`]                                |
//! | Fundraiser lifecycle | [`lifecycle::plan_fund_transition`]                   |
//! | Payout lifecycle     | [`lifecycle::plan_payout_transition`]                 |
//! | Withdrawal lifecycle | [`lifecycle::plan_withdrawal_transition`], [`withdrawal`] |
//! | Category deletion    | [`category::check_deletable`]                         |
//! | Error kinds          | [`errors`]                                            |
//! | Test assertions      | [`invariants`]                                        |
//!
//! ## Transition policy
//!
//! Status changes are caller-triggered. Under [`TransitionPolicy::Permissive`]
//! every requested move is applied and moves missing from the transition table
//! are merely reported; [`TransitionPolicy::Strict`] refuses them instead.

pub mod category;
pub mod errors;
pub mod fee;
pub mod invariants;
pub mod lifecycle;
pub mod types;
pub mod withdrawal;

pub use errors::{
    CategoryError, DonationError, ErrorClass, ErrorKind, FundError, KycError, PayoutError,
    WithdrawalError,
};
pub use fee::{calculate_fee, round_money, FeeBreakdown, PLATFORM_FEE_RATE};
pub use lifecycle::{FundAction, TransitionPolicy};
pub use types::{
    CategoryStatus, DonationStatus, FundStatus, KycStatus, ParseStatusError, PayoutStatus,
    ReportStatus, WithdrawalStatus,
};
