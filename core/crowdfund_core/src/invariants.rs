//! Assertion helpers for ledger invariants, used by test suites.
//!
//! Each helper panics with the violated invariant's description so that a
//! failing test points straight at the broken rule.

use rust_decimal::Decimal;

use crate::fee::{calculate_fee, round_money};
use crate::types::FundStatus;

/// Donation split: `amount_to_owner + platform_fee == amount` (rounded) and
/// the fee is exactly the platform rate.
pub fn assert_donation_split(amount: Decimal, platform_fee: Decimal, amount_to_owner: Decimal) {
    let expected = calculate_fee(amount);
    assert_eq!(
        platform_fee, expected.fee,
        "donation fee {platform_fee} is not the platform fee of {amount}"
    );
    assert_eq!(
        platform_fee + amount_to_owner,
        round_money(amount),
        "fee {platform_fee} + net {amount_to_owner} does not add up to {amount}"
    );
}

/// Payout created alongside a donation carries the donation's net and fee.
pub fn assert_payout_matches_donation(
    amount_to_owner: Decimal,
    platform_fee: Decimal,
    payout_amount: Decimal,
    payout_fee: Decimal,
) {
    assert_eq!(
        payout_amount, amount_to_owner,
        "payout amount {payout_amount} differs from donation net {amount_to_owner}"
    );
    assert_eq!(
        payout_fee, platform_fee,
        "payout fee {payout_fee} differs from donation fee {platform_fee}"
    );
}

/// Wallet balances never go negative through withdrawals.
pub fn assert_balance_non_negative(balance: Decimal) {
    assert!(
        balance >= Decimal::ZERO,
        "wallet balance went negative: {balance}"
    );
}

/// A refund credits exactly the withdrawn amount on top of the balance seen
/// at rejection time.
pub fn assert_refund_exact(balance_before: Decimal, balance_after: Decimal, amount: Decimal) {
    assert_eq!(
        balance_after,
        balance_before + amount,
        "refund broken: {balance_before} + {amount} != {balance_after}"
    );
}

/// `pause_reason` is cleared whenever a fund is back to ACTIVE via resume.
pub fn assert_resumed_without_reason(status: FundStatus, pause_reason: Option<&str>) {
    assert_eq!(status, FundStatus::Active, "resumed fund is {status}");
    assert!(
        pause_reason.is_none(),
        "resumed fund still carries pause_reason {pause_reason:?}"
    );
}
