//! Platform fee calculation.
//!
//! The platform keeps 2.8% of every gross donation. Both the fee and the net
//! amount are rounded to cents, so `fee + net` equals the gross amount rounded
//! to cents.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fraction of a gross donation retained by the platform.
pub const PLATFORM_FEE_RATE: Decimal = dec!(0.028);

/// Number of decimal places money is kept at.
pub const MONEY_SCALE: u32 = 2;

/// Result of splitting a gross amount into platform fee and owner payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub fee: Decimal,
    pub net: Decimal,
}

/// Round to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Split `amount` into fee and net.
///
/// No bounds checking happens here: zero and negative amounts go through the
/// same arithmetic. Callers validate the amount.
///
/// ```
/// use crowdfund_core::fee::calculate_fee;
/// use rust_decimal_macros::dec;
///
/// let split = calculate_fee(dec!(100));
/// assert_eq!(split.fee, dec!(2.80));
/// assert_eq!(split.net, dec!(97.20));
/// ```
pub fn calculate_fee(amount: Decimal) -> FeeBreakdown {
    let fee = round_money(amount * PLATFORM_FEE_RATE);
    let net = round_money(amount - fee);
    FeeBreakdown { fee, net }
}
