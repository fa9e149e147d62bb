//! Withdrawal request preconditions and wallet arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::WithdrawalError;
use crate::fee::round_money;

/// Destination bank account for a withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
}

impl BankDetails {
    /// Trimmed copy with the first missing field reported.
    pub fn validated(&self) -> Result<BankDetails, WithdrawalError> {
        let fields = [
            ("account_holder_name", &self.account_holder_name),
            ("account_number", &self.account_number),
            ("ifsc_code", &self.ifsc_code),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(WithdrawalError::MissingBankDetail(name));
            }
        }
        Ok(BankDetails {
            account_holder_name: self.account_holder_name.trim().to_string(),
            account_number: self.account_number.trim().to_string(),
            ifsc_code: self.ifsc_code.trim().to_ascii_uppercase(),
        })
    }
}

/// Checks that need no stored state: a positive amount, then every bank field.
pub fn check_input(amount: Decimal, bank: &BankDetails) -> Result<BankDetails, WithdrawalError> {
    if amount <= Decimal::ZERO {
        return Err(WithdrawalError::InvalidAmount);
    }
    bank.validated()
}

/// Check a new withdrawal request, in order: amount, bank fields, balance,
/// single pending request.
pub fn validate_request(
    amount: Decimal,
    bank: &BankDetails,
    balance: Decimal,
    has_pending: bool,
) -> Result<BankDetails, WithdrawalError> {
    let bank = check_input(amount, bank)?;
    if balance < amount {
        return Err(WithdrawalError::InsufficientBalance {
            balance,
            requested: amount,
        });
    }
    if has_pending {
        return Err(WithdrawalError::PendingRequestExists);
    }
    Ok(bank)
}

/// Balance after taking `amount` out at request time.
pub fn debit(balance: Decimal, amount: Decimal) -> Decimal {
    round_money(balance - amount)
}

/// Balance after a rejected request is credited back.
pub fn refund(balance: Decimal, amount: Decimal) -> Decimal {
    round_money(balance + amount)
}
