//! Error kinds, one enum per domain module.
//!
//! Every variant carries a stable code (`DON-E1002`, `WDR-E1004`, ...) and an
//! [`ErrorClass`] that the HTTP layer maps to a status code.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{FundStatus, PayoutStatus, WithdrawalStatus};

/// Coarse classification used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input (400).
    Invalid,
    /// Referenced record does not exist (404).
    NotFound,
    /// Request conflicts with current state (409).
    Conflict,
    /// Caller may not touch this record (403).
    Forbidden,
}

/// Common surface of every domain error enum.
pub trait ErrorKind: std::error::Error {
    fn code(&self) -> &'static str;
    fn class(&self) -> ErrorClass;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DonationError {
    #[error("Donation amount must be greater than zero")]
    InvalidAmount,
    #[error("Fundraiser not found")]
    FundNotFound,
    #[error("Requester payout card not found. Donation stopped.")]
    PayoutCardMissing,
    #[error("Fundraiser is {0} and not accepting donations")]
    FundNotAcceptingDonations(FundStatus),
    #[error("Donation not found")]
    NotFound,
}

impl ErrorKind for DonationError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "DON-E1001",
            Self::FundNotFound => "DON-E1002",
            Self::PayoutCardMissing => "DON-E1003",
            Self::FundNotAcceptingDonations(_) => "DON-E1004",
            Self::NotFound => "DON-E1005",
        }
    }

    fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAmount | Self::PayoutCardMissing => ErrorClass::Invalid,
            Self::FundNotFound | Self::NotFound => ErrorClass::NotFound,
            Self::FundNotAcceptingDonations(_) => ErrorClass::Conflict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Fundraiser not found")]
    NotFound,
    #[error("Cannot move fundraiser from {from} to {to}")]
    InvalidTransition { from: FundStatus, to: FundStatus },
    #[error("Only the fundraiser owner may do this")]
    NotOwner,
    #[error("Goal amount must be greater than zero")]
    InvalidAmount,
    #[error("Deadline must be in the future")]
    DeadlineInPast,
    #[error("At most {max} images are allowed, got {got}")]
    TooManyImages { max: usize, got: usize },
    #[error("Category not found or inactive")]
    CategoryUnavailable,
}

impl ErrorKind for FundError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "FUND-E1001",
            Self::NotFound => "FUND-E1002",
            Self::InvalidTransition { .. } => "FUND-E1003",
            Self::NotOwner => "FUND-E1004",
            Self::InvalidAmount => "FUND-E1005",
            Self::DeadlineInPast => "FUND-E1006",
            Self::TooManyImages { .. } => "FUND-E1007",
            Self::CategoryUnavailable => "FUND-E1008",
        }
    }

    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound => ErrorClass::NotFound,
            Self::InvalidTransition { .. } => ErrorClass::Conflict,
            Self::NotOwner => ErrorClass::Forbidden,
            _ => ErrorClass::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    #[error("Payout not found")]
    NotFound,
    #[error("Unknown payout status: {0}")]
    UnknownStatus(String),
    #[error("Cannot move payout from {from} to {to}")]
    InvalidTransition { from: PayoutStatus, to: PayoutStatus },
}

impl ErrorKind for PayoutError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "PAY-E1001",
            Self::UnknownStatus(_) => "PAY-E1002",
            Self::InvalidTransition { .. } => "PAY-E1003",
        }
    }

    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound => ErrorClass::NotFound,
            Self::UnknownStatus(_) => ErrorClass::Invalid,
            Self::InvalidTransition { .. } => ErrorClass::Conflict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawalError {
    #[error("Withdrawal amount must be greater than zero")]
    InvalidAmount,
    #[error("{0} is required")]
    MissingBankDetail(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("Insufficient balance: available {balance}, requested {requested}")]
    InsufficientBalance { balance: Decimal, requested: Decimal },
    #[error("A withdrawal request is already pending")]
    PendingRequestExists,
    #[error("Withdrawal not found")]
    NotFound,
    #[error("Cannot move withdrawal from {from} to {to}")]
    InvalidTransition {
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    },
}

impl ErrorKind for WithdrawalError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "WDR-E1001",
            Self::MissingBankDetail(_) => "WDR-E1002",
            Self::UserNotFound => "WDR-E1003",
            Self::InsufficientBalance { .. } => "WDR-E1004",
            Self::PendingRequestExists => "WDR-E1005",
            Self::NotFound => "WDR-E1006",
            Self::InvalidTransition { .. } => "WDR-E1007",
        }
    }

    fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAmount | Self::MissingBankDetail(_) | Self::InsufficientBalance { .. } => {
                ErrorClass::Invalid
            }
            Self::UserNotFound | Self::NotFound => ErrorClass::NotFound,
            Self::PendingRequestExists | Self::InvalidTransition { .. } => ErrorClass::Conflict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("Category name is required")]
    NameRequired,
    #[error("Category not found")]
    NotFound,
    #[error("Default category cannot be deleted")]
    DefaultProtected,
    #[error("Category is used by {0} active or pending fundraiser(s) and cannot be deleted")]
    InUse(i64),
    #[error("A category with this name already exists")]
    DuplicateName,
}

impl ErrorKind for CategoryError {
    fn code(&self) -> &'static str {
        match self {
            Self::NameRequired => "CAT-E1001",
            Self::NotFound => "CAT-E1002",
            Self::DefaultProtected => "CAT-E1003",
            Self::InUse(_) => "CAT-E1004",
            Self::DuplicateName => "CAT-E1005",
        }
    }

    fn class(&self) -> ErrorClass {
        match self {
            Self::NameRequired => ErrorClass::Invalid,
            Self::NotFound => ErrorClass::NotFound,
            Self::DefaultProtected | Self::InUse(_) | Self::DuplicateName => ErrorClass::Conflict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KycError {
    #[error("KYC record not found")]
    NotFound,
    #[error("A KYC submission is already pending review")]
    AlreadyPending,
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl ErrorKind for KycError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "KYC-E1001",
            Self::AlreadyPending => "KYC-E1002",
            Self::MissingField(_) => "KYC-E1003",
        }
    }

    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound => ErrorClass::NotFound,
            Self::AlreadyPending => ErrorClass::Conflict,
            Self::MissingField(_) => ErrorClass::Invalid,
        }
    }
}
