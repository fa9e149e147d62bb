//! # Types
//!
//! Status enums for every record kept by the platform. Each status has a
//! stable UPPERCASE wire name used both in JSON and in the database, and
//! parses back with [`FromStr`].
//!
//! ```text
//! Fund:        PENDING ──► ACTIVE ──► PAUSED ──► ACTIVE
//!                 │          │          │
//!                 ▼          ▼          ▼
//!             REJECTED     CLOSED ◄─────┘
//!
//! Withdrawal:  PENDING ──► PROCESSING ──► COMPLETED
//!                 │            │
//!                 └────────────┴──────► REJECTED
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A status string that is not one of the known wire names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status: {value:?}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_status {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name stored in the database and sent over JSON.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err(ParseStatusError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_status! {
    /// Lifecycle status of a fundraiser.
    FundStatus ("fund") {
        /// Submitted, waiting for moderation. Initial state.
        Pending => "PENDING",
        /// Approved and accepting donations.
        Active => "ACTIVE",
        /// Temporarily suspended by an admin.
        Paused => "PAUSED",
        /// Refused during moderation.
        Rejected => "REJECTED",
        /// Finished; no more donations expected.
        Closed => "CLOSED",
    }
}

impl FundStatus {
    /// Whether a fund in this status keeps its category from being deleted.
    pub fn blocks_category_deletion(&self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }

    /// `REJECTED` and `CLOSED` are terminal in intended usage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Closed)
    }
}

wire_status! {
    /// Outcome of a donation, possibly overridden by an admin.
    DonationStatus ("donation") {
        Success => "SUCCESS",
        Failed => "FAILED",
    }
}

wire_status! {
    /// Status of the net-of-fee disbursement created with each donation.
    PayoutStatus ("payout") {
        Pending => "PENDING",
        Sent => "SENT",
        Failed => "FAILED",
    }
}

wire_status! {
    /// Status of a wallet-to-bank withdrawal request.
    WithdrawalStatus ("withdrawal") {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Rejected => "REJECTED",
    }
}

wire_status! {
    CategoryStatus ("category") {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
    }
}

wire_status! {
    /// Review state of an identity-verification submission.
    KycStatus ("kyc") {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

wire_status! {
    /// Triage state of a security report.
    ReportStatus ("report") {
        Open => "OPEN",
        InReview => "IN_REVIEW",
        Resolved => "RESOLVED",
        Dismissed => "DISMISSED",
    }
}
