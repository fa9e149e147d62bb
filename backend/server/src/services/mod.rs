//! Business operations. Handlers parse requests and call into these; each
//! operation loads what it needs, asks `crowdfund_core` for the new state and
//! persists it.

pub mod accounts;
pub mod catalog;
pub mod compliance;
pub mod fundraisers;
pub mod payouts;
pub mod settlement;
pub mod withdrawals;
