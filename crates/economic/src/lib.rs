//! Token sale economics for orgvote
//!
//! This crate provides the pricing engine that computes the cost of buying
//! organization tokens under a sale policy, and the `SaleAccount` holding each
//! organization's sale state. Both are synchronous and free of collaborator
//! calls; the registry drives the ledger and payout side effects.

mod error;
mod pricing;
mod sale;

pub use error::{SaleError, SaleResult};
pub use pricing::{total_price, BondingCurve, SaleMode, DEFAULT_BASE_PRICE, DEFAULT_PRICE_DELTA};
pub use sale::{AvailabilityChange, Purchase, SaleAccount};
