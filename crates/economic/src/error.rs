//! Error types for the sale engine.

use thiserror::Error;

use orgvote_core::Amount;

use crate::pricing::SaleMode;

/// Errors that can occur while pricing or settling a sale
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    /// Initial supply must be positive
    #[error("Initial supply must be greater than zero")]
    ZeroSupply,

    /// Amounts must be positive
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Operation not allowed under the organization's sale mode
    #[error("Operation requires sale mode {expected:?}, organization uses {actual:?}")]
    WrongSaleMode { expected: SaleMode, actual: SaleMode },

    /// Not enough unsold tokens
    #[error("Insufficient availability: available={available}, requested={requested}")]
    InsufficientAvailability { available: Amount, requested: Amount },

    /// Payment does not match the computed price
    #[error("Payment mismatch: expected {expected}, paid {paid}")]
    ValueMismatch { expected: Amount, paid: Amount },

    /// Integer overflow while computing a price or counter
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(&'static str),
}

/// Result type for sale operations
pub type SaleResult<T> = Result<T, SaleError>;
