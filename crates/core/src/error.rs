//! Error types for collaborator capabilities.

use thiserror::Error;

use crate::types::{Address, Amount, TokenId};

/// Errors raised by the ledger, payout and locking primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The holder does not own enough units of the token
    #[error("Insufficient balance for {holder} on token {token}: balance={balance}, requested={requested}")]
    InsufficientBalance {
        holder: Address,
        token: TokenId,
        balance: Amount,
        requested: Amount,
    },

    /// A balance would exceed the integer width
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// The ledger backend rejected the operation
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Forwarding a payment failed
    #[error("Payout failed: {0}")]
    PayoutFailed(String),

    /// The access-control backend could not answer
    #[error("Access gate error: {0}")]
    AccessGate(String),

    /// A guarded section was entered while already held
    #[error("Re-entrant call rejected")]
    Reentrancy,

    /// An address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
