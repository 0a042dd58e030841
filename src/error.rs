//! Error types for registry operations.

use thiserror::Error;

use orgvote_config::ConfigError;
use orgvote_core::{Address, Amount, CoreError};
use orgvote_economic::SaleError;
use orgvote_governance::{GovernanceError, VotationId};

/// Errors returned by the organization registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No organization is registered at the address
    #[error("Organization not registered: {0}")]
    OrganizationNotFound(Address),

    /// An organization is already registered at the address
    #[error("Organization already registered: {0}")]
    AlreadyRegistered(Address),

    /// The organization has no votation with this id
    #[error("Votation {id} not found in organization {organization}")]
    VotationNotFound { organization: Address, id: VotationId },

    /// Caller lacks admin capability
    #[error("Permission denied: {caller} is not an admin of {organization}")]
    NotAdmin { organization: Address, caller: Address },

    /// Caller holds none of the organization's tokens
    #[error("Permission denied: {caller} is not a donor of {organization}")]
    NotDonor { organization: Address, caller: Address },

    /// Caller holds fewer tokens than the operation needs
    #[error("Insufficient balance: {holder} holds {balance}, requested {requested}")]
    InsufficientBalance {
        holder: Address,
        balance: Amount,
        requested: Amount,
    },

    /// Forwarding sale proceeds failed; the purchase was rolled back
    #[error("Payout of {value} to {to} failed: {reason}")]
    PayoutFailed {
        to: Address,
        value: Amount,
        reason: String,
    },

    /// Forwarding sale proceeds failed and the tokens could not be returned
    /// to the treasury; the purchase stays recorded
    #[error("Payout of {value} to {to} failed ({reason}); returning tokens from {buyer} failed: {rollback}")]
    PayoutRollbackFailed {
        to: Address,
        buyer: Address,
        value: Amount,
        reason: String,
        rollback: String,
    },

    /// Error from a collaborator or the re-entrancy guard
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from the sale engine
    #[error(transparent)]
    Sale(#[from] SaleError),

    /// Error from the votation state machine
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    /// Invalid registry configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Broad classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Organization or votation does not exist
    Existence,
    /// Caller lacks admin or donor capability
    Authorization,
    /// Operation invoked in the wrong state or re-entrantly
    State,
    /// Invalid amount, option, balance, availability or payment
    Value,
    /// A ledger or payout side effect failed
    ExternalTransfer,
    /// Configuration or serialization failure
    Internal,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrganizationNotFound(_) | Self::VotationNotFound { .. } => ErrorKind::Existence,
            Self::AlreadyRegistered(_) => ErrorKind::State,
            Self::NotAdmin { .. } | Self::NotDonor { .. } => ErrorKind::Authorization,
            Self::InsufficientBalance { .. } => ErrorKind::Value,
            Self::PayoutFailed { .. } | Self::PayoutRollbackFailed { .. } => {
                ErrorKind::ExternalTransfer
            }
            Self::Core(err) => match err {
                CoreError::InsufficientBalance { .. }
                | CoreError::Overflow(_)
                | CoreError::InvalidAddress(_) => ErrorKind::Value,
                CoreError::Ledger(_) | CoreError::PayoutFailed(_) => ErrorKind::ExternalTransfer,
                CoreError::AccessGate(_) => ErrorKind::Authorization,
                CoreError::Reentrancy => ErrorKind::State,
            },
            Self::Sale(err) => match err {
                SaleError::WrongSaleMode { .. } => ErrorKind::State,
                _ => ErrorKind::Value,
            },
            Self::Governance(err) => match err {
                GovernanceError::InvalidState { .. }
                | GovernanceError::VotingClosed { .. }
                | GovernanceError::VotingNotEnded { .. } => ErrorKind::State,
                _ => ErrorKind::Value,
            },
            Self::Config(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}
