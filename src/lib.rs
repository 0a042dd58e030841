//! orgvote
//!
//! Organizations issue a fungible membership token, sell it at a fixed price
//! or along a linear bonding curve, and let token holders decide votations by
//! burning tokens as vote weight. A votation passes when the weight on its
//! first two options reaches the quorum and the first option outweighs the
//! second.
//!
//! The token ledger, admin lookups, payout transfers and the clock are
//! injected capabilities; see [`orgvote_core`] for the traits and in-memory
//! implementations.

pub mod error;
pub mod organization;
pub mod registry;

pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use organization::{Organization, OrganizationInfo};
pub use registry::{OrganizationRegistry, RegistrySettings, RegistrySnapshot};

pub use orgvote_config::{init_logging, PlatformConfig};
pub use orgvote_core::{
    AccessGate, Address, Amount, Clock, InMemoryAccessGate, InMemoryLedger, Ledger, ManualClock,
    PayoutSink, RecordingPayoutSink, SystemClock, TokenId,
};
pub use orgvote_economic::{BondingCurve, Purchase, SaleMode};
pub use orgvote_governance::{FinalizeOutcome, Votation, VotationConfig, VotationId, VotationState};

/// Module version information
pub mod version {
    /// The current version of the orgvote library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_available() {
        assert!(!super::version::VERSION.is_empty());
    }
}
