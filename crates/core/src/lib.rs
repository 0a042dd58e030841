//! Core primitives for orgvote
//!
//! This crate provides the types shared by the sale and governance crates
//! (addresses, token identifiers, amounts), the clock abstraction, and the
//! collaborator capabilities the registry consumes: the token `Ledger`, the
//! `AccessGate` answering admin lookups, and the `PayoutSink` that forwards
//! sale proceeds. In-memory implementations of each are included for tests
//! and local simulation.

pub mod access;
pub mod clock;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod payout;
pub mod types;

pub use access::{AccessGate, InMemoryAccessGate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use guard::ReentrancyGuard;
pub use ledger::{InMemoryLedger, Ledger};
pub use payout::{PayoutSink, RecordingPayoutSink};
pub use types::{Address, Amount, TokenId};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
