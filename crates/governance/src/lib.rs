//! Governance module for orgvote
//!
//! This module provides token-weighted votations for organizations: a
//! donor proposes a topic with a fixed list of options, an admin approves or
//! rejects it, token holders vote by burning tokens during the voting window,
//! and anyone may finalize the votation once the window has closed.
//!
//! The state machine here is pure. Callers supply the current time and
//! perform all eligibility checks and ledger effects themselves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orgvote_core::Amount;

pub mod votation;

pub use votation::{FinalizeOutcome, Votation, VotationId, VotationState};

/// Seven days
pub const DEFAULT_VOTING_PERIOD: u64 = 7 * 24 * 60 * 60;

/// Fewest options a votation may offer
pub const MIN_OPTIONS: usize = 2;

/// Most options a votation may offer
pub const MAX_OPTIONS: usize = 10;

/// Error types for governance operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// Topic must not be empty
    #[error("Invalid votation: topic cannot be empty")]
    EmptyTopic,

    /// Number of options outside the permitted range
    #[error("Invalid votation: {count} options, expected between {min} and {max}")]
    InvalidOptionCount { count: usize, min: usize, max: usize },

    /// Quorum must be positive
    #[error("Invalid votation: quorum must be greater than zero")]
    ZeroQuorum,

    /// Operation invoked in the wrong state
    #[error("Votation {id} is {state:?}, cannot {operation}")]
    InvalidState {
        id: VotationId,
        state: VotationState,
        operation: &'static str,
    },

    /// Vote cast after the voting window closed
    #[error("Voting on votation {id} closed at {end_time}, now {now}")]
    VotingClosed { id: VotationId, end_time: u64, now: u64 },

    /// Finalization attempted before the voting window closed
    #[error("Voting on votation {id} is open until {end_time}, now {now}")]
    VotingNotEnded { id: VotationId, end_time: u64, now: u64 },

    /// Option index past the end of the option list
    #[error("Invalid vote: option {index} out of range, votation has {options} options")]
    OptionOutOfRange { index: usize, options: usize },

    /// Votes must carry positive weight
    #[error("Invalid vote: amount must be greater than zero")]
    ZeroAmount,

    /// Integer overflow in tallies or timestamps
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(&'static str),
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Configuration of the votation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotationConfig {
    /// Length of the voting window in seconds, starting at approval
    pub voting_period: u64,
}

impl Default for VotationConfig {
    fn default() -> Self {
        Self {
            voting_period: DEFAULT_VOTING_PERIOD,
        }
    }
}

/// Quorum and majority rule applied at finalization.
///
/// Only option 0 (for) and option 1 (against) count; weight on any other
/// option is recorded but does not take part in the decision.
pub fn passes(votes_for: Amount, votes_against: Amount, quorum: Amount) -> GovernanceResult<bool> {
    let total = votes_for
        .checked_add(votes_against)
        .ok_or(GovernanceError::ArithmeticOverflow("total votes"))?;
    Ok(total >= quorum && votes_for > votes_against)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VotationConfig::default();
        assert_eq!(config.voting_period, 604_800);
        assert_eq!((MIN_OPTIONS, MAX_OPTIONS), (2, 10));
    }

    #[test]
    fn test_passes_requires_quorum_and_majority() {
        assert!(passes(9, 1, 10).unwrap());
        assert!(!passes(4, 1, 10).unwrap());
        assert!(!passes(5, 5, 10).unwrap());
        assert!(!passes(0, 0, 1).unwrap());
        assert!(passes(Amount::MAX, 0, 1).unwrap());
        assert!(passes(Amount::MAX, 1, 1).is_err());
    }
}
