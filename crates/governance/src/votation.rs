//! Votation state machine
//!
//! ```text
//! Proposed --approve--> Approved --finalize(pass)--> Finalized
//!    |                     |
//!    +--reject--> Rejected <--finalize(fail)
//! ```
//!
//! `Rejected` and `Finalized` are terminal. Every transition validates fully
//! before mutating, so a failed call leaves the votation untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use orgvote_core::{Address, Amount};

use crate::{passes, GovernanceError, GovernanceResult, VotationConfig, MAX_OPTIONS, MIN_OPTIONS};

/// Identifier of a votation within its organization. Ids start at 1.
pub type VotationId = u64;

/// Lifecycle state of a votation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VotationState {
    /// Awaiting an admin decision
    Proposed,
    /// Open for voting until its end time
    Approved,
    /// Rejected by an admin, or failed quorum/majority at finalization
    Rejected,
    /// Passed quorum and majority
    Finalized,
}

impl VotationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Finalized)
    }
}

/// Result of finalizing a votation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub votation_id: VotationId,
    pub votes_for: Amount,
    pub votes_against: Amount,
    pub total_votes: Amount,
    pub quorum: Amount,
    pub quorum_reached: bool,
    pub majority_reached: bool,
    /// `Finalized` when both rules hold, `Rejected` otherwise
    pub state: VotationState,
}

/// A token-weighted vote over a fixed list of options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votation {
    id: VotationId,
    proposer: Address,
    topic: String,
    options: Vec<String>,
    quorum: Amount,
    created_at: u64,
    start_time: Option<u64>,
    end_time: Option<u64>,
    state: VotationState,
    /// Accumulated weight per option, indexed like `options`
    votes: Vec<Amount>,
    votes_spent: BTreeMap<Address, Amount>,
    votes_for: Amount,
    votes_against: Amount,
}

impl Votation {
    /// Create a votation in the `Proposed` state
    pub fn propose(
        id: VotationId,
        proposer: Address,
        topic: String,
        options: Vec<String>,
        quorum: Amount,
        now: u64,
    ) -> GovernanceResult<Self> {
        if topic.is_empty() {
            return Err(GovernanceError::EmptyTopic);
        }

        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(GovernanceError::InvalidOptionCount {
                count: options.len(),
                min: MIN_OPTIONS,
                max: MAX_OPTIONS,
            });
        }

        if quorum == 0 {
            return Err(GovernanceError::ZeroQuorum);
        }

        let votes = vec![0; options.len()];

        Ok(Self {
            id,
            proposer,
            topic,
            options,
            quorum,
            created_at: now,
            start_time: None,
            end_time: None,
            state: VotationState::Proposed,
            votes,
            votes_spent: BTreeMap::new(),
            votes_for: 0,
            votes_against: 0,
        })
    }

    pub fn id(&self) -> VotationId {
        self.id
    }

    pub fn proposer(&self) -> Address {
        self.proposer
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn quorum(&self) -> Amount {
        self.quorum
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    pub fn state(&self) -> VotationState {
        self.state
    }

    /// Accumulated weight per option
    pub fn votes(&self) -> &[Amount] {
        &self.votes
    }

    /// Weight committed by `voter` across all of their votes
    pub fn votes_spent(&self, voter: &Address) -> Amount {
        self.votes_spent.get(voter).copied().unwrap_or(0)
    }

    /// Every voter with the weight they committed
    pub fn voters(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.votes_spent.iter()
    }

    pub fn votes_for(&self) -> Amount {
        self.votes_for
    }

    pub fn votes_against(&self) -> Amount {
        self.votes_against
    }

    fn require_state(&self, expected: VotationState, operation: &'static str) -> GovernanceResult<()> {
        if self.state != expected {
            return Err(GovernanceError::InvalidState {
                id: self.id,
                state: self.state,
                operation,
            });
        }
        Ok(())
    }

    /// Open the voting window at `now`
    pub fn approve(&mut self, now: u64, config: &VotationConfig) -> GovernanceResult<()> {
        self.require_state(VotationState::Proposed, "approve")?;

        let end_time = now
            .checked_add(config.voting_period)
            .ok_or(GovernanceError::ArithmeticOverflow("end time"))?;

        self.state = VotationState::Approved;
        self.start_time = Some(now);
        self.end_time = Some(end_time);

        info!("Votation {} approved, voting open until {}", self.id, end_time);
        Ok(())
    }

    /// Reject a votation that has not been approved
    pub fn reject(&mut self) -> GovernanceResult<()> {
        self.require_state(VotationState::Proposed, "reject")?;
        self.state = VotationState::Rejected;

        info!("Votation {} rejected", self.id);
        Ok(())
    }

    /// Check that a vote of `amount` on `option` would be accepted at `now`
    pub fn check_vote(&self, option: usize, amount: Amount, now: u64) -> GovernanceResult<()> {
        self.require_state(VotationState::Approved, "vote")?;

        let end_time = self.end_time.unwrap_or(0);
        if now > end_time {
            return Err(GovernanceError::VotingClosed {
                id: self.id,
                end_time,
                now,
            });
        }

        if option >= self.options.len() {
            return Err(GovernanceError::OptionOutOfRange {
                index: option,
                options: self.options.len(),
            });
        }

        if amount == 0 {
            return Err(GovernanceError::ZeroAmount);
        }

        Ok(())
    }

    /// Record a vote. The caller is responsible for burning the voter's tokens.
    pub fn record_vote(
        &mut self,
        voter: Address,
        option: usize,
        amount: Amount,
        now: u64,
    ) -> GovernanceResult<()> {
        self.check_vote(option, amount, now)?;

        let option_total = self.votes[option]
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("option votes"))?;
        let spent = self
            .votes_spent(&voter)
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("votes spent"))?;
        let votes_for = match option {
            0 => self
                .votes_for
                .checked_add(amount)
                .ok_or(GovernanceError::ArithmeticOverflow("votes for"))?,
            _ => self.votes_for,
        };
        let votes_against = match option {
            1 => self
                .votes_against
                .checked_add(amount)
                .ok_or(GovernanceError::ArithmeticOverflow("votes against"))?,
            _ => self.votes_against,
        };

        self.votes[option] = option_total;
        self.votes_spent.insert(voter, spent);
        self.votes_for = votes_for;
        self.votes_against = votes_against;

        debug!("Votation {}: {} voted {} on option {}", self.id, voter, amount, option);
        Ok(())
    }

    /// Undo a vote previously recorded with the same arguments. Only an
    /// open votation can be changed.
    pub fn revert_vote(&mut self, voter: Address, option: usize, amount: Amount) -> GovernanceResult<()> {
        self.require_state(VotationState::Approved, "revert vote")?;

        let spent = self.votes_spent(&voter);
        let option_total = self.votes.get(option).copied().unwrap_or(0);
        if spent < amount || option_total < amount {
            return Err(GovernanceError::ArithmeticOverflow("vote reversal"));
        }

        self.votes[option] = option_total - amount;
        if spent == amount {
            self.votes_spent.remove(&voter);
        } else {
            self.votes_spent.insert(voter, spent - amount);
        }
        match option {
            0 => self.votes_for = self.votes_for.saturating_sub(amount),
            1 => self.votes_against = self.votes_against.saturating_sub(amount),
            _ => {}
        }

        debug!("Votation {}: reverted {} from {} on option {}", self.id, amount, voter, option);
        Ok(())
    }

    /// Resolve the votation once its window has closed
    pub fn finalize(&mut self, now: u64) -> GovernanceResult<FinalizeOutcome> {
        self.require_state(VotationState::Approved, "finalize")?;

        let end_time = self.end_time.unwrap_or(0);
        if now <= end_time {
            return Err(GovernanceError::VotingNotEnded {
                id: self.id,
                end_time,
                now,
            });
        }

        let approved = passes(self.votes_for, self.votes_against, self.quorum)?;
        let total_votes = self.votes_for + self.votes_against;

        self.state = if approved {
            VotationState::Finalized
        } else {
            VotationState::Rejected
        };

        info!(
            "Votation {} resolved as {:?}: for={}, against={}, quorum={}",
            self.id, self.state, self.votes_for, self.votes_against, self.quorum
        );

        Ok(FinalizeOutcome {
            votation_id: self.id,
            votes_for: self.votes_for,
            votes_against: self.votes_against,
            total_votes,
            quorum: self.quorum,
            quorum_reached: total_votes >= self.quorum,
            majority_reached: self.votes_for > self.votes_against,
            state: self.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: u64 = 1_000;

    fn options(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn proposed(quorum: Amount) -> Votation {
        Votation::propose(
            1,
            Address::repeat_byte(9),
            "Fund the community garden".to_string(),
            options(&["For", "Against"]),
            quorum,
            START,
        )
        .unwrap()
    }

    fn approved(quorum: Amount) -> Votation {
        let mut votation = proposed(quorum);
        votation.approve(START, &VotationConfig::default()).unwrap();
        votation
    }

    fn end_of(votation: &Votation) -> u64 {
        votation.end_time().unwrap()
    }

    #[test]
    fn test_propose_validation() {
        let proposer = Address::repeat_byte(1);

        let err = Votation::propose(1, proposer, String::new(), options(&["a", "b"]), 1, 0)
            .unwrap_err();
        assert_eq!(err, GovernanceError::EmptyTopic);

        let err = Votation::propose(1, proposer, "t".into(), options(&["a"]), 1, 0)
            .unwrap_err();
        assert_eq!(err, GovernanceError::InvalidOptionCount { count: 1, min: 2, max: 10 });

        let eleven = (0..11).map(|i| i.to_string()).collect();
        let err = Votation::propose(1, proposer, "t".into(), eleven, 1, 0).unwrap_err();
        assert_eq!(err, GovernanceError::InvalidOptionCount { count: 11, min: 2, max: 10 });

        let err = Votation::propose(1, proposer, "t".into(), options(&["a", "b"]), 0, 0)
            .unwrap_err();
        assert_eq!(err, GovernanceError::ZeroQuorum);

        let ten = (0..10).map(|i| i.to_string()).collect();
        let votation = Votation::propose(1, proposer, "t".into(), ten, 1, 0).unwrap();
        assert_eq!(votation.state(), VotationState::Proposed);
        assert_eq!(votation.votes(), &[0; 10]);
    }

    #[test]
    fn test_approve_sets_window() {
        let votation = approved(10);
        assert_eq!(votation.state(), VotationState::Approved);
        assert_eq!(votation.start_time(), Some(START));
        assert_eq!(votation.end_time(), Some(START + 604_800));
    }

    #[test]
    fn test_approve_and_reject_only_from_proposed() {
        let mut votation = approved(10);
        assert!(matches!(
            votation.approve(START, &VotationConfig::default()),
            Err(GovernanceError::InvalidState { state: VotationState::Approved, .. })
        ));
        assert!(matches!(
            votation.reject(),
            Err(GovernanceError::InvalidState { operation: "reject", .. })
        ));

        let mut votation = proposed(10);
        votation.reject().unwrap();
        assert_eq!(votation.state(), VotationState::Rejected);
        assert!(votation.state().is_terminal());
        assert!(votation.approve(START, &VotationConfig::default()).is_err());
    }

    #[test]
    fn test_vote_requires_approval() {
        let mut votation = proposed(10);
        let err = votation.record_vote(Address::repeat_byte(1), 0, 1, START).unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidState { state: VotationState::Proposed, .. }));
    }

    #[test]
    fn test_vote_window_is_inclusive_of_end_time() {
        let mut votation = approved(10);
        let end = end_of(&votation);
        let voter = Address::repeat_byte(1);

        votation.record_vote(voter, 0, 1, end).unwrap();
        let err = votation.record_vote(voter, 0, 1, end + 1).unwrap_err();
        assert_eq!(err, GovernanceError::VotingClosed { id: 1, end_time: end, now: end + 1 });
    }

    #[test]
    fn test_vote_validation() {
        let mut votation = approved(10);
        let voter = Address::repeat_byte(1);

        assert_eq!(
            votation.record_vote(voter, 2, 1, START),
            Err(GovernanceError::OptionOutOfRange { index: 2, options: 2 })
        );
        assert_eq!(votation.record_vote(voter, 0, 0, START), Err(GovernanceError::ZeroAmount));
        assert_eq!(votation.votes_spent(&voter), 0);
    }

    #[test]
    fn test_votes_accumulate_across_calls_and_options() {
        let mut votation = approved(10);
        let voter = Address::repeat_byte(1);

        votation.record_vote(voter, 0, 3, START).unwrap();
        votation.record_vote(voter, 1, 2, START + 1).unwrap();
        votation.record_vote(voter, 0, 1, START + 2).unwrap();

        assert_eq!(votation.votes(), &[4, 2]);
        assert_eq!(votation.votes_spent(&voter), 6);
        assert_eq!(votation.votes_for(), 4);
        assert_eq!(votation.votes_against(), 2);
    }

    #[test]
    fn test_extra_options_do_not_count_towards_resolution() {
        let config = VotationConfig::default();
        let mut votation = Votation::propose(
            1,
            Address::repeat_byte(9),
            "Pick a colour".to_string(),
            options(&["Red", "Blue", "Green"]),
            5,
            START,
        )
        .unwrap();
        votation.approve(START, &config).unwrap();

        votation.record_vote(Address::repeat_byte(1), 2, 100, START).unwrap();
        votation.record_vote(Address::repeat_byte(2), 0, 1, START).unwrap();

        assert_eq!(votation.votes(), &[1, 0, 100]);
        assert_eq!(votation.votes_for(), 1);
        assert_eq!(votation.votes_against(), 0);

        let outcome = votation.finalize(end_of(&votation) + 1).unwrap();
        assert_eq!(outcome.total_votes, 1);
        assert!(!outcome.quorum_reached);
        assert_eq!(outcome.state, VotationState::Rejected);
    }

    #[test]
    fn test_finalize_passes_with_quorum_and_majority() {
        let mut votation = approved(10);
        votation.record_vote(Address::repeat_byte(1), 0, 4, START).unwrap();
        votation.record_vote(Address::repeat_byte(2), 0, 3, START).unwrap();
        votation.record_vote(Address::repeat_byte(3), 0, 2, START).unwrap();
        votation.record_vote(Address::repeat_byte(4), 1, 1, START).unwrap();

        let outcome = votation.finalize(end_of(&votation) + 1).unwrap();
        assert_eq!(outcome.total_votes, 10);
        assert_eq!(outcome.votes_for, 9);
        assert_eq!(outcome.votes_against, 1);
        assert!(outcome.quorum_reached && outcome.majority_reached);
        assert_eq!(outcome.state, VotationState::Finalized);
        assert_eq!(votation.state(), VotationState::Finalized);
    }

    #[test]
    fn test_finalize_rejects_without_quorum() {
        let mut votation = approved(10);
        votation.record_vote(Address::repeat_byte(1), 0, 4, START).unwrap();
        votation.record_vote(Address::repeat_byte(2), 1, 1, START).unwrap();

        let outcome = votation.finalize(end_of(&votation) + 1).unwrap();
        assert_eq!(outcome.total_votes, 5);
        assert!(!outcome.quorum_reached);
        assert_eq!(outcome.state, VotationState::Rejected);
    }

    #[test]
    fn test_finalize_rejects_on_tie() {
        let mut votation = approved(2);
        votation.record_vote(Address::repeat_byte(1), 0, 5, START).unwrap();
        votation.record_vote(Address::repeat_byte(2), 1, 5, START).unwrap();

        let outcome = votation.finalize(end_of(&votation) + 1).unwrap();
        assert!(outcome.quorum_reached);
        assert!(!outcome.majority_reached);
        assert_eq!(outcome.state, VotationState::Rejected);
    }

    #[test]
    fn test_finalize_is_strictly_after_end_and_one_shot() {
        let mut votation = approved(1);
        let end = end_of(&votation);

        assert_eq!(
            votation.finalize(end),
            Err(GovernanceError::VotingNotEnded { id: 1, end_time: end, now: end })
        );

        votation.finalize(end + 1).unwrap();
        assert!(matches!(
            votation.finalize(end + 2),
            Err(GovernanceError::InvalidState { operation: "finalize", .. })
        ));
    }

    #[test]
    fn test_revert_vote() {
        let mut votation = approved(10);
        let voter = Address::repeat_byte(1);
        let before = votation.clone();

        votation.record_vote(voter, 1, 3, START).unwrap();
        votation.revert_vote(voter, 1, 3).unwrap();
        assert_eq!(votation, before);
    }

    #[test]
    fn test_revert_vote_rejected_once_resolved() {
        let mut votation = approved(1);
        let voter = Address::repeat_byte(1);

        votation.record_vote(voter, 0, 3, START).unwrap();
        let end = end_of(&votation);
        votation.finalize(end + 1).unwrap();
        let resolved = votation.clone();

        let err = votation.revert_vote(voter, 0, 3).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::InvalidState {
                state: VotationState::Finalized,
                ..
            }
        ));
        assert_eq!(votation, resolved);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut votation = approved(10);
        votation.record_vote(Address::repeat_byte(1), 0, 3, START).unwrap();

        let json = serde_json::to_string(&votation).unwrap();
        let back: Votation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, votation);
    }

    proptest! {
        #[test]
        fn option_totals_equal_voter_totals(
            ballots in proptest::collection::vec((0u8..6, 0usize..4, 1u128..1_000), 0..40)
        ) {
            let config = VotationConfig::default();
            let mut votation = Votation::propose(
                1,
                Address::repeat_byte(9),
                "Budget".to_string(),
                options(&["For", "Against", "Abstain", "Defer"]),
                1,
                START,
            )
            .unwrap();
            votation.approve(START, &config).unwrap();

            for (voter, option, amount) in ballots {
                votation.record_vote(Address::repeat_byte(voter), option, amount, START).unwrap();
            }

            let by_option: Amount = votation.votes().iter().sum();
            let by_voter: Amount = votation.voters().map(|(_, spent)| *spent).sum();
            prop_assert_eq!(by_option, by_voter);
            prop_assert_eq!(votation.votes_for(), votation.votes()[0]);
            prop_assert_eq!(votation.votes_against(), votation.votes()[1]);
        }
    }
}
