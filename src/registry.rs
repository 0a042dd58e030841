//! Organization registry
//!
//! The registry exclusively owns every `Organization` and its votations. It
//! drives the collaborator side effects (ledger mint/burn/transfer, payout)
//! around the pure sale and votation state machines.
//!
//! State lives behind a `RwLock` that is never held across a collaborator
//! call. Operations that mutate state and then call out (`register`,
//! `adjust_available`, `buy`, `vote`) run inside the registry's
//! `ReentrancyGuard`, and undo their own state change if a later side effect
//! fails. Concurrent callers wait their turn; a collaborator calling back into
//! one of these operations is rejected. `finalize_votation` runs inside the
//! same guard so it never observes a vote whose burn is still in flight.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use orgvote_config::PlatformConfig;
use orgvote_core::{
    AccessGate, Address, Amount, Clock, Ledger, PayoutSink, ReentrancyGuard, TokenId,
};
use orgvote_economic::{AvailabilityChange, BondingCurve, Purchase, SaleAccount, SaleMode};
use orgvote_governance::{FinalizeOutcome, Votation, VotationConfig, VotationId};

use crate::error::{RegistryError, RegistryResult};
use crate::organization::{OrgIndex, Organization, OrganizationInfo};

/// Deployment constants of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    pub curve: BondingCurve,
    pub votation: VotationConfig,
    /// Custody account holding unsold token units
    pub treasury: Address,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            curve: BondingCurve::default(),
            votation: VotationConfig::default(),
            treasury: Address::TREASURY,
        }
    }
}

impl RegistrySettings {
    pub fn from_config(config: &PlatformConfig) -> RegistryResult<Self> {
        config.validate()?;

        Ok(Self {
            curve: BondingCurve::new(
                Amount::from(config.sale.base_price),
                Amount::from(config.sale.price_delta),
            ),
            votation: VotationConfig {
                voting_period: config.governance.voting_period_secs,
            },
            treasury: config.treasury_address()?,
        })
    }
}

/// Consistent copy of the whole registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub taken_at: u64,
    pub organizations: Vec<Organization>,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> RegistryResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RegistryError::Serialization(e.to_string()))
    }
}

struct RegistryState {
    /// Arena of organizations in registration order
    organizations: Vec<Organization>,
    index: HashMap<Address, OrgIndex>,
    next_token_id: u64,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            organizations: Vec::new(),
            index: HashMap::new(),
            next_token_id: 1,
        }
    }

    fn lookup(&self, organization: &Address) -> RegistryResult<&Organization> {
        self.index
            .get(organization)
            .and_then(|idx| self.organizations.get(idx.0))
            .ok_or(RegistryError::OrganizationNotFound(*organization))
    }

    fn lookup_mut(&mut self, organization: &Address) -> RegistryResult<&mut Organization> {
        let idx = *self
            .index
            .get(organization)
            .ok_or(RegistryError::OrganizationNotFound(*organization))?;
        self.organizations
            .get_mut(idx.0)
            .ok_or(RegistryError::OrganizationNotFound(*organization))
    }

    fn votation(&self, organization: &Address, id: VotationId) -> RegistryResult<&Votation> {
        self.lookup(organization)?
            .votation(id)
            .ok_or(RegistryError::VotationNotFound {
                organization: *organization,
                id,
            })
    }

    fn votation_mut(&mut self, organization: &Address, id: VotationId) -> RegistryResult<&mut Votation> {
        self.lookup_mut(organization)?
            .votation_mut(id)
            .ok_or(RegistryError::VotationNotFound {
                organization: *organization,
                id,
            })
    }
}

/// Registry of organizations, their token sales and their votations
pub struct OrganizationRegistry {
    ledger: Arc<dyn Ledger>,
    access: Arc<dyn AccessGate>,
    payout: Arc<dyn PayoutSink>,
    clock: Arc<dyn Clock>,
    settings: RegistrySettings,
    state: RwLock<RegistryState>,
    guard: ReentrancyGuard,
}

impl OrganizationRegistry {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        access: Arc<dyn AccessGate>,
        payout: Arc<dyn PayoutSink>,
        clock: Arc<dyn Clock>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            ledger,
            access,
            payout,
            clock,
            settings,
            state: RwLock::new(RegistryState::new()),
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    async fn token_id_of(&self, organization: Address) -> RegistryResult<TokenId> {
        let state = self.state.read().await;
        Ok(state.lookup(&organization)?.token_id)
    }

    /// Fails unless the organization exists and `caller` is one of its admins
    async fn require_admin(&self, organization: Address, caller: Address) -> RegistryResult<()> {
        self.token_id_of(organization).await?;

        if !self.access.is_admin(organization, caller).await? {
            return Err(RegistryError::NotAdmin {
                organization,
                caller,
            });
        }
        Ok(())
    }

    /// Register `organization` with a new token and mint `initial_supply`
    /// units into the treasury
    pub async fn register(
        &self,
        organization: Address,
        mode: SaleMode,
        initial_supply: Amount,
    ) -> RegistryResult<OrganizationInfo> {
        self.guard
            .run(self.register_guarded(organization, mode, initial_supply))
            .await
    }

    async fn register_guarded(
        &self,
        organization: Address,
        mode: SaleMode,
        initial_supply: Amount,
    ) -> RegistryResult<OrganizationInfo> {
        let token_id = {
            let state = self.state.read().await;
            if state.index.contains_key(&organization) {
                return Err(RegistryError::AlreadyRegistered(organization));
            }
            TokenId::new(state.next_token_id)
        };

        let sale = SaleAccount::open(mode, initial_supply)?;

        self.ledger
            .mint(self.settings.treasury, token_id, initial_supply)
            .await?;

        let mut state = self.state.write().await;
        let record = Organization::new(organization, token_id, sale, self.clock.now());
        let info = record.info();

        let idx = OrgIndex(state.organizations.len());
        state.organizations.push(record);
        state.index.insert(organization, idx);
        state.next_token_id += 1;

        info!(
            "Registered organization {} with token {} ({:?}, supply {})",
            organization, token_id, mode, initial_supply
        );
        Ok(info)
    }

    /// Set the unit price of a `FixedPrice` sale
    pub async fn set_price(&self, organization: Address, caller: Address, price: Amount) -> RegistryResult<()> {
        self.require_admin(organization, caller).await?;

        let mut state = self.state.write().await;
        state.lookup_mut(&organization)?.sale.set_price(price)?;

        info!("Organization {} price set to {} by {}", organization, price, caller);
        Ok(())
    }

    /// Mint (`delta > 0`) or burn (`delta < 0`) unsold supply of a
    /// `FixedQuantity` sale
    pub async fn adjust_available(
        &self,
        organization: Address,
        caller: Address,
        delta: i128,
    ) -> RegistryResult<OrganizationInfo> {
        self.guard
            .run(self.adjust_available_guarded(organization, caller, delta))
            .await
    }

    async fn adjust_available_guarded(
        &self,
        organization: Address,
        caller: Address,
        delta: i128,
    ) -> RegistryResult<OrganizationInfo> {
        self.require_admin(organization, caller).await?;

        let change = AvailabilityChange::from_delta(delta)?;
        let token_id = {
            let state = self.state.read().await;
            let record = state.lookup(&organization)?;
            record.sale.check_adjustment(change)?;
            record.token_id
        };

        let treasury = self.settings.treasury;
        match change {
            AvailabilityChange::Increase(amount) => self.ledger.mint(treasury, token_id, amount).await?,
            AvailabilityChange::Decrease(amount) => self.ledger.burn(treasury, token_id, amount).await?,
        }

        let mut state = self.state.write().await;
        let record = state.lookup_mut(&organization)?;
        record.sale.adjust_available(change)?;

        info!(
            "Organization {} availability adjusted by {}, now {}",
            organization,
            delta,
            record.sale.tokens_available()
        );
        Ok(record.info())
    }

    /// Price `amount` units would cost right now
    pub async fn quote_price(&self, organization: Address, amount: Amount) -> RegistryResult<Amount> {
        let state = self.state.read().await;
        Ok(state
            .lookup(&organization)?
            .sale
            .quote(amount, &self.settings.curve)?)
    }

    /// Buy `amount` tokens paying exactly `paid_value`.
    ///
    /// The tokens move from the treasury to `buyer` and the payment is
    /// forwarded to the organization's address. If either side effect fails,
    /// everything done so far is undone.
    pub async fn buy(
        &self,
        organization: Address,
        buyer: Address,
        amount: Amount,
        paid_value: Amount,
    ) -> RegistryResult<Purchase> {
        self.guard
            .run(self.buy_guarded(organization, buyer, amount, paid_value))
            .await
    }

    async fn buy_guarded(
        &self,
        organization: Address,
        buyer: Address,
        amount: Amount,
        paid_value: Amount,
    ) -> RegistryResult<Purchase> {
        let treasury = self.settings.treasury;

        let (token_id, purchase) = {
            let mut state = self.state.write().await;
            let record = state.lookup_mut(&organization)?;
            let purchase = record.sale.purchase(amount, paid_value, &self.settings.curve)?;
            (record.token_id, purchase)
        };

        if let Err(e) = self.ledger.transfer(treasury, buyer, token_id, amount).await {
            warn!("Token transfer to {} failed, reverting purchase: {}", buyer, e);
            self.revert_purchase(organization, &purchase).await;
            return Err(e.into());
        }

        if let Err(e) = self.payout.send(organization, paid_value).await {
            warn!("Payout to {} failed, reverting purchase: {}", organization, e);
            if let Err(undo) = self.ledger.transfer(buyer, treasury, token_id, amount).await {
                // The buyer still holds the tokens, so the counters keep the purchase
                error!("Failed to return {} tokens from {} to treasury: {}", amount, buyer, undo);
                return Err(RegistryError::PayoutRollbackFailed {
                    to: organization,
                    buyer,
                    value: paid_value,
                    reason: e.to_string(),
                    rollback: undo.to_string(),
                });
            }
            self.revert_purchase(organization, &purchase).await;
            return Err(RegistryError::PayoutFailed {
                to: organization,
                value: paid_value,
                reason: e.to_string(),
            });
        }

        info!(
            "{} bought {} tokens of {} for {}",
            buyer, amount, organization, purchase.total_price
        );
        Ok(purchase)
    }

    async fn revert_purchase(&self, organization: Address, purchase: &Purchase) {
        let mut state = self.state.write().await;
        let reverted = state
            .lookup_mut(&organization)
            .and_then(|record| record.sale.revert_purchase(purchase).map_err(Into::into));

        match reverted {
            Ok(()) => debug!("Reverted purchase of {} on {}", purchase.amount, organization),
            Err(e) => error!("Failed to revert purchase on {}: {}", organization, e),
        }
    }

    /// Whether `address` holds at least one unit of the organization's token
    pub async fn is_donor(&self, organization: Address, address: Address) -> RegistryResult<bool> {
        let token_id = self.token_id_of(organization).await?;
        Ok(self.ledger.balance_of(address, token_id).await? > 0)
    }

    async fn require_donor(&self, organization: Address, caller: Address) -> RegistryResult<()> {
        if !self.is_donor(organization, caller).await? {
            return Err(RegistryError::NotDonor {
                organization,
                caller,
            });
        }
        Ok(())
    }

    /// Propose a votation. The proposer must be a donor.
    pub async fn propose_votation(
        &self,
        organization: Address,
        proposer: Address,
        topic: String,
        options: Vec<String>,
        quorum: Amount,
    ) -> RegistryResult<VotationId> {
        self.require_donor(organization, proposer).await?;

        let now = self.clock.now();
        let mut state = self.state.write().await;
        let record = state.lookup_mut(&organization)?;

        let votation = Votation::propose(
            record.next_votation_id,
            proposer,
            topic,
            options,
            quorum,
            now,
        )?;
        let id = record.push_votation(votation);

        info!("Votation {} proposed on {} by {}", id, organization, proposer);
        Ok(id)
    }

    /// Open a proposed votation for voting
    pub async fn approve_votation(
        &self,
        organization: Address,
        caller: Address,
        id: VotationId,
    ) -> RegistryResult<()> {
        self.require_admin(organization, caller).await?;

        let now = self.clock.now();
        let mut state = self.state.write().await;
        state
            .votation_mut(&organization, id)?
            .approve(now, &self.settings.votation)?;
        Ok(())
    }

    /// Reject a proposed votation
    pub async fn reject_votation(
        &self,
        organization: Address,
        caller: Address,
        id: VotationId,
    ) -> RegistryResult<()> {
        self.require_admin(organization, caller).await?;

        let mut state = self.state.write().await;
        state.votation_mut(&organization, id)?.reject()?;
        Ok(())
    }

    /// Vote `amount` on `option`, burning that many of the voter's tokens
    pub async fn vote(
        &self,
        organization: Address,
        voter: Address,
        id: VotationId,
        option: usize,
        amount: Amount,
    ) -> RegistryResult<()> {
        self.guard
            .run(self.vote_guarded(organization, voter, id, option, amount))
            .await
    }

    async fn vote_guarded(
        &self,
        organization: Address,
        voter: Address,
        id: VotationId,
        option: usize,
        amount: Amount,
    ) -> RegistryResult<()> {
        let now = self.clock.now();

        let token_id = {
            let state = self.state.read().await;
            state.votation(&organization, id)?.check_vote(option, amount, now)?;
            state.lookup(&organization)?.token_id
        };

        let balance = self.ledger.balance_of(voter, token_id).await?;
        if balance == 0 {
            return Err(RegistryError::NotDonor {
                organization,
                caller: voter,
            });
        }
        if balance < amount {
            return Err(RegistryError::InsufficientBalance {
                holder: voter,
                balance,
                requested: amount,
            });
        }

        {
            let mut state = self.state.write().await;
            state
                .votation_mut(&organization, id)?
                .record_vote(voter, option, amount, now)?;
        }

        if let Err(e) = self.ledger.burn(voter, token_id, amount).await {
            warn!("Burning {} tokens of {} failed, reverting vote: {}", amount, voter, e);
            let mut state = self.state.write().await;
            let reverted = state
                .votation_mut(&organization, id)
                .and_then(|votation| votation.revert_vote(voter, option, amount).map_err(Into::into));
            if let Err(undo) = reverted {
                error!("Failed to revert vote on votation {} of {}: {}", id, organization, undo);
            }
            return Err(e.into());
        }

        info!(
            "{} voted {} on option {} of votation {} ({})",
            voter, amount, option, id, organization
        );
        Ok(())
    }

    /// Resolve a votation whose voting window has closed. Callable by anyone.
    pub async fn finalize_votation(
        &self,
        organization: Address,
        id: VotationId,
    ) -> RegistryResult<FinalizeOutcome> {
        self.guard.run(self.finalize_guarded(organization, id)).await
    }

    async fn finalize_guarded(
        &self,
        organization: Address,
        id: VotationId,
    ) -> RegistryResult<FinalizeOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        Ok(state.votation_mut(&organization, id)?.finalize(now)?)
    }

    pub async fn organization(&self, organization: Address) -> RegistryResult<OrganizationInfo> {
        let state = self.state.read().await;
        Ok(state.lookup(&organization)?.info())
    }

    pub async fn votation(&self, organization: Address, id: VotationId) -> RegistryResult<Votation> {
        let state = self.state.read().await;
        Ok(state.votation(&organization, id)?.clone())
    }

    /// Accumulated weight per option
    pub async fn votes(&self, organization: Address, id: VotationId) -> RegistryResult<Vec<Amount>> {
        let state = self.state.read().await;
        Ok(state.votation(&organization, id)?.votes().to_vec())
    }

    /// Weight `voter` has committed to a votation
    pub async fn votes_spent(
        &self,
        organization: Address,
        id: VotationId,
        voter: Address,
    ) -> RegistryResult<Amount> {
        let state = self.state.read().await;
        Ok(state.votation(&organization, id)?.votes_spent(&voter))
    }

    /// All votations of an organization, by id
    pub async fn list_votations(&self, organization: Address) -> RegistryResult<Vec<Votation>> {
        let state = self.state.read().await;
        Ok(state.lookup(&organization)?.votations().to_vec())
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().await;
        RegistrySnapshot {
            taken_at: self.clock.now(),
            organizations: state.organizations.clone(),
        }
    }
}
