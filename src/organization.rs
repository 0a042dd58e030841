//! Organization records owned by the registry.

use serde::{Deserialize, Serialize};

use orgvote_core::{Address, Amount, TokenId};
use orgvote_economic::{SaleAccount, SaleMode};
use orgvote_governance::{Votation, VotationId};

/// Position of an organization in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OrgIndex(pub(crate) usize);

/// An organization with its token sale and votations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Registration address, also the payout address for sale proceeds
    pub(crate) address: Address,
    pub(crate) token_id: TokenId,
    pub(crate) sale: SaleAccount,
    pub(crate) registered_at: u64,
    pub(crate) next_votation_id: VotationId,
    /// Votation `id` lives at position `id - 1`
    pub(crate) votations: Vec<Votation>,
}

impl Organization {
    pub(crate) fn new(address: Address, token_id: TokenId, sale: SaleAccount, registered_at: u64) -> Self {
        Self {
            address,
            token_id,
            sale,
            registered_at,
            next_votation_id: 1,
            votations: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    pub fn sale(&self) -> &SaleAccount {
        &self.sale
    }

    pub fn registered_at(&self) -> u64 {
        self.registered_at
    }

    pub fn next_votation_id(&self) -> VotationId {
        self.next_votation_id
    }

    pub fn votations(&self) -> &[Votation] {
        &self.votations
    }

    fn slot(id: VotationId) -> Option<usize> {
        id.checked_sub(1).and_then(|i| usize::try_from(i).ok())
    }

    pub fn votation(&self, id: VotationId) -> Option<&Votation> {
        Self::slot(id).and_then(|i| self.votations.get(i))
    }

    pub(crate) fn votation_mut(&mut self, id: VotationId) -> Option<&mut Votation> {
        let slot = Self::slot(id)?;
        self.votations.get_mut(slot)
    }

    /// Store a new votation under the next id
    pub(crate) fn push_votation(&mut self, votation: Votation) -> VotationId {
        let id = votation.id();
        self.votations.push(votation);
        self.next_votation_id = id + 1;
        id
    }

    pub fn info(&self) -> OrganizationInfo {
        OrganizationInfo {
            address: self.address,
            token_id: self.token_id,
            sale_mode: self.sale.mode(),
            price_per_token: self.sale.price_per_token(),
            tokens_available: self.sale.tokens_available(),
            tokens_sold: self.sale.tokens_sold(),
            next_votation_id: self.next_votation_id,
            registered_at: self.registered_at,
        }
    }
}

/// Snapshot of an organization's registration and sale state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationInfo {
    pub address: Address,
    pub token_id: TokenId,
    pub sale_mode: SaleMode,
    pub price_per_token: Amount,
    pub tokens_available: Amount,
    pub tokens_sold: Amount,
    pub next_votation_id: VotationId,
    pub registered_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_votation_ids_start_at_one() {
        let sale = SaleAccount::open(SaleMode::FixedPrice, 10).unwrap();
        let mut org = Organization::new(Address::repeat_byte(1), TokenId::new(1), sale, 0);
        assert_eq!(org.next_votation_id(), 1);
        assert!(org.votation(0).is_none());
        assert!(org.votation(1).is_none());

        let votation = Votation::propose(
            org.next_votation_id(),
            Address::repeat_byte(2),
            "Topic".to_string(),
            vec!["Yes".to_string(), "No".to_string()],
            1,
            0,
        )
        .unwrap();

        assert_eq!(org.push_votation(votation), 1);
        assert_eq!(org.next_votation_id(), 2);
        assert_eq!(org.votation(1).unwrap().topic(), "Topic");
        assert!(org.votation(0).is_none());
        assert!(org.votation(2).is_none());
    }
}
