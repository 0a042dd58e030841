//! Token ledger capability
//!
//! The ledger owns token balances per holder per token id. The registry only
//! relies on the four operations below; how balances are persisted is up to
//! the implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::{Address, Amount, TokenId};

/// Fungible multi-token ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Create `amount` new units of `token` owned by `owner`
    async fn mint(&self, owner: Address, token: TokenId, amount: Amount) -> CoreResult<()>;

    /// Destroy `amount` units of `token` owned by `owner`
    async fn burn(&self, owner: Address, token: TokenId, amount: Amount) -> CoreResult<()>;

    /// Move `amount` units of `token` from `from` to `to`
    async fn transfer(
        &self,
        from: Address,
        to: Address,
        token: TokenId,
        amount: Amount,
    ) -> CoreResult<()>;

    /// Current balance of `holder` for `token`
    async fn balance_of(&self, holder: Address, token: TokenId) -> CoreResult<Amount>;
}

/// Ledger kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<(Address, TokenId), Amount>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all balances of a token
    pub async fn total_supply(&self, token: TokenId) -> Amount {
        let balances = self.balances.read().await;
        balances
            .iter()
            .filter(|((_, t), _)| *t == token)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn mint(&self, owner: Address, token: TokenId, amount: Amount) -> CoreResult<()> {
        let mut balances = self.balances.write().await;
        let balance = balances.entry((owner, token)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow(format!("minting {} of {} to {}", amount, token, owner)))?;

        debug!("Minted {} of token {} to {}", amount, token, owner);
        Ok(())
    }

    async fn burn(&self, owner: Address, token: TokenId, amount: Amount) -> CoreResult<()> {
        let mut balances = self.balances.write().await;
        let balance = balances.get(&(owner, token)).copied().unwrap_or(0);
        if balance < amount {
            return Err(CoreError::InsufficientBalance {
                holder: owner,
                token,
                balance,
                requested: amount,
            });
        }

        balances.insert((owner, token), balance - amount);
        debug!("Burned {} of token {} from {}", amount, token, owner);
        Ok(())
    }

    async fn transfer(
        &self,
        from: Address,
        to: Address,
        token: TokenId,
        amount: Amount,
    ) -> CoreResult<()> {
        let mut balances = self.balances.write().await;
        let from_balance = balances.get(&(from, token)).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(CoreError::InsufficientBalance {
                holder: from,
                token,
                balance: from_balance,
                requested: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let to_balance = balances.get(&(to, token)).copied().unwrap_or(0);
        let new_to_balance = to_balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow(format!("crediting {} of {} to {}", amount, token, to)))?;

        balances.insert((from, token), from_balance - amount);
        balances.insert((to, token), new_to_balance);

        debug!("Transferred {} of token {} from {} to {}", amount, token, from, to);
        Ok(())
    }

    async fn balance_of(&self, holder: Address, token: TokenId) -> CoreResult<Amount> {
        let balances = self.balances.read().await;
        Ok(balances.get(&(holder, token)).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: TokenId = TokenId::new(1);

    #[tokio::test]
    async fn test_mint_transfer_burn() {
        let ledger = InMemoryLedger::new();
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);

        ledger.mint(alice, TOKEN, 100).await.unwrap();
        ledger.transfer(alice, bob, TOKEN, 30).await.unwrap();
        ledger.burn(bob, TOKEN, 10).await.unwrap();

        assert_eq!(ledger.balance_of(alice, TOKEN).await.unwrap(), 70);
        assert_eq!(ledger.balance_of(bob, TOKEN).await.unwrap(), 20);
        assert_eq!(ledger.total_supply(TOKEN).await, 90);
    }

    #[tokio::test]
    async fn test_overdraw_leaves_balances_untouched() {
        let ledger = InMemoryLedger::new();
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);

        ledger.mint(alice, TOKEN, 5).await.unwrap();

        let err = ledger.transfer(alice, bob, TOKEN, 6).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientBalance { balance: 5, requested: 6, .. }));

        let err = ledger.burn(bob, TOKEN, 1).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientBalance { balance: 0, .. }));

        assert_eq!(ledger.balance_of(alice, TOKEN).await.unwrap(), 5);
        assert_eq!(ledger.balance_of(bob, TOKEN).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tokens_are_isolated() {
        let ledger = InMemoryLedger::new();
        let alice = Address::repeat_byte(1);

        ledger.mint(alice, TOKEN, 5).await.unwrap();
        assert_eq!(ledger.balance_of(alice, TokenId::new(2)).await.unwrap(), 0);
    }
}
