//! Organization-scoped admin lookups.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::CoreResult;
use crate::types::Address;

/// Answers whether an address holds administrative capability over an
/// organization
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn is_admin(&self, organization: Address, address: Address) -> CoreResult<bool>;
}

/// Admin sets kept in memory
#[derive(Debug, Default)]
pub struct InMemoryAccessGate {
    admins: RwLock<HashMap<Address, HashSet<Address>>>,
}

impl InMemoryAccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant admin capability over `organization` to `address`
    pub async fn grant_admin(&self, organization: Address, address: Address) {
        let mut admins = self.admins.write().await;
        if admins.entry(organization).or_default().insert(address) {
            info!("Granted admin on {} to {}", organization, address);
        }
    }

    /// Revoke admin capability over `organization` from `address`
    pub async fn revoke_admin(&self, organization: Address, address: Address) {
        let mut admins = self.admins.write().await;
        if let Some(set) = admins.get_mut(&organization) {
            if set.remove(&address) {
                info!("Revoked admin on {} from {}", organization, address);
            }
        }
    }
}

#[async_trait]
impl AccessGate for InMemoryAccessGate {
    async fn is_admin(&self, organization: Address, address: Address) -> CoreResult<bool> {
        let admins = self.admins.read().await;
        Ok(admins
            .get(&organization)
            .map(|set| set.contains(&address))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_is_scoped_to_organization() {
        let gate = InMemoryAccessGate::new();
        let org_a = Address::repeat_byte(0xa0);
        let org_b = Address::repeat_byte(0xb0);
        let admin = Address::repeat_byte(1);

        gate.grant_admin(org_a, admin).await;

        assert!(gate.is_admin(org_a, admin).await.unwrap());
        assert!(!gate.is_admin(org_b, admin).await.unwrap());

        gate.revoke_admin(org_a, admin).await;
        assert!(!gate.is_admin(org_a, admin).await.unwrap());
    }
}
