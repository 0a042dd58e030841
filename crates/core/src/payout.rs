//! Forwarding of sale proceeds to an organization's payout address.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::types::{Address, Amount};

/// Sends native-currency value to an address
#[async_trait]
pub trait PayoutSink: Send + Sync {
    /// Forward `value` to `to`. An error means nothing was sent.
    async fn send(&self, to: Address, value: Amount) -> CoreResult<()>;
}

/// Payout sink that accepts every payment and remembers it
#[derive(Debug, Default)]
pub struct RecordingPayoutSink {
    payments: RwLock<Vec<(Address, Amount)>>,
}

impl RecordingPayoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payments sent so far, oldest first
    pub async fn payments(&self) -> Vec<(Address, Amount)> {
        self.payments.read().await.clone()
    }

    /// Total value sent to `to`
    pub async fn total_sent_to(&self, to: Address) -> Amount {
        self.payments
            .read()
            .await
            .iter()
            .filter(|(address, _)| *address == to)
            .map(|(_, value)| *value)
            .sum()
    }
}

#[async_trait]
impl PayoutSink for RecordingPayoutSink {
    async fn send(&self, to: Address, value: Amount) -> CoreResult<()> {
        self.payments.write().await.push((to, value));
        Ok(())
    }
}
