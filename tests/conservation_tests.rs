//! Property tests for supply conservation across registry operations

use std::sync::Arc;

use proptest::prelude::*;

use orgvote::{
    Address, Amount, InMemoryAccessGate, InMemoryLedger, Ledger, ManualClock, OrganizationRegistry,
    RecordingPayoutSink, RegistrySettings, SaleMode,
};

const ORG: Address = Address::repeat_byte(0x01);
const ADMIN: Address = Address::repeat_byte(0xad);

#[derive(Debug, Clone)]
enum Op {
    Buy { buyer: u8, amount: Amount },
    Adjust(i128),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, 0u128..40).prop_map(|(buyer, amount)| Op::Buy { buyer, amount }),
        (-50i128..50).prop_map(Op::Adjust),
    ]
}

proptest! {
    #[test]
    fn supply_matches_ledger(supply in 1u128..200, ops in prop::collection::vec(op(), 0..25)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let ledger = Arc::new(InMemoryLedger::new());
            let access = Arc::new(InMemoryAccessGate::new());
            let payout = Arc::new(RecordingPayoutSink::new());
            let registry = OrganizationRegistry::new(
                ledger.clone(),
                access.clone(),
                payout.clone(),
                Arc::new(ManualClock::new(0)),
                RegistrySettings::default(),
            );
            access.grant_admin(ORG, ADMIN).await;
            let token = registry
                .register(ORG, SaleMode::FixedQuantity, supply)
                .await
                .unwrap()
                .token_id;

            let mut expected_total = supply;
            let mut expected_proceeds: Amount = 0;

            for op in ops {
                match op {
                    Op::Buy { buyer, amount } => {
                        let buyer = Address::repeat_byte(0x10 + buyer);
                        let price = registry.quote_price(ORG, amount).await;
                        if let Ok(price) = price {
                            if registry.buy(ORG, buyer, amount, price).await.is_ok() {
                                expected_proceeds += price;
                            }
                        }
                    }
                    Op::Adjust(delta) => {
                        if registry.adjust_available(ORG, ADMIN, delta).await.is_ok() {
                            expected_total = (expected_total as i128 + delta) as Amount;
                        }
                    }
                }
            }

            let info = registry.organization(ORG).await.unwrap();
            assert_eq!(info.tokens_available + info.tokens_sold, expected_total);
            assert_eq!(ledger.total_supply(token).await, expected_total);
            assert_eq!(
                ledger.balance_of(Address::TREASURY, token).await.unwrap(),
                info.tokens_available
            );
            assert_eq!(payout.total_sent_to(ORG).await, expected_proceeds);
        });
    }
}
