//! Pricing engine
//!
//! Two policies are supported. Under `FixedPrice` every unit costs the
//! organization's configured price. Under `FixedQuantity` the unit price
//! follows a linear bonding curve over the organization's cumulative sales:
//! the k-th unit sold (0-indexed) costs `base_price + price_delta * k`.

use serde::{Deserialize, Serialize};

use orgvote_core::Amount;

use crate::error::{SaleError, SaleResult};

/// 0.01 native units at 18 decimals
pub const DEFAULT_BASE_PRICE: Amount = 10_000_000_000_000_000;

/// 0.001 native units at 18 decimals
pub const DEFAULT_PRICE_DELTA: Amount = 1_000_000_000_000_000;

/// Sale policy of an organization, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleMode {
    /// Constant admin-set price per token
    FixedPrice,
    /// Bonding-curve price over a mintable/burnable supply
    FixedQuantity,
}

/// Linear bonding curve parameters of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondingCurve {
    /// Price of the first unit ever sold
    pub base_price: Amount,
    /// Increase of the unit price per unit sold
    pub price_delta: Amount,
}

impl Default for BondingCurve {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_BASE_PRICE,
            price_delta: DEFAULT_PRICE_DELTA,
        }
    }
}

impl BondingCurve {
    pub fn new(base_price: Amount, price_delta: Amount) -> Self {
        Self {
            base_price,
            price_delta,
        }
    }

    /// Price of the unit at 0-indexed position `k` of cumulative sales
    pub fn unit_price(&self, k: Amount) -> SaleResult<Amount> {
        self.price_delta
            .checked_mul(k)
            .and_then(|ramp| ramp.checked_add(self.base_price))
            .ok_or(SaleError::ArithmeticOverflow("unit price"))
    }

    /// Cost of buying `amount` units after `tokens_sold` units were sold.
    ///
    /// Sum of the arithmetic series starting at `unit_price(tokens_sold)`:
    /// `amount * (2 * initial + delta * (amount - 1)) / 2`, with floor
    /// division.
    pub fn total_price(&self, tokens_sold: Amount, amount: Amount) -> SaleResult<Amount> {
        if amount == 0 {
            return Err(SaleError::ZeroAmount);
        }

        let initial_price = self.unit_price(tokens_sold)?;

        let doubled_initial = initial_price
            .checked_mul(2)
            .ok_or(SaleError::ArithmeticOverflow("initial price"))?;
        let ramp = self
            .price_delta
            .checked_mul(amount - 1)
            .ok_or(SaleError::ArithmeticOverflow("price ramp"))?;
        let pair_sum = doubled_initial
            .checked_add(ramp)
            .ok_or(SaleError::ArithmeticOverflow("price ramp"))?;

        amount
            .checked_mul(pair_sum)
            .map(|doubled_total| doubled_total / 2)
            .ok_or(SaleError::ArithmeticOverflow("total price"))
    }
}

/// Cost of purchasing `amount` units under `mode`.
///
/// `price_per_token` is only read under `FixedPrice`; `tokens_sold` and
/// `curve` only under `FixedQuantity`.
pub fn total_price(
    mode: SaleMode,
    price_per_token: Amount,
    tokens_sold: Amount,
    amount: Amount,
    curve: &BondingCurve,
) -> SaleResult<Amount> {
    match mode {
        SaleMode::FixedPrice => {
            if amount == 0 {
                return Err(SaleError::ZeroAmount);
            }
            price_per_token
                .checked_mul(amount)
                .ok_or(SaleError::ArithmeticOverflow("total price"))
        }
        SaleMode::FixedQuantity => curve.total_price(tokens_sold, amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(curve: &BondingCurve, tokens_sold: Amount, amount: Amount) -> Amount {
        (tokens_sold..tokens_sold + amount)
            .map(|k| curve.unit_price(k).unwrap())
            .sum()
    }

    #[test]
    fn test_first_three_units() {
        let curve = BondingCurve::default();
        let expected = DEFAULT_BASE_PRICE
            + (DEFAULT_BASE_PRICE + DEFAULT_PRICE_DELTA)
            + (DEFAULT_BASE_PRICE + 2 * DEFAULT_PRICE_DELTA);
        assert_eq!(curve.total_price(0, 3).unwrap(), expected);
    }

    #[test]
    fn test_price_depends_on_sold_offset() {
        let curve = BondingCurve::default();
        assert_eq!(curve.total_price(0, 1).unwrap(), DEFAULT_BASE_PRICE);
        assert_eq!(
            curve.total_price(1, 2).unwrap(),
            2 * DEFAULT_BASE_PRICE + 3 * DEFAULT_PRICE_DELTA
        );
    }

    #[test]
    fn test_fixed_price_ignores_sold() {
        let curve = BondingCurve::default();
        assert_eq!(total_price(SaleMode::FixedPrice, 7, 0, 3, &curve).unwrap(), 21);
        assert_eq!(total_price(SaleMode::FixedPrice, 7, 500, 3, &curve).unwrap(), 21);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let curve = BondingCurve::default();
        assert_eq!(curve.total_price(0, 0), Err(SaleError::ZeroAmount));
        assert_eq!(
            total_price(SaleMode::FixedPrice, 7, 0, 0, &curve),
            Err(SaleError::ZeroAmount)
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let curve = BondingCurve::new(Amount::MAX / 2, 1);
        assert!(matches!(
            curve.total_price(0, 3),
            Err(SaleError::ArithmeticOverflow(_))
        ));
        assert!(matches!(
            total_price(SaleMode::FixedPrice, Amount::MAX, 0, 2, &curve),
            Err(SaleError::ArithmeticOverflow(_))
        ));
    }

    proptest! {
        #[test]
        fn closed_form_matches_unit_sum(
            base in 0u128..1_000_000,
            delta in 0u128..1_000_000,
            sold in 0u128..10_000,
            amount in 1u128..200,
        ) {
            let curve = BondingCurve::new(base, delta);
            prop_assert_eq!(curve.total_price(sold, amount).unwrap(), brute_force(&curve, sold, amount));
        }

        #[test]
        fn split_purchases_cost_the_same(
            sold in 0u128..10_000,
            first in 1u128..100,
            second in 1u128..100,
        ) {
            let curve = BondingCurve::default();
            let together = curve.total_price(sold, first + second).unwrap();
            let apart = curve.total_price(sold, first).unwrap()
                + curve.total_price(sold + first, second).unwrap();
            prop_assert_eq!(together, apart);
        }
    }
}
