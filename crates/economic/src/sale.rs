//! Per-organization sale account.

use serde::{Deserialize, Serialize};
use tracing::debug;

use orgvote_core::Amount;

use crate::error::{SaleError, SaleResult};
use crate::pricing::{total_price, BondingCurve, SaleMode};

/// A requested change of the unsold supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityChange {
    /// Mint into the treasury
    Increase(Amount),
    /// Burn from the treasury
    Decrease(Amount),
}

impl AvailabilityChange {
    /// Interpret a signed delta. Zero is rejected.
    pub fn from_delta(delta: i128) -> SaleResult<Self> {
        match delta {
            0 => Err(SaleError::ZeroAmount),
            d if d > 0 => Ok(Self::Increase(d.unsigned_abs())),
            d => Ok(Self::Decrease(d.unsigned_abs())),
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Self::Increase(amount) | Self::Decrease(amount) => *amount,
        }
    }
}

/// A purchase whose counters have been committed to the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Units bought
    pub amount: Amount,
    /// Exact value paid
    pub total_price: Amount,
    /// Cumulative units sold before this purchase
    pub tokens_sold_before: Amount,
}

/// Sale state of one organization
///
/// `tokens_available` and `tokens_sold` move in lockstep on every purchase;
/// only `FixedQuantity` accounts may change `tokens_available` on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleAccount {
    mode: SaleMode,
    price_per_token: Amount,
    tokens_available: Amount,
    tokens_sold: Amount,
}

impl SaleAccount {
    /// Open a sale with `initial_supply` unsold units
    pub fn open(mode: SaleMode, initial_supply: Amount) -> SaleResult<Self> {
        if initial_supply == 0 {
            return Err(SaleError::ZeroSupply);
        }

        Ok(Self {
            mode,
            price_per_token: 0,
            tokens_available: initial_supply,
            tokens_sold: 0,
        })
    }

    pub fn mode(&self) -> SaleMode {
        self.mode
    }

    pub fn price_per_token(&self) -> Amount {
        self.price_per_token
    }

    pub fn tokens_available(&self) -> Amount {
        self.tokens_available
    }

    pub fn tokens_sold(&self) -> Amount {
        self.tokens_sold
    }

    fn require_mode(&self, expected: SaleMode) -> SaleResult<()> {
        if self.mode != expected {
            return Err(SaleError::WrongSaleMode {
                expected,
                actual: self.mode,
            });
        }
        Ok(())
    }

    /// Set the fixed unit price
    pub fn set_price(&mut self, price: Amount) -> SaleResult<()> {
        self.require_mode(SaleMode::FixedPrice)?;
        self.price_per_token = price;
        debug!("Price per token set to {}", price);
        Ok(())
    }

    /// Cost of buying `amount` units right now
    pub fn quote(&self, amount: Amount, curve: &BondingCurve) -> SaleResult<Amount> {
        total_price(self.mode, self.price_per_token, self.tokens_sold, amount, curve)
    }

    /// Validate a purchase paying `paid_value` and apply it to the counters.
    ///
    /// Nothing is changed when validation fails.
    pub fn purchase(
        &mut self,
        amount: Amount,
        paid_value: Amount,
        curve: &BondingCurve,
    ) -> SaleResult<Purchase> {
        if amount == 0 {
            return Err(SaleError::ZeroAmount);
        }
        if self.tokens_available < amount {
            return Err(SaleError::InsufficientAvailability {
                available: self.tokens_available,
                requested: amount,
            });
        }

        let expected = self.quote(amount, curve)?;
        if paid_value != expected {
            return Err(SaleError::ValueMismatch {
                expected,
                paid: paid_value,
            });
        }

        let tokens_sold = self
            .tokens_sold
            .checked_add(amount)
            .ok_or(SaleError::ArithmeticOverflow("tokens sold"))?;

        let purchase = Purchase {
            amount,
            total_price: expected,
            tokens_sold_before: self.tokens_sold,
        };

        self.tokens_available -= amount;
        self.tokens_sold = tokens_sold;

        Ok(purchase)
    }

    /// Undo a purchase returned by [`SaleAccount::purchase`]
    pub fn revert_purchase(&mut self, purchase: &Purchase) -> SaleResult<()> {
        let tokens_sold = self
            .tokens_sold
            .checked_sub(purchase.amount)
            .ok_or(SaleError::ArithmeticOverflow("tokens sold"))?;
        let tokens_available = self
            .tokens_available
            .checked_add(purchase.amount)
            .ok_or(SaleError::ArithmeticOverflow("tokens available"))?;

        self.tokens_sold = tokens_sold;
        self.tokens_available = tokens_available;
        Ok(())
    }

    /// Check that `change` may be applied without applying it
    pub fn check_adjustment(&self, change: AvailabilityChange) -> SaleResult<()> {
        self.require_mode(SaleMode::FixedQuantity)?;

        match change {
            AvailabilityChange::Increase(amount) => {
                self.tokens_available
                    .checked_add(amount)
                    .ok_or(SaleError::ArithmeticOverflow("tokens available"))?;
            }
            AvailabilityChange::Decrease(amount) => {
                if self.tokens_available < amount {
                    return Err(SaleError::InsufficientAvailability {
                        available: self.tokens_available,
                        requested: amount,
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply a change of the unsold supply
    pub fn adjust_available(&mut self, change: AvailabilityChange) -> SaleResult<()> {
        self.check_adjustment(change)?;

        match change {
            AvailabilityChange::Increase(amount) => self.tokens_available += amount,
            AvailabilityChange::Decrease(amount) => self.tokens_available -= amount,
        }

        debug!("Tokens available now {}", self.tokens_available);
        Ok(())
    }
}
