//! # Claim-Token AMM
//!
//! Constant-product market over the two claim balances of a market,
//! letting holders rotate between YES and NO exposure before resolution.
//! The pool is independent of resolution state; custody of the claim
//! tokens themselves belongs to the external value-transfer layer.
//!
//! The core correctness property: `reserve_yes * reserve_no` never
//! decreases across a swap. The swap fee stays in the input reserve, so
//! with a nonzero fee the product strictly grows.

use crate::error::{EngineError, Result};
use crate::market::Outcome;
use crate::{AccountId, BPS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer square root (Newton's method, rounding down).
pub fn isqrt(x: u128) -> u64 {
    if x == 0 {
        return 0;
    }
    let mut guess = x;
    let mut next = (guess + 1) / 2;
    while next < guess {
        guess = next;
        next = (guess + x / guess) / 2;
    }
    guess as u64
}

/// Result of a swap, for callers that want the fee breakdown.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapOutcome {
    /// Tokens paid in (fee included)
    pub amount_in: u64,
    /// Tokens received
    pub amount_out: u64,
    /// Portion of the input retained by the pool as fee
    pub fee_paid: u64,
}

/// Constant-product pool over one market's YES and NO claim balances.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AmmPool {
    /// Pooled YES claims
    pub reserve_yes: u64,

    /// Pooled NO claims
    pub reserve_no: u64,

    /// Outstanding liquidity shares
    pub total_liquidity: u64,

    /// Swap fee in basis points, applied to the input side
    pub fee_bps: u64,

    /// Liquidity shares per provider
    positions: BTreeMap<AccountId, u64>,
}

impl AmmPool {
    pub fn new(fee_bps: u64) -> Self {
        AmmPool {
            reserve_yes: 0,
            reserve_no: 0,
            total_liquidity: 0,
            fee_bps,
            positions: BTreeMap::new(),
        }
    }

    /// Current invariant value.
    pub fn product(&self) -> u128 {
        self.reserve_yes as u128 * self.reserve_no as u128
    }

    /// A provider's share balance.
    pub fn shares_of(&self, provider: &str) -> u64 {
        self.positions.get(provider).copied().unwrap_or(0)
    }

    fn reserve(&self, side: Outcome) -> u64 {
        match side {
            Outcome::Yes => self.reserve_yes,
            Outcome::No => self.reserve_no,
        }
    }

    /// Deposit both claim balances and mint liquidity shares.
    ///
    /// The first deposit prices the pool and mints `isqrt(a * b)`; later
    /// deposits mint the minimum of the two proportional entitlements, so
    /// a mispriced deposit cannot mint excess shares; the surplus side is
    /// simply donated to the pool.
    pub fn add_liquidity(&mut self, provider: &str, amount_yes: u64, amount_no: u64) -> Result<u64> {
        if amount_yes == 0 || amount_no == 0 {
            return Err(EngineError::InvalidAmount(
                "liquidity requires both sides".to_string(),
            ));
        }

        let minted = if self.total_liquidity == 0 {
            isqrt(amount_yes as u128 * amount_no as u128)
        } else {
            let by_yes =
                amount_yes as u128 * self.total_liquidity as u128 / self.reserve_yes as u128;
            let by_no = amount_no as u128 * self.total_liquidity as u128 / self.reserve_no as u128;
            by_yes.min(by_no) as u64
        };
        if minted == 0 {
            return Err(EngineError::InvalidAmount(
                "deposit too small to mint a share".to_string(),
            ));
        }

        self.reserve_yes = self
            .reserve_yes
            .checked_add(amount_yes)
            .ok_or_else(|| EngineError::Overflow("yes reserve".to_string()))?;
        self.reserve_no = self
            .reserve_no
            .checked_add(amount_no)
            .ok_or_else(|| EngineError::Overflow("no reserve".to_string()))?;
        self.total_liquidity = self
            .total_liquidity
            .checked_add(minted)
            .ok_or_else(|| EngineError::Overflow("total liquidity".to_string()))?;
        *self.positions.entry(provider.to_string()).or_insert(0) += minted;
        Ok(minted)
    }

    /// Burn liquidity shares for a proportional cut of both reserves.
    ///
    /// Burning the final shares must empty the pool exactly; if truncation
    /// would strand reserves behind zero outstanding liquidity the burn is
    /// rejected instead.
    pub fn remove_liquidity(&mut self, provider: &str, shares: u64) -> Result<(u64, u64)> {
        if shares == 0 {
            return Err(EngineError::InvalidAmount(
                "must burn at least one share".to_string(),
            ));
        }
        let held = self.shares_of(provider);
        if held < shares {
            return Err(EngineError::InsufficientLiquidity(format!(
                "provider holds {held} shares, tried to burn {shares}"
            )));
        }

        let out_yes =
            (shares as u128 * self.reserve_yes as u128 / self.total_liquidity as u128) as u64;
        let out_no =
            (shares as u128 * self.reserve_no as u128 / self.total_liquidity as u128) as u64;

        let remaining = self.total_liquidity - shares;
        if remaining == 0 && (out_yes != self.reserve_yes || out_no != self.reserve_no) {
            return Err(EngineError::ResidualDust(format!(
                "final burn would strand {} YES / {} NO",
                self.reserve_yes - out_yes,
                self.reserve_no - out_no
            )));
        }

        self.reserve_yes -= out_yes;
        self.reserve_no -= out_no;
        self.total_liquidity = remaining;
        let position = self
            .positions
            .get_mut(provider)
            .expect("provider holds shares");
        *position -= shares;
        if *position == 0 {
            self.positions.remove(provider);
        }
        Ok((out_yes, out_no))
    }

    /// Swap `amount_in` of `token_in` claims for the opposite side.
    ///
    /// The fee comes off the input before the constant-product quote; the
    /// full input (fee included) lands in the input reserve, which is what
    /// makes the invariant grow.
    pub fn swap(
        &mut self,
        token_in: Outcome,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapOutcome> {
        if amount_in == 0 {
            return Err(EngineError::InvalidAmount(
                "swap amount must be positive".to_string(),
            ));
        }
        let reserve_in = self.reserve(token_in);
        let reserve_out = self.reserve(token_in.flip());
        if reserve_in == 0 || reserve_out == 0 {
            return Err(EngineError::InsufficientLiquidity(
                "pool has no reserves".to_string(),
            ));
        }

        let in_after_fee = amount_in as u128 * (BPS - self.fee_bps) as u128 / BPS as u128;
        let amount_out =
            (in_after_fee * reserve_out as u128 / (reserve_in as u128 + in_after_fee)) as u64;

        if amount_out < min_amount_out {
            return Err(EngineError::SlippageExceeded {
                amount_out,
                minimum: min_amount_out,
            });
        }
        if amount_out >= reserve_out {
            return Err(EngineError::InsufficientLiquidity(format!(
                "swap would drain the {} reserve",
                token_in.flip()
            )));
        }

        let product_before = self.product();
        let new_in = reserve_in
            .checked_add(amount_in)
            .ok_or_else(|| EngineError::Overflow("input reserve".to_string()))?;
        let new_out = reserve_out - amount_out;
        if (new_in as u128 * new_out as u128) < product_before {
            return Err(EngineError::InvariantViolation(
                "constant product would decrease".to_string(),
            ));
        }

        match token_in {
            Outcome::Yes => {
                self.reserve_yes = new_in;
                self.reserve_no = new_out;
            }
            Outcome::No => {
                self.reserve_no = new_in;
                self.reserve_yes = new_out;
            }
        }

        let fee_paid = amount_in - in_after_fee as u64;
        Ok(SwapOutcome {
            amount_in,
            amount_out,
            fee_paid,
        })
    }
}
