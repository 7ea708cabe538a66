//! # Stake Pool
//!
//! Per-market ledger of staked value by position. The pool is deliberately
//! independent of resolution: it only tracks who staked what, enforces the
//! market's per-holder bounds, and hands out refunds after a cancellation.
//! Whether staking is currently allowed is the engine's call, made against
//! the market lifecycle before the pool is touched.
//!
//! Invariant: `total_yes` and `total_no` always equal the sums of the
//! per-holder balances. Balances live in a `BTreeMap` so iteration order,
//! and therefore any arithmetic driven by it, is deterministic.

use crate::error::{EngineError, Result};
use crate::market::Outcome;
use crate::{AccountId, BPS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A holder's accumulated balance on each side of a market.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionBalance {
    pub yes: u64,
    pub no: u64,
}

impl PositionBalance {
    /// Balance on one side.
    pub fn side(&self, position: Outcome) -> u64 {
        match position {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }

    /// Combined balance across both sides.
    pub fn total(&self) -> u64 {
        self.yes + self.no
    }
}

/// Per-market stake ledger.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StakePool {
    /// Total staked on YES
    pub total_yes: u64,

    /// Total staked on NO
    pub total_no: u64,

    /// Accumulated balances per holder
    balances: BTreeMap<AccountId, PositionBalance>,

    /// Holders already refunded after cancellation
    refunded: BTreeSet<AccountId>,
}

impl StakePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total value held by the market across both positions.
    pub fn total(&self) -> u64 {
        self.total_yes + self.total_no
    }

    /// Total staked on one side.
    pub fn side_total(&self, position: Outcome) -> u64 {
        match position {
            Outcome::Yes => self.total_yes,
            Outcome::No => self.total_no,
        }
    }

    /// A holder's balance (zero if they never staked).
    pub fn balance(&self, holder: &str) -> PositionBalance {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    /// Number of distinct holders with a recorded balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate holders and balances in deterministic (lexicographic) order.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &PositionBalance)> {
        self.balances.iter()
    }

    /// Accumulate `amount` onto `holder`'s `position` balance.
    ///
    /// Bounds apply to the balance after accumulation: a holder may top up
    /// an existing position as long as the running total stays within
    /// `[min_stake, max_stake]`.
    pub fn deposit(
        &mut self,
        holder: &str,
        position: Outcome,
        amount: u64,
        min_stake: u64,
        max_stake: u64,
    ) -> Result<u64> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount(
                "stake amount must be positive".to_string(),
            ));
        }

        let current = self.balance(holder).side(position);
        let accumulated = current
            .checked_add(amount)
            .ok_or_else(|| EngineError::Overflow(format!("stake balance for {holder}")))?;

        if accumulated < min_stake || accumulated > max_stake {
            return Err(EngineError::StakeOutOfBounds(format!(
                "accumulated stake {accumulated} outside [{min_stake}, {max_stake}]"
            )));
        }

        let entry = self.balances.entry(holder.to_string()).or_default();
        match position {
            Outcome::Yes => {
                entry.yes = accumulated;
                self.total_yes += amount;
            }
            Outcome::No => {
                entry.no = accumulated;
                self.total_no += amount;
            }
        }
        Ok(accumulated)
    }

    /// Refund a holder's combined balance exactly once.
    ///
    /// Valid only after cancellation (enforced by the engine). The balance
    /// itself is kept for auditability; the refunded-set is the one-shot
    /// flag that makes the operation idempotent-rejecting.
    pub fn refund(&mut self, holder: &str) -> Result<u64> {
        if self.refunded.contains(holder) {
            return Err(EngineError::AlreadyRefunded {
                holder: holder.to_string(),
            });
        }
        let balance = self.balance(holder);
        let amount = balance.total();
        if amount == 0 {
            return Err(EngineError::NothingToRefund {
                holder: holder.to_string(),
            });
        }
        self.refunded.insert(holder.to_string());
        self.total_yes -= balance.yes;
        self.total_no -= balance.no;
        Ok(amount)
    }

    /// Whether a holder has already taken their cancellation refund.
    pub fn is_refunded(&self, holder: &str) -> bool {
        self.refunded.contains(holder)
    }

    /// Implied probability of `position` in basis points, read off the
    /// relative pool sizes. An empty market reads 50/50.
    pub fn implied_probability_bps(&self, position: Outcome) -> u64 {
        let total = self.total();
        if total == 0 {
            return BPS / 2;
        }
        // u128 to survive total * BPS on large pools
        ((self.side_total(position) as u128 * BPS as u128) / total as u128) as u64
    }
}
