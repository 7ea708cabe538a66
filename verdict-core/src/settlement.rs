//! # Settlement
//!
//! Pari-mutuel payout computation and the per-market claim ledger. Once a
//! market resolves, winners split the losing pool proportionally to their
//! winning-side stake; the protocol takes a basis-point fee off each
//! reward. The math is a pure function of the finalized outcome and the
//! stake totals; nothing here reads a clock or external state.
//!
//! Rounding discipline: the net payout is truncated and the fee is the
//! exact remainder (`fee = gross - net`), so every rounding step lands in
//! the fee bucket and never mints value for a holder. The ledger exposes
//! `residual` so conservation can be audited as an exact equality.

use crate::error::{EngineError, Result};
use crate::AccountId;
use crate::BPS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One holder's settled payout.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    /// Stake plus share of the losing pool, before fees
    pub gross: u64,
    /// Protocol fee withheld
    pub fee: u64,
    /// Amount actually owed to the holder
    pub net: u64,
}

impl Payout {
    /// A push: the stake comes back untouched, no fee.
    pub fn push(amount: u64) -> Self {
        Payout {
            gross: amount,
            fee: 0,
            net: amount,
        }
    }
}

/// Pari-mutuel payout for a winning stake of `amount`.
///
/// `reward = amount + amount * losing_pool / winning_pool`, truncated;
/// the fee is `protocol_fee_bps` of the reward with truncation favoring
/// the fee bucket.
///
/// A degenerate market is a push, explicitly: with `winning_pool == 0`
/// (nobody staked the side that won) every stake comes back untouched,
/// and with `losing_pool == 0` (everybody staked the side that won) there
/// is no reward to fee, so the stake also comes back whole.
pub fn calculate_payout(
    amount: u64,
    winning_pool: u64,
    losing_pool: u64,
    protocol_fee_bps: u64,
) -> Result<Payout> {
    if winning_pool == 0 || losing_pool == 0 {
        return Ok(Payout::push(amount));
    }
    if protocol_fee_bps > BPS {
        return Err(EngineError::InvalidAmount(format!(
            "protocol fee {protocol_fee_bps} bps exceeds {BPS}"
        )));
    }

    let share = (amount as u128 * losing_pool as u128) / winning_pool as u128;
    let gross = (amount as u128)
        .checked_add(share)
        .ok_or_else(|| EngineError::Overflow("payout reward".to_string()))?;
    if gross > u64::MAX as u128 {
        return Err(EngineError::Overflow("payout reward".to_string()));
    }

    let net = gross * (BPS - protocol_fee_bps) as u128 / BPS as u128;
    let fee = gross - net;
    Ok(Payout {
        gross: gross as u64,
        fee: fee as u64,
        net: net as u64,
    })
}

/// Per-market claim bookkeeping.
///
/// The claimed-set is the one-shot flag behind `AlreadyClaimed`; it is set
/// before any transfer instruction leaves the engine.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SettlementLedger {
    claimed: BTreeSet<AccountId>,

    /// Sum of net payouts handed out so far
    pub paid_out: u64,

    /// Sum of protocol fees withheld so far
    pub fees_accrued: u64,
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_claimed(&self, holder: &str) -> bool {
        self.claimed.contains(holder)
    }

    /// Whether any payout has been claimed on this market.
    pub fn any_claimed(&self) -> bool {
        !self.claimed.is_empty()
    }

    /// Mark `holder` claimed and book the payout. Fails without side
    /// effects on a repeat claim.
    pub fn record_claim(&mut self, holder: &str, payout: Payout) -> Result<()> {
        if self.has_claimed(holder) {
            return Err(EngineError::AlreadyClaimed {
                holder: holder.to_string(),
            });
        }
        self.claimed.insert(holder.to_string());
        self.paid_out += payout.net;
        self.fees_accrued += payout.fee;
        Ok(())
    }

    /// Value still held by the market: truncation dust plus unclaimed
    /// payouts. `total_staked + paid_out + fees` never exceeds the pool.
    pub fn residual(&self, total_staked: u64) -> u64 {
        total_staked - self.paid_out - self.fees_accrued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_scenario_payout() {
        // A stakes 100 YES, B stakes 300 NO, outcome YES:
        // reward = 100 + 100*300/100 = 400
        let payout = calculate_payout(100, 100, 300, 200).unwrap();
        assert_eq!(payout.gross, 400);
        // 2% fee on 400 = 8
        assert_eq!(payout.fee, 8);
        assert_eq!(payout.net, 392);
    }

    #[test]
    fn test_zero_fee() {
        let payout = calculate_payout(100, 100, 300, 0).unwrap();
        assert_eq!(payout.gross, 400);
        assert_eq!(payout.fee, 0);
        assert_eq!(payout.net, 400);
    }

    #[test]
    fn test_degenerate_market_is_push() {
        let payout = calculate_payout(250, 0, 1000, 200).unwrap();
        assert_eq!(payout, Payout::push(250));
        assert_eq!(payout.fee, 0);
    }

    #[test]
    fn test_all_on_winning_side_is_push() {
        let payout = calculate_payout(500, 750, 0, 200).unwrap();
        assert_eq!(payout, Payout::push(500));
    }

    #[test]
    fn test_rounding_favors_fee_bucket() {
        // share = 100*100/300 = 33, gross = 133; 1% of 133 = 1.33,
        // so net truncates to 131 and the fee rounds up to 2.
        let payout = calculate_payout(100, 300, 100, 100).unwrap();
        assert_eq!(payout.gross, 133);
        assert_eq!(payout.fee, 2);
        assert_eq!(payout.net + payout.fee, payout.gross);
        // Fee is never below the exact percentage.
        assert!(payout.fee as u128 >= (payout.gross as u128 * 100) / BPS as u128);
    }

    #[test]
    fn test_share_truncation_never_exceeds_losing_pool() {
        // Three winners with awkward proportions; shares truncate down.
        let winning = 301u64;
        let losing = 1000u64;
        let stakes = [100u64, 100, 101];
        let mut total_gross = 0u64;
        for amount in stakes {
            let payout = calculate_payout(amount, winning, losing, 0).unwrap();
            total_gross += payout.gross;
        }
        assert!(total_gross <= winning + losing);
    }

    #[test]
    fn test_large_pools_do_not_overflow() {
        let payout = calculate_payout(1 << 40, 1 << 40, 1 << 41, 30).unwrap();
        assert!(payout.gross >= 1 << 40);
    }

    #[test]
    fn test_claim_ledger_idempotency() {
        let mut ledger = SettlementLedger::new();
        let payout = calculate_payout(100, 100, 300, 200).unwrap();
        ledger.record_claim("alice", payout).unwrap();
        assert!(ledger.has_claimed("alice"));
        assert_eq!(ledger.paid_out, 392);
        assert_eq!(ledger.fees_accrued, 8);

        let err = ledger.record_claim("alice", payout).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimed { .. }));
        // totals unchanged by the rejected claim
        assert_eq!(ledger.paid_out, 392);
        assert_eq!(ledger.fees_accrued, 8);
    }

    #[test]
    fn test_residual_accounts_for_everything() {
        let mut ledger = SettlementLedger::new();
        let payout = calculate_payout(100, 100, 300, 200).unwrap();
        ledger.record_claim("alice", payout).unwrap();
        // pool was 400 total
        assert_eq!(ledger.residual(400), 0);
    }
}
