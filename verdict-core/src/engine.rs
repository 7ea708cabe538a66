//! # Engine
//!
//! Composition root wiring the market registry, stake pools, oracle
//! consensus, dispute book, settlement ledgers and AMM pools behind one
//! mutable facade. Every public operation is atomic: all checks run before
//! the first mutation, so a rejected call leaves state untouched.
//!
//! The engine never reads a clock and never moves value. Callers pass
//! `now` explicitly, and operations that pay out return a
//! [`TransferInstruction`] for the external value-transfer layer. State
//! is always mutated before the instruction leaves the engine, which is
//! the checks-effects-interactions ordering that makes claims re-entrancy
//! safe on any ledger.

use crate::amm::{AmmPool, SwapOutcome};
use crate::dispute::{Dispute, DisputeBook};
use crate::error::{EngineError, Result};
use crate::market::{Market, MarketId, MarketParams, MarketRegistry, MarketState, Outcome};
use crate::oracle::{Finalization, OracleConsensus, Resolution, SourceId, SourceRecord};
use crate::settlement::{calculate_payout, SettlementLedger};
use crate::stake::{PositionBalance, StakePool};
use crate::{AccountId, BPS, DEFAULT_DISPUTE_PERIOD, DEFAULT_MIN_CONFIDENCE_BPS,
    DEFAULT_MIN_DISPUTE_BOND, DEFAULT_MIN_SOURCES, DEFAULT_PROTOCOL_FEE_BPS,
    DEFAULT_SWAP_FEE_BPS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Governance-tunable protocol parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct GovernanceParams {
    /// Quorum: distinct verified sources required to finalize
    pub min_sources: u64,

    /// Floor on a source's self-declared confidence, in basis points
    pub min_confidence_bps: u64,

    /// Seconds after finalization during which disputes are accepted
    pub dispute_period: u64,

    /// Protocol fee on settlement rewards, in basis points
    pub protocol_fee_bps: u64,

    /// Minimum bond to raise a dispute
    pub min_dispute_bond: u64,

    /// AMM swap fee, in basis points
    pub swap_fee_bps: u64,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        GovernanceParams {
            min_sources: DEFAULT_MIN_SOURCES,
            min_confidence_bps: DEFAULT_MIN_CONFIDENCE_BPS,
            dispute_period: DEFAULT_DISPUTE_PERIOD,
            protocol_fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            min_dispute_bond: DEFAULT_MIN_DISPUTE_BOND,
            swap_fee_bps: DEFAULT_SWAP_FEE_BPS,
        }
    }
}

impl GovernanceParams {
    fn validate(&self) -> Result<()> {
        if self.min_sources == 0 {
            return Err(EngineError::InvalidAmount(
                "quorum must be at least one source".to_string(),
            ));
        }
        if self.protocol_fee_bps > BPS || self.swap_fee_bps > BPS || self.min_confidence_bps > BPS {
            return Err(EngineError::InvalidAmount(
                "basis-point parameter exceeds 10000".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a transfer is owed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferReason {
    /// Settlement payout to a winning holder
    Payout,
    /// Cancellation refund of staked value
    Refund,
    /// Bond returned for an accepted dispute
    DisputeBondRefund,
}

/// Instruction for the external value-transfer layer.
///
/// The engine's state is already updated when one of these is returned;
/// if the transfer fails the caller must revert the whole operation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransferInstruction {
    pub to: AccountId,
    pub amount: u64,
    pub reason: TransferReason,
}

/// The resolution and settlement engine.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Engine {
    /// Sole account allowed to cancel markets, judge disputes and update
    /// parameters
    governance: AccountId,

    /// Sole account allowed to register and verify data sources
    identity: AccountId,

    params: GovernanceParams,
    markets: MarketRegistry,
    pools: BTreeMap<MarketId, StakePool>,
    consensus: OracleConsensus,
    disputes: DisputeBook,
    settlements: BTreeMap<MarketId, SettlementLedger>,
    amms: BTreeMap<MarketId, AmmPool>,

    /// Accumulated protocol fees and forfeited dispute bonds
    treasury: u64,
}

impl Engine {
    pub fn new(governance: &str, identity: &str) -> Self {
        Self::with_params(governance, identity, GovernanceParams::default())
    }

    pub fn with_params(governance: &str, identity: &str, params: GovernanceParams) -> Self {
        Engine {
            governance: governance.to_string(),
            identity: identity.to_string(),
            params,
            markets: MarketRegistry::new(),
            pools: BTreeMap::new(),
            consensus: OracleConsensus::new(),
            disputes: DisputeBook::new(),
            settlements: BTreeMap::new(),
            amms: BTreeMap::new(),
            treasury: 0,
        }
    }

    fn require_governance(&self, caller: &str) -> Result<()> {
        if caller != self.governance {
            return Err(EngineError::Unauthorized(format!(
                "{caller} is not the governance authority"
            )));
        }
        Ok(())
    }

    fn require_identity(&self, caller: &str) -> Result<()> {
        if caller != self.identity {
            return Err(EngineError::Unauthorized(format!(
                "{caller} is not the identity authority"
            )));
        }
        Ok(())
    }

    // ---- market registry ----

    /// Register a market on behalf of the external registry.
    pub fn create_market(&mut self, params: MarketParams, now: u64) -> Result<MarketId> {
        let id = self.markets.create(params, now)?;
        self.pools.insert(id, StakePool::new());
        self.settlements.insert(id, SettlementLedger::new());
        self.amms.insert(id, AmmPool::new(self.params.swap_fee_bps));
        info!(market = %id, "market registered");
        Ok(id)
    }

    pub fn market(&self, id: MarketId) -> Result<&Market> {
        self.markets.get(id)
    }

    /// Effective lifecycle state at `now`.
    pub fn market_state(&self, id: MarketId, now: u64) -> Result<MarketState> {
        Ok(self.markets.get(id)?.state_at(now))
    }

    /// Emergency cancellation; governance only. Terminal, and invalid once
    /// the market has resolved.
    pub fn cancel_market(&mut self, caller: &str, id: MarketId, now: u64) -> Result<()> {
        self.require_governance(caller)?;
        let market = self.markets.get_mut(id)?;
        if matches!(market.state, MarketState::Resolved | MarketState::Cancelled) {
            return Err(EngineError::InvalidState(format!(
                "market already {}",
                market.state
            )));
        }
        market.mark_cancelled(now);
        info!(market = %id, "market cancelled");
        Ok(())
    }

    /// Current governance parameters.
    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    /// Replace the governance parameters; governance only.
    pub fn update_params(&mut self, caller: &str, params: GovernanceParams) -> Result<()> {
        self.require_governance(caller)?;
        params.validate()?;
        self.params = params;
        info!("governance parameters updated");
        Ok(())
    }

    /// Fees and forfeited bonds accumulated so far.
    pub fn treasury(&self) -> u64 {
        self.treasury
    }

    // ---- stake pool ----

    /// Stake `amount` on `position`. Returns the holder's accumulated
    /// balance on that side.
    pub fn stake(
        &mut self,
        id: MarketId,
        holder: &str,
        position: Outcome,
        amount: u64,
        now: u64,
    ) -> Result<u64> {
        let market = self.markets.get(id)?;
        if !market.is_open(now) {
            return Err(EngineError::MarketClosed(format!(
                "{id} is {}",
                market.state_at(now)
            )));
        }
        let (min_stake, max_stake) = (market.min_stake, market.max_stake);
        let pool = self.pools.get_mut(&id).ok_or(EngineError::UnknownMarket(id.0))?;
        let accumulated = pool.deposit(holder, position, amount, min_stake, max_stake)?;
        debug!(market = %id, holder, position = %position, amount, accumulated, "stake accepted");
        Ok(accumulated)
    }

    /// The stake pool for a market.
    pub fn stake_pool(&self, id: MarketId) -> Result<&StakePool> {
        self.pools.get(&id).ok_or(EngineError::UnknownMarket(id.0))
    }

    /// A holder's position balances.
    pub fn balance(&self, id: MarketId, holder: &str) -> Result<PositionBalance> {
        Ok(self.stake_pool(id)?.balance(holder))
    }

    /// Refund a holder's full stake after cancellation. Idempotent-
    /// rejecting via the pool's refunded-set.
    pub fn refund(&mut self, id: MarketId, holder: &str) -> Result<TransferInstruction> {
        let market = self.markets.get(id)?;
        if market.state != MarketState::Cancelled {
            return Err(EngineError::InvalidState(format!(
                "refunds require cancellation, market is {}",
                market.state
            )));
        }
        let pool = self.pools.get_mut(&id).ok_or(EngineError::UnknownMarket(id.0))?;
        let amount = pool.refund(holder)?;
        info!(market = %id, holder, amount, "stake refunded");
        Ok(TransferInstruction {
            to: holder.to_string(),
            amount,
            reason: TransferReason::Refund,
        })
    }

    // ---- oracle consensus ----

    /// Register a data source; identity authority only.
    pub fn register_source(&mut self, caller: &str, account: &str, label: &str) -> Result<SourceId> {
        self.require_identity(caller)?;
        let id = self.consensus.register_source(account, label);
        info!(source = %id, label, "source registered");
        Ok(id)
    }

    /// Mark a source verified; identity authority only.
    pub fn verify_source(&mut self, caller: &str, id: SourceId) -> Result<()> {
        self.require_identity(caller)?;
        self.consensus.verify_source(id)
    }

    pub fn source(&self, id: SourceId) -> Result<&SourceRecord> {
        self.consensus.source(id)
    }

    /// Submit an outcome report for an expired market. Finalizes the
    /// market and returns the summary once quorum is reached.
    pub fn submit_report(
        &mut self,
        id: MarketId,
        source: SourceId,
        outcome: Outcome,
        confidence_claim_bps: u64,
        evidence: &str,
        now: u64,
    ) -> Result<Option<Finalization>> {
        let market = self.markets.get(id)?;
        if market.state == MarketState::Cancelled {
            return Err(EngineError::InvalidState(
                "cancelled markets take no reports".to_string(),
            ));
        }
        if !market.is_expired(now) {
            return Err(EngineError::InvalidState(format!(
                "market expires at {}, now {now}",
                market.expiry
            )));
        }

        let finalization = self.consensus.submit_report(
            id,
            source,
            outcome,
            confidence_claim_bps,
            evidence,
            now,
            self.params.min_confidence_bps,
            self.params.min_sources,
        )?;
        if let Some(fin) = &finalization {
            self.markets.get_mut(id)?.mark_resolved(fin.finalized_at);
        }
        Ok(finalization)
    }

    /// Resolution record for a market, if any reports have arrived.
    pub fn resolution(&self, id: MarketId) -> Option<&Resolution> {
        self.consensus.resolution(id)
    }

    /// All registered sources.
    pub fn sources(&self) -> impl Iterator<Item = &SourceRecord> {
        self.consensus.sources()
    }

    // ---- disputes ----

    /// Challenge a finalized outcome inside the dispute window. The bond
    /// is assumed received by the transfer layer in the same transaction.
    pub fn raise_dispute(
        &mut self,
        id: MarketId,
        challenger: &str,
        proposed: Outcome,
        evidence: &str,
        bond: u64,
        now: u64,
    ) -> Result<u64> {
        self.markets.get(id)?;
        let resolution = self
            .consensus
            .resolution(id)
            .filter(|r| r.is_finalized())
            .ok_or_else(|| EngineError::NotFinalized(format!("{id}")))?;
        let finalized_at = resolution.finalized_at.expect("finalized resolution");
        let deadline = finalized_at + self.params.dispute_period;
        self.disputes.raise(
            id,
            challenger,
            proposed,
            evidence,
            bond,
            self.params.min_dispute_bond,
            now,
            deadline,
        )
    }

    /// Dispute history for a market.
    pub fn disputes(&self, id: MarketId) -> &[Dispute] {
        self.disputes.disputes(id)
    }

    /// Judge a dispute; governance only.
    ///
    /// Accepting overrides the finalized outcome with the challenger's
    /// proposal and refunds their bond; rejecting forfeits the bond to the
    /// treasury. Returns the refund instruction on acceptance.
    pub fn resolve_dispute(
        &mut self,
        caller: &str,
        id: MarketId,
        index: u64,
        accept: bool,
        now: u64,
    ) -> Result<Option<TransferInstruction>> {
        self.require_governance(caller)?;
        self.markets.get(id)?;
        if accept {
            let ledger = self
                .settlements
                .get(&id)
                .ok_or(EngineError::UnknownMarket(id.0))?;
            if ledger.any_claimed() {
                return Err(EngineError::ClaimsStarted(id.0));
            }
        }

        let settled = self.disputes.judge(id, index, accept, now)?;
        if accept {
            self.consensus.override_outcome(id, settled.proposed)?;
            Ok(Some(TransferInstruction {
                to: settled.challenger,
                amount: settled.bond,
                reason: TransferReason::DisputeBondRefund,
            }))
        } else {
            self.treasury += settled.bond;
            Ok(None)
        }
    }

    // ---- settlement ----

    /// Claim a settlement payout.
    ///
    /// Requires the market resolved, the dispute window over with no
    /// dispute pending, an unclaimed holder and a winning-side balance.
    /// The claimed flag is set before the instruction is returned.
    pub fn claim_reward(
        &mut self,
        id: MarketId,
        holder: &str,
        now: u64,
    ) -> Result<TransferInstruction> {
        let market = self.markets.get(id)?;
        if market.state != MarketState::Resolved {
            return Err(EngineError::InvalidState(format!(
                "claims require resolution, market is {}",
                market.state
            )));
        }
        let resolution = self
            .consensus
            .resolution(id)
            .ok_or_else(|| EngineError::NotFinalized(format!("{id}")))?;
        let outcome = resolution
            .outcome
            .ok_or_else(|| EngineError::NotFinalized(format!("{id}")))?;
        let finalized_at = resolution.finalized_at.expect("finalized resolution");

        let window_ends = finalized_at + self.params.dispute_period;
        if now <= window_ends {
            return Err(EngineError::InvalidState(format!(
                "dispute window open until {window_ends}"
            )));
        }
        if self.disputes.has_pending(id) {
            return Err(EngineError::InvalidState(
                "pending dispute blocks claims".to_string(),
            ));
        }

        let ledger = self
            .settlements
            .get(&id)
            .ok_or(EngineError::UnknownMarket(id.0))?;
        if ledger.has_claimed(holder) {
            return Err(EngineError::AlreadyClaimed {
                holder: holder.to_string(),
            });
        }

        let pool = self.pools.get(&id).ok_or(EngineError::UnknownMarket(id.0))?;
        let winning_pool = pool.side_total(outcome);
        let losing_pool = pool.side_total(outcome.flip());
        let balance = pool.balance(holder);
        // Degenerate market: nobody staked the winning side, every stake
        // is a push.
        let amount = if winning_pool == 0 {
            balance.total()
        } else {
            balance.side(outcome)
        };
        if amount == 0 {
            return Err(EngineError::NoWinningStake {
                holder: holder.to_string(),
            });
        }

        let payout = calculate_payout(amount, winning_pool, losing_pool, self.params.protocol_fee_bps)?;
        let ledger = self
            .settlements
            .get_mut(&id)
            .ok_or(EngineError::UnknownMarket(id.0))?;
        ledger.record_claim(holder, payout)?;
        self.treasury += payout.fee;
        info!(market = %id, holder, net = payout.net, fee = payout.fee, "payout claimed");
        Ok(TransferInstruction {
            to: holder.to_string(),
            amount: payout.net,
            reason: TransferReason::Payout,
        })
    }

    /// Settlement ledger for a market.
    pub fn settlement(&self, id: MarketId) -> Result<&SettlementLedger> {
        self.settlements
            .get(&id)
            .ok_or(EngineError::UnknownMarket(id.0))
    }

    // ---- AMM ----

    /// The AMM pool for a market.
    pub fn amm(&self, id: MarketId) -> Result<&AmmPool> {
        self.amms.get(&id).ok_or(EngineError::UnknownMarket(id.0))
    }

    fn amm_mut(&mut self, id: MarketId) -> Result<&mut AmmPool> {
        self.amms.get_mut(&id).ok_or(EngineError::UnknownMarket(id.0))
    }

    /// Deposit claim balances into the market's AMM pool.
    pub fn amm_add_liquidity(
        &mut self,
        id: MarketId,
        provider: &str,
        amount_yes: u64,
        amount_no: u64,
    ) -> Result<u64> {
        self.amm_mut(id)?.add_liquidity(provider, amount_yes, amount_no)
    }

    /// Burn liquidity shares for a proportional share of both reserves.
    pub fn amm_remove_liquidity(
        &mut self,
        id: MarketId,
        provider: &str,
        shares: u64,
    ) -> Result<(u64, u64)> {
        self.amm_mut(id)?.remove_liquidity(provider, shares)
    }

    /// Swap claim balances through the market's AMM pool.
    pub fn amm_swap(
        &mut self,
        id: MarketId,
        token_in: Outcome,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapOutcome> {
        self.amm_mut(id)?.swap(token_in, amount_in, min_amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOV: &str = "governance";
    const IDN: &str = "identity";
    const EXPIRY: u64 = 1_000;

    fn engine_with_market() -> (Engine, MarketId) {
        let mut engine = Engine::new(GOV, IDN);
        let id = engine
            .create_market(
                MarketParams {
                    expiry: EXPIRY,
                    min_stake: 1,
                    max_stake: 1_000,
                    category: "sports".to_string(),
                },
                0,
            )
            .unwrap();
        (engine, id)
    }

    fn verified_sources(engine: &mut Engine, n: u64) -> Vec<SourceId> {
        (0..n)
            .map(|i| {
                let id = engine
                    .register_source(IDN, &format!("oracle-{i}"), &format!("feed-{i}"))
                    .unwrap();
                engine.verify_source(IDN, id).unwrap();
                id
            })
            .collect()
    }

    fn report(engine: &mut Engine, id: MarketId, source: SourceId, vote: Outcome) {
        engine
            .submit_report(id, source, vote, 9_000, "cafe", EXPIRY + 10)
            .unwrap();
    }

    #[test]
    fn test_stake_rejected_after_expiry() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 500).unwrap();
        let err = engine.stake(id, "alice", Outcome::Yes, 100, EXPIRY).unwrap_err();
        assert!(matches!(err, EngineError::MarketClosed(_)));
    }

    #[test]
    fn test_report_rejected_before_expiry() {
        let (mut engine, id) = engine_with_market();
        let sources = verified_sources(&mut engine, 1);
        let err = engine
            .submit_report(id, sources[0], Outcome::Yes, 9_000, "cafe", EXPIRY - 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn test_full_resolution_flow() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 10).unwrap();
        engine.stake(id, "bob", Outcome::No, 300, 20).unwrap();

        let sources = verified_sources(&mut engine, 3);
        report(&mut engine, id, sources[0], Outcome::Yes);
        report(&mut engine, id, sources[1], Outcome::Yes);
        report(&mut engine, id, sources[2], Outcome::No);

        assert_eq!(engine.market(id).unwrap().state, MarketState::Resolved);
        let resolution = engine.resolution(id).unwrap();
        assert_eq!(resolution.outcome, Some(Outcome::Yes));
        assert_eq!(resolution.confidence_bps, 6_667);

        // Claim after the dispute window.
        let claim_at = EXPIRY + 10 + engine.params().dispute_period + 1;
        let transfer = engine.claim_reward(id, "alice", claim_at).unwrap();
        assert_eq!(transfer.reason, TransferReason::Payout);
        // reward 400, 2% fee
        assert_eq!(transfer.amount, 392);
        assert_eq!(engine.treasury(), 8);

        let err = engine.claim_reward(id, "alice", claim_at + 1).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimed { .. }));
        let err = engine.claim_reward(id, "bob", claim_at).unwrap_err();
        assert!(matches!(err, EngineError::NoWinningStake { .. }));
    }

    #[test]
    fn test_claim_blocked_during_window_and_pending_dispute() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 10).unwrap();
        engine.stake(id, "bob", Outcome::No, 300, 20).unwrap();
        let sources = verified_sources(&mut engine, 3);
        for s in &sources {
            report(&mut engine, id, *s, Outcome::Yes);
        }

        // inside the window
        let err = engine.claim_reward(id, "alice", EXPIRY + 11).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        engine
            .raise_dispute(id, "carol", Outcome::No, "beef", 100, EXPIRY + 20)
            .unwrap();
        let after_window = EXPIRY + 10 + engine.params().dispute_period + 1;
        let err = engine.claim_reward(id, "alice", after_window).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        // rejected dispute unblocks claims and pays the treasury
        engine.resolve_dispute(GOV, id, 0, false, after_window).unwrap();
        assert_eq!(engine.treasury(), 100);
        engine.claim_reward(id, "alice", after_window + 1).unwrap();
    }

    #[test]
    fn test_accepted_dispute_overrides_outcome() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 10).unwrap();
        engine.stake(id, "bob", Outcome::No, 300, 20).unwrap();
        let sources = verified_sources(&mut engine, 3);
        for s in &sources {
            report(&mut engine, id, *s, Outcome::Yes);
        }

        engine
            .raise_dispute(id, "carol", Outcome::No, "beef", 100, EXPIRY + 20)
            .unwrap();
        let refund = engine
            .resolve_dispute(GOV, id, 0, true, EXPIRY + 30)
            .unwrap()
            .unwrap();
        assert_eq!(refund.to, "carol");
        assert_eq!(refund.amount, 100);
        assert_eq!(refund.reason, TransferReason::DisputeBondRefund);

        let resolution = engine.resolution(id).unwrap();
        assert_eq!(resolution.outcome, Some(Outcome::No));
        assert!(resolution.overridden);

        // Bob now holds the winning side.
        let claim_at = EXPIRY + 10 + engine.params().dispute_period + 1;
        let transfer = engine.claim_reward(id, "bob", claim_at).unwrap();
        // reward 300 + 300*100/300 = 400, 2% fee
        assert_eq!(transfer.amount, 392);
    }

    #[test]
    fn test_dispute_requires_finalization_and_window() {
        let (mut engine, id) = engine_with_market();
        let err = engine
            .raise_dispute(id, "carol", Outcome::No, "beef", 100, 500)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFinalized(_)));

        let sources = verified_sources(&mut engine, 3);
        for s in &sources {
            report(&mut engine, id, *s, Outcome::Yes);
        }
        let too_late = EXPIRY + 10 + engine.params().dispute_period + 1;
        let err = engine
            .raise_dispute(id, "carol", Outcome::No, "beef", 100, too_late)
            .unwrap_err();
        assert!(matches!(err, EngineError::DisputeWindowClosed { .. }));
    }

    #[test]
    fn test_cancel_and_refund() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 10).unwrap();
        engine.stake(id, "alice", Outcome::No, 50, 11).unwrap();

        let err = engine.cancel_market("mallory", id, 20).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
        engine.cancel_market(GOV, id, 20).unwrap();

        let refund = engine.refund(id, "alice").unwrap();
        assert_eq!(refund.amount, 150);
        assert_eq!(refund.reason, TransferReason::Refund);
        let err = engine.refund(id, "alice").unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRefunded { .. }));
    }

    #[test]
    fn test_degenerate_market_push() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 10).unwrap();
        engine.stake(id, "bob", Outcome::Yes, 200, 11).unwrap();

        // Everyone staked YES but the market resolves NO.
        let sources = verified_sources(&mut engine, 3);
        for s in &sources {
            report(&mut engine, id, *s, Outcome::No);
        }

        let claim_at = EXPIRY + 10 + engine.params().dispute_period + 1;
        let a = engine.claim_reward(id, "alice", claim_at).unwrap();
        let b = engine.claim_reward(id, "bob", claim_at).unwrap();
        assert_eq!(a.amount, 100);
        assert_eq!(b.amount, 200);
        assert_eq!(engine.treasury(), 0);
        assert_eq!(engine.settlement(id).unwrap().residual(300), 0);
    }

    #[test]
    fn test_identity_gating() {
        let (mut engine, _) = engine_with_market();
        let err = engine.register_source("mallory", "oracle-x", "feed").unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
        let err = engine.update_params("mallory", GovernanceParams::default()).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
    }

    #[test]
    fn test_sub_quorum_market_stays_awaiting() {
        let (mut engine, id) = engine_with_market();
        engine.stake(id, "alice", Outcome::Yes, 100, 10).unwrap();
        let sources = verified_sources(&mut engine, 2);
        for s in &sources {
            report(&mut engine, id, *s, Outcome::Yes);
        }
        assert_eq!(
            engine.market_state(id, EXPIRY + 100).unwrap(),
            MarketState::AwaitingResolution
        );
        // stake accounting untouched by the reports
        assert_eq!(engine.stake_pool(id).unwrap().total(), 100);
    }

    #[test]
    fn test_amm_round_trip() {
        let (mut engine, id) = engine_with_market();
        engine.amm_add_liquidity(id, "lp", 1_000, 1_000).unwrap();
        let swap = engine.amm_swap(id, Outcome::Yes, 100, 0).unwrap();
        assert_eq!(swap.amount_out, 90);
        let amm = engine.amm(id).unwrap();
        assert!(amm.product() >= 1_000_000);
    }
}
