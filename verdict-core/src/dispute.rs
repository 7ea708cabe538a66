//! # Dispute Records
//!
//! A finalized outcome can be challenged inside the dispute window by
//! posting a bond. Governance judges each dispute: accepting one overrides
//! the finalized outcome and refunds the bond, rejecting one forfeits the
//! bond to the protocol treasury. Dispute history stays queryable forever.
//!
//! This module owns only the records and their one-shot transitions; the
//! window arithmetic inputs, bond custody and the actual outcome override
//! are wired together by the engine.

use crate::error::{EngineError, Result};
use crate::market::{MarketId, Outcome};
use crate::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Lifecycle of a single dispute.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisputeStatus {
    /// Raised, awaiting governance judgement
    Pending,
    /// Judged valid; the outcome was overridden and the bond refunded
    Accepted,
    /// Judged invalid; the bond forfeited to the treasury
    Rejected,
}

/// A challenge against a finalized outcome.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Dispute {
    /// Account that raised the dispute
    pub challenger: AccountId,

    /// Outcome the challenger claims is correct
    pub proposed: Outcome,

    /// Hex digest of supporting evidence
    pub evidence: String,

    /// Economic stake posted with the dispute
    pub bond: u64,

    /// Timestamp the dispute was raised
    pub raised_at: u64,

    /// Current judgement state
    pub status: DisputeStatus,

    /// Timestamp of the governance judgement, if any
    pub resolved_at: Option<u64>,
}

impl Dispute {
    pub fn is_pending(&self) -> bool {
        self.status == DisputeStatus::Pending
    }
}

/// All disputes, grouped per market in raise order.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DisputeBook {
    disputes: BTreeMap<MarketId, Vec<Dispute>>,
}

impl DisputeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispute history for a market, in raise order.
    pub fn disputes(&self, market: MarketId) -> &[Dispute] {
        self.disputes.get(&market).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any dispute on the market still awaits judgement.
    pub fn has_pending(&self, market: MarketId) -> bool {
        self.disputes(market).iter().any(Dispute::is_pending)
    }

    /// Append a dispute and return its index within the market.
    ///
    /// `deadline` is `finalized_at + dispute_period`, computed by the
    /// engine from the resolution record. One dispute per challenger per
    /// market: the flag is checked-and-set in the same call, so a
    /// concurrent double-invocation cannot slip through.
    pub fn raise(
        &mut self,
        market: MarketId,
        challenger: &str,
        proposed: Outcome,
        evidence: &str,
        bond: u64,
        min_bond: u64,
        now: u64,
        deadline: u64,
    ) -> Result<u64> {
        if now > deadline {
            return Err(EngineError::DisputeWindowClosed { deadline, now });
        }
        if bond < min_bond {
            return Err(EngineError::DisputeBondTooLow {
                bond,
                minimum: min_bond,
            });
        }
        let entries = self.disputes.entry(market).or_default();
        if entries.iter().any(|d| d.challenger == challenger) {
            return Err(EngineError::AlreadyDisputed {
                challenger: challenger.to_string(),
            });
        }

        entries.push(Dispute {
            challenger: challenger.to_string(),
            proposed,
            evidence: evidence.to_string(),
            bond,
            raised_at: now,
            status: DisputeStatus::Pending,
            resolved_at: None,
        });
        let index = entries.len() as u64 - 1;
        info!(%market, challenger, proposed = %proposed, bond, "dispute raised");
        Ok(index)
    }

    /// Judge a pending dispute, returning a copy of the settled record.
    ///
    /// One-shot: a dispute leaves `Pending` exactly once. Bond movement and
    /// the outcome override are the engine's responsibility.
    pub fn judge(
        &mut self,
        market: MarketId,
        index: u64,
        accept: bool,
        now: u64,
    ) -> Result<Dispute> {
        let entries = self
            .disputes
            .get_mut(&market)
            .ok_or(EngineError::UnknownDispute(index))?;
        let dispute = entries
            .get_mut(index as usize)
            .ok_or(EngineError::UnknownDispute(index))?;
        if !dispute.is_pending() {
            return Err(EngineError::DisputeAlreadyResolved(index));
        }
        dispute.status = if accept {
            DisputeStatus::Accepted
        } else {
            DisputeStatus::Rejected
        };
        dispute.resolved_at = Some(now);
        info!(%market, index, accept, "dispute judged");
        Ok(dispute.clone())
    }
}
