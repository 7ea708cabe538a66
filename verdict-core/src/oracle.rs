//! # Oracle Consensus
//!
//! Collects outcome reports from registered data sources and finalizes a
//! market outcome once a quorum of verified sources has reported. This is a
//! deliberately naive agreement scheme, not full BFT: one verified source,
//! one vote, majority wins, ties break to NO. Reputation tracks how often a
//! source agreed with the finalized outcome and only gates future trust;
//! it never weights a live tally.
//!
//! A market that never reaches quorum simply stays unfinalized; stake
//! accounting is untouched by report traffic.

use crate::error::{EngineError, Result};
use crate::market::{MarketId, Outcome};
use crate::{
    AccountId, BPS, REPUTATION_CAP, REPUTATION_FLOOR, REPUTATION_INITIAL, REPUTATION_STEP_DOWN,
    REPUTATION_STEP_UP,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Stable handle for a data source in the registry arena.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// A registered data source.
///
/// Verification comes from the external identity authority; the consensus
/// layer trusts the flag and nothing else. Reputation moves in bounded
/// steps and is owned exclusively by this module.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SourceRecord {
    /// Handle into the source arena
    pub id: SourceId,

    /// Account the source reports from
    pub account: AccountId,

    /// Operator label ("chainlink", "reuters", ...)
    pub label: String,

    /// Set by the identity authority; unverified sources cannot report
    pub verified: bool,

    /// Reports ever submitted
    pub total_reports: u64,

    /// Reports that matched the finalized outcome
    pub successful_reports: u64,

    /// Bounded trust score, `REPUTATION_FLOOR..=REPUTATION_CAP`
    pub reputation: u64,
}

impl SourceRecord {
    /// Apply one scoring step and return the signed delta actually applied
    /// (clamping at the floor/cap can make it smaller than the step).
    fn score(&mut self, correct: bool) -> i64 {
        let before = self.reputation as i64;
        if correct {
            self.successful_reports += 1;
            self.reputation = (self.reputation + REPUTATION_STEP_UP).min(REPUTATION_CAP);
        } else {
            self.reputation = self
                .reputation
                .saturating_sub(REPUTATION_STEP_DOWN)
                .max(REPUTATION_FLOOR);
        }
        self.reputation as i64 - before
    }

    /// Exactly undo a previously applied scoring step.
    fn unscore(&mut self, was_correct: bool, applied_delta: i64) {
        if was_correct {
            self.successful_reports -= 1;
        }
        self.reputation = (self.reputation as i64 - applied_delta) as u64;
    }
}

/// A single (source, outcome) vote on a market.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Report {
    /// Reporting source
    pub source: SourceId,

    /// Reported outcome
    pub outcome: Outcome,

    /// Source's self-declared confidence in basis points. A submission
    /// floor, not an input to the tally.
    pub confidence_claim_bps: u64,

    /// Hex digest of supporting evidence
    pub evidence: String,

    /// Submission timestamp
    pub submitted_at: u64,

    /// Reputation delta applied at finalization (undone on override)
    scored_delta: i64,

    /// Whether this vote was counted successful at finalization
    counted_successful: bool,
}

/// Per-market resolution record. Queryable indefinitely after finalization.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Resolution {
    /// All votes received, in submission order
    pub reports: Vec<Report>,

    /// Finalized outcome, `None` until quorum is met
    pub outcome: Option<Outcome>,

    /// Majority share of the vote in basis points, recomputed at
    /// finalization and again on override
    pub confidence_bps: u64,

    /// Timestamp finalization happened; starts the dispute clock
    pub finalized_at: Option<u64>,

    /// Whether a resolved dispute overrode the voted outcome
    pub overridden: bool,
}

impl Resolution {
    pub fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn has_reported(&self, source: SourceId) -> bool {
        self.reports.iter().any(|r| r.source == source)
    }

    /// Vote counts as (yes, no).
    pub fn tally(&self) -> (u64, u64) {
        let yes = self
            .reports
            .iter()
            .filter(|r| r.outcome == Outcome::Yes)
            .count() as u64;
        (yes, self.reports.len() as u64 - yes)
    }
}

/// Majority share of the vote in basis points, rounded to nearest.
///
/// Two of three votes read as 6667 bps, not a truncated 6666.
pub fn confidence_ratio_bps(matching: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (matching * BPS + total / 2) / total
}

/// Summary of a finalization, returned to the caller and logged.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finalization {
    pub market: MarketId,
    pub outcome: Outcome,
    pub confidence_bps: u64,
    pub finalized_at: u64,
    pub total_votes: u64,
    pub majority_votes: u64,
}

/// Report collection and finalization across all markets.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct OracleConsensus {
    sources: Vec<SourceRecord>,
    resolutions: BTreeMap<MarketId, Resolution>,
}

impl OracleConsensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new (unverified) source and return its handle.
    pub fn register_source(&mut self, account: &str, label: &str) -> SourceId {
        let id = SourceId(self.sources.len() as u64);
        self.sources.push(SourceRecord {
            id,
            account: account.to_string(),
            label: label.to_string(),
            verified: false,
            total_reports: 0,
            successful_reports: 0,
            reputation: REPUTATION_INITIAL,
        });
        id
    }

    /// Flag a source as verified. Authority gating happens in the engine.
    pub fn verify_source(&mut self, id: SourceId) -> Result<()> {
        self.source_mut(id)?.verified = true;
        Ok(())
    }

    pub fn source(&self, id: SourceId) -> Result<&SourceRecord> {
        self.sources
            .get(id.0 as usize)
            .ok_or(EngineError::UnknownSource(id.0))
    }

    fn source_mut(&mut self, id: SourceId) -> Result<&mut SourceRecord> {
        self.sources
            .get_mut(id.0 as usize)
            .ok_or(EngineError::UnknownSource(id.0))
    }

    /// Iterate all registered sources.
    pub fn sources(&self) -> impl Iterator<Item = &SourceRecord> {
        self.sources.iter()
    }

    /// The resolution record for a market, if any report has arrived.
    pub fn resolution(&self, market: MarketId) -> Option<&Resolution> {
        self.resolutions.get(&market)
    }

    /// Record a vote. Finalizes the market and returns the summary once the
    /// vote count reaches `min_sources`.
    ///
    /// Submission is idempotent-rejecting per source: a second report from
    /// the same source fails without side effects. The expiry check against
    /// the market lifecycle is done by the engine before calling in.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_report(
        &mut self,
        market: MarketId,
        source: SourceId,
        outcome: Outcome,
        confidence_claim_bps: u64,
        evidence: &str,
        now: u64,
        min_confidence_bps: u64,
        min_sources: u64,
    ) -> Result<Option<Finalization>> {
        {
            let record = self.source(source)?;
            if !record.verified {
                return Err(EngineError::UnverifiedSource(source.0));
            }
        }
        if confidence_claim_bps < min_confidence_bps {
            return Err(EngineError::ConfidenceTooLow {
                claimed: confidence_claim_bps,
                floor: min_confidence_bps,
            });
        }

        let resolution = self.resolutions.entry(market).or_default();
        if resolution.has_reported(source) {
            return Err(EngineError::AlreadyReported { market: market.0 });
        }
        if resolution.is_finalized() {
            return Err(EngineError::InvalidState(format!(
                "{market} already finalized"
            )));
        }

        resolution.reports.push(Report {
            source,
            outcome,
            confidence_claim_bps,
            evidence: evidence.to_string(),
            submitted_at: now,
            scored_delta: 0,
            counted_successful: false,
        });
        self.source_mut(source)?.total_reports += 1;

        debug!(%market, %source, vote = %outcome, "report recorded");
        self.try_finalize(market, now, min_sources)
    }

    /// Finalize the market if quorum is met and it has not finalized yet.
    ///
    /// Deterministic in the report multiset: the outcome is the majority
    /// vote with ties breaking to NO, and the confidence is the majority
    /// share of the total in basis points. Idempotent via the finalized
    /// guard.
    fn try_finalize(
        &mut self,
        market: MarketId,
        now: u64,
        min_sources: u64,
    ) -> Result<Option<Finalization>> {
        let resolution = self
            .resolutions
            .get_mut(&market)
            .ok_or(EngineError::UnknownMarket(market.0))?;
        if resolution.is_finalized() || (resolution.reports.len() as u64) < min_sources {
            return Ok(None);
        }

        let (yes, no) = resolution.tally();
        let total = yes + no;
        // Tie breaks to NO: strictly more YES votes are required to finalize YES.
        let outcome = if yes > no { Outcome::Yes } else { Outcome::No };
        let majority = match outcome {
            Outcome::Yes => yes,
            Outcome::No => no,
        };
        let confidence_bps = confidence_ratio_bps(majority, total);

        resolution.outcome = Some(outcome);
        resolution.confidence_bps = confidence_bps;
        resolution.finalized_at = Some(now);

        // Score every voter against the finalized outcome, remembering the
        // applied delta so an override can unwind it exactly.
        let mut scored = Vec::with_capacity(resolution.reports.len());
        for (idx, report) in resolution.reports.iter().enumerate() {
            scored.push((idx, report.source, report.outcome == outcome));
        }
        for (idx, source, correct) in scored {
            let delta = self.source_mut(source)?.score(correct);
            let report = &mut self
                .resolutions
                .get_mut(&market)
                .expect("resolution exists")
                .reports[idx];
            report.scored_delta = delta;
            report.counted_successful = correct;
        }

        info!(
            %market,
            outcome = %outcome,
            confidence_bps,
            total_votes = total,
            finalized_at = now,
            "market finalized"
        );

        Ok(Some(Finalization {
            market,
            outcome,
            confidence_bps,
            finalized_at: now,
            total_votes: total,
            majority_votes: majority,
        }))
    }

    /// Overwrite a finalized outcome after an accepted dispute.
    ///
    /// This is an override, not a re-vote: reports are untouched, the
    /// original scoring steps are unwound exactly, every voter is rescored
    /// against the corrected outcome, and the confidence becomes the share
    /// of votes that agree with it. The dispute clock is not restarted.
    pub fn override_outcome(&mut self, market: MarketId, corrected: Outcome) -> Result<()> {
        let resolution = self
            .resolutions
            .get_mut(&market)
            .ok_or(EngineError::UnknownMarket(market.0))?;
        let previous = resolution
            .outcome
            .ok_or_else(|| EngineError::NotFinalized(format!("{market}")))?;

        resolution.overridden = true;
        if previous == corrected {
            return Ok(());
        }
        resolution.outcome = Some(corrected);

        let (yes, no) = resolution.tally();
        let matching = match corrected {
            Outcome::Yes => yes,
            Outcome::No => no,
        };
        resolution.confidence_bps = confidence_ratio_bps(matching, yes + no);

        let rescore: Vec<(usize, SourceId, bool, i64, bool)> = resolution
            .reports
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                (
                    idx,
                    r.source,
                    r.counted_successful,
                    r.scored_delta,
                    r.outcome == corrected,
                )
            })
            .collect();
        for (idx, source, was_correct, old_delta, now_correct) in rescore {
            let record = self.source_mut(source)?;
            record.unscore(was_correct, old_delta);
            let delta = record.score(now_correct);
            let report = &mut self
                .resolutions
                .get_mut(&market)
                .expect("resolution exists")
                .reports[idx];
            report.scored_delta = delta;
            report.counted_successful = now_correct;
        }

        info!(%market, outcome = %corrected, "finalized outcome overridden");
        Ok(())
    }
}
