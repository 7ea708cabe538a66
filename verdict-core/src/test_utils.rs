//! Common test utilities for verdict-core tests.
//!
//! Shared builders for engines, markets and verified sources so scenario
//! tests stay short and deterministic.

use crate::engine::Engine;
use crate::market::{MarketId, MarketParams, Outcome};
use crate::oracle::SourceId;

/// Common test constants
pub mod constants {
    /// Governance authority account used in tests
    pub const TEST_GOVERNANCE: &str = "governance";

    /// Identity authority account used in tests
    pub const TEST_IDENTITY: &str = "identity";

    /// Standard market expiry (Jan 1, 2025)
    pub const TEST_EXPIRY: u64 = 1_735_689_600;

    /// Standard confidence claim submitted by test sources
    pub const TEST_CONFIDENCE_CLAIM: u64 = 9_000;

    /// Standard evidence digest placeholder
    pub const TEST_EVIDENCE: &str = "cafebabe";
}

/// Create an engine with the standard test authorities.
pub fn create_test_engine() -> Engine {
    Engine::new(constants::TEST_GOVERNANCE, constants::TEST_IDENTITY)
}

/// Create an engine plus one open market with bounds [1, 1000] expiring at
/// [`constants::TEST_EXPIRY`].
pub fn create_engine_with_market() -> (Engine, MarketId) {
    let mut engine = create_test_engine();
    let market = engine
        .create_market(
            MarketParams {
                expiry: constants::TEST_EXPIRY,
                min_stake: 1,
                max_stake: 1_000,
                category: "sports".to_string(),
            },
            0,
        )
        .expect("market creation");
    (engine, market)
}

/// Register and verify `n` sources named oracle-0..n.
pub fn register_verified_sources(engine: &mut Engine, n: u64) -> Vec<SourceId> {
    (0..n)
        .map(|i| {
            let id = engine
                .register_source(
                    constants::TEST_IDENTITY,
                    &format!("oracle-{i}"),
                    &format!("feed-{i}"),
                )
                .expect("source registration");
            engine
                .verify_source(constants::TEST_IDENTITY, id)
                .expect("source verification");
            id
        })
        .collect()
}

/// Submit one report per source, in order, shortly after expiry.
pub fn submit_reports(
    engine: &mut Engine,
    market: MarketId,
    votes: &[(SourceId, Outcome)],
) {
    for (source, outcome) in votes {
        engine
            .submit_report(
                market,
                *source,
                *outcome,
                constants::TEST_CONFIDENCE_CLAIM,
                constants::TEST_EVIDENCE,
                constants::TEST_EXPIRY + 10,
            )
            .expect("report submission");
    }
}

/// First instant at which claims are allowed for a market finalized at
/// `TEST_EXPIRY + 10`.
pub fn first_claim_instant(engine: &Engine) -> u64 {
    constants::TEST_EXPIRY + 10 + engine.params().dispute_period + 1
}
