//! # Verdict Core
//!
//! Deterministic resolution and settlement engine for binary prediction markets.
//!
//! This library provides the ledger-neutral state-transition logic for
//! markets where:
//! - Stakes accumulate per position (YES/NO) while a market is open
//! - Verified data sources report the outcome after expiry
//! - A majority quorum finalizes the outcome with a confidence score
//! - Winners split the losing pool pari-mutuel style, minus a protocol fee
//! - Finalized outcomes can be disputed (and overridden) inside a window
//! - An optional constant-product AMM trades the two claim balances
//!
//! ## Features
//!
//! - **Exact arithmetic**: integer-only value math, u128 intermediates,
//!   rounding that always favors the protocol over the holder
//! - **Byzantine-tolerant-ish consensus**: one verified source, one vote,
//!   majority wins, ties break to NO; reputation gates future trust only
//! - **Replayability**: no clocks, no randomness; every operation takes
//!   `now` explicitly and is a pure function of state and arguments
//! - **Checks-effects-interactions**: claim flags are set before transfer
//!   instructions are handed to the external value layer
//!
//! ## Examples
//!
//! ```rust
//! use verdict_core::{Engine, MarketParams, Outcome};
//!
//! let mut engine = Engine::new("governance", "identity");
//!
//! // Register a market closing at t=1000
//! let market = engine.create_market(
//!     MarketParams {
//!         expiry: 1000,
//!         min_stake: 1,
//!         max_stake: 1000,
//!         category: "sports".to_string(),
//!     },
//!     0,
//! )?;
//!
//! // Stake while the market is open
//! engine.stake(market, "alice", Outcome::Yes, 100, 10)?;
//! engine.stake(market, "bob", Outcome::No, 300, 20)?;
//! Ok::<(), verdict_core::EngineError>(())
//! ```

pub mod amm;
pub mod dispute;
pub mod engine;
pub mod error;
pub mod market;
pub mod oracle;
pub mod settlement;
pub mod stake;
pub mod test_utils;
pub mod utils;

pub use amm::{isqrt, AmmPool, SwapOutcome};
pub use dispute::{Dispute, DisputeBook, DisputeStatus};
pub use engine::{Engine, GovernanceParams, TransferInstruction, TransferReason};
pub use error::{EngineError, ErrorKind, Result};
pub use market::{Market, MarketId, MarketParams, MarketRegistry, MarketState, Outcome};
pub use oracle::{
    confidence_ratio_bps, Finalization, OracleConsensus, Report, Resolution, SourceId,
    SourceRecord,
};
pub use settlement::{calculate_payout, Payout, SettlementLedger};
pub use stake::{PositionBalance, StakePool};

/// Opaque ledger account address.
pub type AccountId = String;

/// Basis-point denominator used for every fixed-point ratio.
pub const BPS: u64 = 10_000;

/// Default quorum of distinct verified sources.
pub const DEFAULT_MIN_SOURCES: u64 = 3;

/// Default floor on a source's self-declared confidence (80%).
pub const DEFAULT_MIN_CONFIDENCE_BPS: u64 = 8_000;

/// Default dispute window after finalization (1 day).
pub const DEFAULT_DISPUTE_PERIOD: u64 = 86_400;

/// Default protocol fee on settlement rewards (2%).
pub const DEFAULT_PROTOCOL_FEE_BPS: u64 = 200;

/// Default minimum bond to raise a dispute.
pub const DEFAULT_MIN_DISPUTE_BOND: u64 = 100;

/// Default AMM swap fee (30 bps).
pub const DEFAULT_SWAP_FEE_BPS: u64 = 30;

/// Reputation a source starts with.
pub const REPUTATION_INITIAL: u64 = 5_000;

/// Upper bound on reputation.
pub const REPUTATION_CAP: u64 = 10_000;

/// Lower bound on reputation.
pub const REPUTATION_FLOOR: u64 = 0;

/// Reputation gained for matching the finalized outcome.
pub const REPUTATION_STEP_UP: u64 = 250;

/// Reputation lost for contradicting the finalized outcome.
pub const REPUTATION_STEP_DOWN: u64 = 500;
