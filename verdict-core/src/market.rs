//! # Market Records and Lifecycle
//!
//! Markets are created by the external registry collaborator and live in an
//! append-only arena; a [`MarketId`] is a stable index into that arena and
//! never a raw reference. The engine only stores what settlement needs:
//! expiry, stake bounds and lifecycle state. Titles, descriptions and other
//! human-readable metadata stay with the external registry.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Stable handle for a market in the registry arena.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketId(pub u64);

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "market#{}", self.0)
    }
}

/// Binary market position.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// The opposite position.
    pub fn flip(self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

/// Market lifecycle state.
///
/// `Open -> AwaitingResolution` happens implicitly at expiry and is always
/// evaluated against the caller-supplied clock; the stored state is synced
/// lazily. `Resolved` and `Cancelled` are terminal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketState {
    /// Accepting stakes
    Open,
    /// Past expiry, collecting oracle reports
    AwaitingResolution,
    /// Outcome finalized, payouts claimable
    Resolved,
    /// Emergency-cancelled, stakes refundable
    Cancelled,
}

impl std::fmt::Display for MarketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketState::Open => "open",
            MarketState::AwaitingResolution => "awaiting-resolution",
            MarketState::Resolved => "resolved",
            MarketState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Parameters supplied by the external market registry at creation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MarketParams {
    /// Expiry timestamp (Unix seconds); staking stops strictly before this
    pub expiry: u64,
    /// Minimum accumulated stake per (holder, position)
    pub min_stake: u64,
    /// Maximum accumulated stake per (holder, position)
    pub max_stake: u64,
    /// Opaque category tag from the registry
    pub category: String,
}

/// A registered binary prediction market.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Market {
    /// Handle into the registry arena
    pub id: MarketId,

    /// Expiry timestamp (Unix seconds)
    pub expiry: u64,

    /// Minimum accumulated stake per (holder, position)
    pub min_stake: u64,

    /// Maximum accumulated stake per (holder, position)
    pub max_stake: u64,

    /// Opaque category tag from the registry
    pub category: String,

    /// Stored lifecycle state (synced lazily against the clock)
    pub state: MarketState,

    /// Timestamp the market was created
    pub created_at: u64,

    /// Timestamp the market resolved or was cancelled, if terminal
    pub closed_at: Option<u64>,
}

impl Market {
    /// Effective lifecycle state at `now`.
    ///
    /// An `Open` market past its expiry reads as `AwaitingResolution` even
    /// if no operation has synced the stored state yet.
    pub fn state_at(&self, now: u64) -> MarketState {
        match self.state {
            MarketState::Open if now >= self.expiry => MarketState::AwaitingResolution,
            other => other,
        }
    }

    /// Whether the market accepts new stakes at `now`.
    pub fn is_open(&self, now: u64) -> bool {
        self.state_at(now) == MarketState::Open
    }

    /// Whether the market is past expiry and may collect oracle reports.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry
    }

    /// Mark the market resolved. Terminal states are never overwritten.
    pub(crate) fn mark_resolved(&mut self, now: u64) {
        if matches!(self.state, MarketState::Resolved | MarketState::Cancelled) {
            return;
        }
        self.state = MarketState::Resolved;
        self.closed_at = Some(now);
    }

    /// Mark the market cancelled.
    pub(crate) fn mark_cancelled(&mut self, now: u64) {
        self.state = MarketState::Cancelled;
        self.closed_at = Some(now);
    }
}

/// Append-only arena of markets.
///
/// Handles are indices; entries are never removed, so a `MarketId` handed
/// out once stays valid for the lifetime of the engine.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MarketRegistry {
    markets: Vec<Market>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new market and return its handle.
    ///
    /// Rejects inverted stake bounds, a zero minimum and an expiry that is
    /// not in the future.
    pub fn create(&mut self, params: MarketParams, now: u64) -> Result<MarketId> {
        if params.min_stake == 0 {
            return Err(EngineError::InvalidAmount(
                "min stake must be positive".to_string(),
            ));
        }
        if params.min_stake > params.max_stake {
            return Err(EngineError::StakeOutOfBounds(format!(
                "min stake {} exceeds max stake {}",
                params.min_stake, params.max_stake
            )));
        }
        if params.expiry <= now {
            return Err(EngineError::InvalidState(format!(
                "expiry {} not in the future (now {})",
                params.expiry, now
            )));
        }

        let id = MarketId(self.markets.len() as u64);
        self.markets.push(Market {
            id,
            expiry: params.expiry,
            min_stake: params.min_stake,
            max_stake: params.max_stake,
            category: params.category,
            state: MarketState::Open,
            created_at: now,
            closed_at: None,
        });
        Ok(id)
    }

    pub fn get(&self, id: MarketId) -> Result<&Market> {
        self.markets
            .get(id.0 as usize)
            .ok_or(EngineError::UnknownMarket(id.0))
    }

    pub fn get_mut(&mut self, id: MarketId) -> Result<&mut Market> {
        self.markets
            .get_mut(id.0 as usize)
            .ok_or(EngineError::UnknownMarket(id.0))
    }

    /// Number of markets ever registered.
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Iterate all markets in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter()
    }
}
