//! Error types for verdict-core

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Coarse error classification.
///
/// Every [`EngineError`] maps to exactly one kind; callers that only care
/// about retry/abort semantics can match on the kind instead of the
/// individual variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input bounds, rejected before any mutation
    Validation,
    /// Operation invalid for the current lifecycle state
    State,
    /// Double report / double claim / double refund
    Idempotency,
    /// Would break a value-conservation invariant
    Insolvency,
    /// Unknown market, source or dispute handle
    NotFound,
    /// Caller is not the configured authority
    Unauthorized,
}

/// Error types for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Market is not accepting stakes (expired, resolved or cancelled)
    #[error("market closed: {0}")]
    MarketClosed(String),

    /// Accumulated stake would fall outside the market's configured bounds
    #[error("stake out of bounds: {0}")]
    StakeOutOfBounds(String),

    /// Zero or otherwise malformed amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Market lifecycle state does not permit the operation
    #[error("invalid market state: {0}")]
    InvalidState(String),

    /// Market has not reached a finalized outcome yet
    #[error("market not finalized: {0}")]
    NotFinalized(String),

    /// Source has already reported on this market
    #[error("source already reported on market {market}")]
    AlreadyReported { market: u64 },

    /// Holder has already claimed their payout
    #[error("holder {holder} already claimed")]
    AlreadyClaimed { holder: String },

    /// Holder has already been refunded
    #[error("holder {holder} already refunded")]
    AlreadyRefunded { holder: String },

    /// Holder holds no balance on the winning side
    #[error("no winning stake for holder {holder}")]
    NoWinningStake { holder: String },

    /// Holder holds no balance at all
    #[error("nothing to refund for holder {holder}")]
    NothingToRefund { holder: String },

    /// Source is not verified by the identity authority
    #[error("source {0} is not verified")]
    UnverifiedSource(u64),

    /// Self-declared confidence is below the configured floor
    #[error("confidence claim {claimed} bps below floor {floor} bps")]
    ConfidenceTooLow { claimed: u64, floor: u64 },

    /// Dispute window has elapsed
    #[error("dispute window closed at {deadline}, now {now}")]
    DisputeWindowClosed { deadline: u64, now: u64 },

    /// Dispute bond is below the configured minimum
    #[error("dispute bond {bond} below minimum {minimum}")]
    DisputeBondTooLow { bond: u64, minimum: u64 },

    /// Challenger already has a dispute open on this market
    #[error("challenger {challenger} already disputed")]
    AlreadyDisputed { challenger: String },

    /// Dispute has already been accepted or rejected
    #[error("dispute {0} already resolved")]
    DisputeAlreadyResolved(u64),

    /// A payout has been claimed; the outcome can no longer be overridden
    #[error("claims already started on market {0}")]
    ClaimsStarted(u64),

    /// Swap output would not satisfy the caller's minimum
    #[error("slippage exceeded: amount out {amount_out} below minimum {minimum}")]
    SlippageExceeded { amount_out: u64, minimum: u64 },

    /// Operation would drain or imbalance pooled reserves
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    /// Burning the last liquidity shares would strand reserves
    #[error("residual dust: {0}")]
    ResidualDust(String),

    /// Constant-product invariant would decrease
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Arithmetic overflow in a value computation
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// Unknown market handle
    #[error("unknown market: {0}")]
    UnknownMarket(u64),

    /// Unknown source handle
    #[error("unknown source: {0}")]
    UnknownSource(u64),

    /// Unknown dispute handle
    #[error("unknown dispute: {0}")]
    UnknownDispute(u64),

    /// Caller is not the configured governance or identity authority
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Serde JSON errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Classify this error per the engine's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;
        match self {
            StakeOutOfBounds(_) | InvalidAmount(_) | ConfidenceTooLow { .. }
            | DisputeBondTooLow { .. } | SlippageExceeded { .. } | Json(_) => ErrorKind::Validation,
            MarketClosed(_) | InvalidState(_) | NotFinalized(_) | DisputeWindowClosed { .. }
            | ClaimsStarted(_) | NoWinningStake { .. } | NothingToRefund { .. }
            | UnverifiedSource(_) => ErrorKind::State,
            AlreadyReported { .. } | AlreadyClaimed { .. } | AlreadyRefunded { .. }
            | AlreadyDisputed { .. } | DisputeAlreadyResolved(_) => ErrorKind::Idempotency,
            InsufficientLiquidity(_) | ResidualDust(_) | InvariantViolation(_) | Overflow(_) => {
                ErrorKind::Insolvency
            }
            UnknownMarket(_) | UnknownSource(_) | UnknownDispute(_) => ErrorKind::NotFound,
            Unauthorized(_) => ErrorKind::Unauthorized,
        }
    }
}
