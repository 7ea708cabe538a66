//! # Utility Functions
//!
//! Digest helpers for evidence references and small display conversions.

use crate::error::{EngineError, Result};
use crate::market::{MarketId, Outcome};
use crate::oracle::SourceId;
use sha2::{Digest, Sha256};

/// Hash a message using SHA256, hex-encoded.
pub fn sha256_hex(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    let hash = hasher.finalize();
    hex::encode(hash)
}

/// Canonical digest for a report, suitable as an evidence reference.
///
/// Serializes the identifying tuple as JSON before hashing so the digest
/// is stable across implementations.
pub fn report_digest(
    market: MarketId,
    source: SourceId,
    outcome: Outcome,
    submitted_at: u64,
) -> String {
    let mut hasher = Sha256::new();
    let to_serialize = (market.0, source.0, outcome.to_string(), submitted_at);
    hasher.update(
        serde_json::to_string(&to_serialize)
            .unwrap_or_default()
            .as_bytes(),
    );
    let hash = hasher.finalize();
    hex::encode(hash)
}

/// Convert basis points to a display percentage.
pub fn bps_to_percent(bps: u64) -> f64 {
    bps as f64 / 100.0
}

/// Format timestamp as human-readable string
pub fn format_timestamp(timestamp: u64) -> String {
    use chrono::DateTime;
    let dt = DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Parse timestamp from string
pub fn parse_timestamp(timestamp_str: &str) -> Result<u64> {
    timestamp_str
        .parse::<u64>()
        .map_err(|_| EngineError::InvalidAmount(format!("invalid timestamp: {timestamp_str}")))
}
