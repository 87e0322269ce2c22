//! Typed errors for the perception → decision → guidance pipeline.
//!
//! `InvalidPacket`/`StalePacket`/`InvalidState` are recovered locally by the
//! pipeline (packet dropped, counter incremented); they are exposed here so
//! callers can inspect *why* a packet was dropped, not so they propagate.

use thiserror::Error;

use cane_contracts::{ContractError, SpeechError, TransportError};

#[derive(Debug, Clone, Error)]
pub enum GuidanceError {
    #[error("invalid packet: {0}")]
    InvalidPacket(#[from] ContractError),

    #[error("packet is stale: age {age_ms}ms exceeds the {max_age_ms}ms validation window")]
    StalePacket { age_ms: i64, max_age_ms: i64 },

    #[error("invalid decision state: {reason}")]
    InvalidState { reason: String },

    #[error("no rule matched the snapshot (unreachable under the ClearPath fallback)")]
    NoValidRule,

    #[error("transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("speech error: {0}")]
    SpeechError(#[from] SpeechError),

    #[error("navigation error: {0}")]
    NavigationError(String),
}
