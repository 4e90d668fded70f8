//! Engine error types
//!
//! Only configuration problems are errors. Data-quality anomalies (stale
//! frames, duplicate points, center noise) are absorbed by the session and
//! reported through [`IngestStats`](crate::session::IngestStats) instead.

use thiserror::Error;

/// Errors returned synchronously to the caller configuring a session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A scale, radius or trail setting is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
