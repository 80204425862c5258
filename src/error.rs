//! Error types for simulator communication.
//!
//! None of these are fatal: the sync loop logs them, counts them and skips
//! the affected snapshot until the next cycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The request could not complete (connection refused, timeout, …).
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The server answered with a non-success status.
    #[error("Request to {endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The body did not parse into the expected snapshot shape.
    #[error("Malformed response from {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The blocking request task panicked or was cancelled.
    #[error("Request task for {endpoint} did not complete: {message}")]
    Join { endpoint: String, message: String },
}

impl SyncError {
    pub fn transport(endpoint: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// True for payload problems, false for everything on the transport side.
    pub fn is_malformed(&self) -> bool {
        matches!(self, SyncError::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
