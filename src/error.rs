//! Error types for xtop-mgmt

use thiserror::Error;

/// Errors that can occur in the management facade
#[derive(Debug, Error)]
pub enum MgmtError {
    /// Remote call failed at the transport level (fault, timeout)
    #[error("Remote call '{procedure}' failed: {reason}")]
    Call {
        procedure: String,
        reason: String,
    },

    /// Response decoded, but carried no usable data
    #[error("Malformed response from '{procedure}': {reason}")]
    Malformed {
        procedure: String,
        reason: String,
    },

    /// Log enable call succeeded but the response lacked a topic field
    #[error("No log topic found in response")]
    NoTopic,

    /// Push registration on a topic failed
    #[error("Failed to subscribe to topic '{topic}': {reason}")]
    Subscribe {
        topic: String,
        reason: String,
    },

    /// Operation attempted after the facade was closed
    #[error("Management facade is closed")]
    Closed,
}

/// Result type alias for management operations
pub type Result<T> = std::result::Result<T, MgmtError>;
