//! Error types for agent-session

use thiserror::Error;

/// Errors that can occur while driving agent sessions
#[derive(Debug, Error)]
pub enum SessionError {
    /// The host bridge rejected or failed to deliver a command
    #[error("Transport error: {0}")]
    Transport(String),

    /// The host bridge is gone (receiver dropped)
    #[error("Transport channel closed")]
    ChannelClosed,

    /// Malformed or unknown message on the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A lifecycle reply did not arrive in time
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
