//! Error types for endpoint send operations

use thiserror::Error;

/// Why a single send did not complete successfully.
///
/// Values are cloned into both the completion handler and the send future,
/// so causes are carried as text rather than as boxed source errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The connection was closed before the message was written
    #[error("Connection closed")]
    ConnectionClosed,

    /// The transport failed to write the message
    #[error("Transport error: {0}")]
    Transport(String),

    /// The payload could not be encoded or exceeds the configured size
    #[error("Encoding error: {0}")]
    Encode(String),

    /// The completion handle was dropped without reporting a result
    #[error("Send completion was dropped before reporting a result")]
    Canceled,

    /// The worker pool refused the send task
    #[error("Worker pool rejected the send task")]
    Rejected,

    /// The send primitive panicked on the worker
    #[error("Send primitive panicked: {0}")]
    Panicked(String),
}

impl SendError {
    /// Create a transport error
    pub fn transport<E: std::fmt::Display>(error: E) -> Self {
        Self::Transport(error.to_string())
    }

    /// Create an encoding error
    pub fn encode<E: std::fmt::Display>(error: E) -> Self {
        Self::Encode(error.to_string())
    }
}

/// Errors that can occur while configuring or driving an endpoint
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
