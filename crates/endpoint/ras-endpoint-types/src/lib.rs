//! Core types for sending messages over a bidirectional endpoint
//!
//! This crate provides the vocabulary shared by the handshake model and the
//! send completion bridge: connection identity, message kinds and their
//! payloads, the synchronous send primitives an endpoint exposes, and the
//! error and configuration types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod kind;
pub mod sender;

pub use config::EndpointConfig;
pub use error::{EndpointError, SendError};
pub use kind::{AnyKind, Binary, MessageKind, Object, Text};
pub use sender::{NoOpRemoteEndpoint, RemoteEndpoint, SyncCompleter, SyncCompletion};

/// Unique identifier for an endpoint connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a connection ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime tag of a message kind, used for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKindTag {
    Text,
    Binary,
    Object,
    /// Bridge accepting any [`OutboundMessage`]
    Any,
}

impl fmt::Display for MessageKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKindTag::Text => write!(f, "text"),
            MessageKindTag::Binary => write!(f, "binary"),
            MessageKindTag::Object => write!(f, "object"),
            MessageKindTag::Any => write!(f, "any"),
        }
    }
}

/// A message with its payload, one variant per send primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Text payload, sent as a text frame
    Text(String),
    /// Binary payload, sent as a binary frame
    Binary(Bytes),
    /// Structured payload, encoded by the endpoint's object primitive
    Object(serde_json::Value),
}

impl OutboundMessage {
    /// The tag of the primitive this message is routed to
    pub fn kind(&self) -> MessageKindTag {
        match self {
            OutboundMessage::Text(_) => MessageKindTag::Text,
            OutboundMessage::Binary(_) => MessageKindTag::Binary,
            OutboundMessage::Object(_) => MessageKindTag::Object,
        }
    }

    /// Payload size in bytes; objects are measured by their JSON encoding
    pub fn encoded_len(&self) -> std::result::Result<usize, serde_json::Error> {
        match self {
            OutboundMessage::Text(text) => Ok(text.len()),
            OutboundMessage::Binary(data) => Ok(data.len()),
            OutboundMessage::Object(value) => Ok(serde_json::to_vec(value)?.len()),
        }
    }
}

impl From<String> for OutboundMessage {
    fn from(text: String) -> Self {
        OutboundMessage::Text(text)
    }
}

impl From<&str> for OutboundMessage {
    fn from(text: &str) -> Self {
        OutboundMessage::Text(text.to_string())
    }
}

impl From<Bytes> for OutboundMessage {
    fn from(data: Bytes) -> Self {
        OutboundMessage::Binary(data)
    }
}

impl From<Vec<u8>> for OutboundMessage {
    fn from(data: Vec<u8>) -> Self {
        OutboundMessage::Binary(Bytes::from(data))
    }
}

impl From<serde_json::Value> for OutboundMessage {
    fn from(value: serde_json::Value) -> Self {
        OutboundMessage::Object(value)
    }
}

/// Outcome of a single send: success, or failure with its cause
pub type SendResult = std::result::Result<(), SendError>;

/// Result type for endpoint operations
pub type Result<T> = std::result::Result<T, EndpointError>;
