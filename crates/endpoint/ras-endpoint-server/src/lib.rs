//! Asynchronous sends for bidirectional endpoints
//!
//! This crate turns the blocking send primitives of a [`RemoteEndpoint`] into
//! non-blocking sends with completion callbacks:
//!
//! - [`SendCompletionBridge`] runs each send on a [`WorkerPool`] and finalizes
//!   it exactly once (handler, then future, then idle-timeout restart)
//! - [`AsyncRemoteEndpoint`] exposes one send method per message kind
//! - [`ChannelRemoteEndpoint`] and [`WebSocketWriter`] connect the primitives
//!   to a WebSocket sink
//! - [`EndpointSession`] wires all of the above for a negotiated
//!   [`HandshakeRequest`](ras_handshake::HandshakeRequest)
//!
//! # Example
//!
//! ```rust,no_run
//! use ras_endpoint_server::{EndpointSession, TokioWorkerPool, send_handler};
//! use ras_endpoint_types::EndpointConfig;
//! use ras_handshake::HandshakeRequest;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let request = HandshakeRequest::builder().request_path("/chat").build();
//! let pool = Arc::new(TokioWorkerPool::current()?);
//! let (session, frames) = EndpointSession::open(request, &EndpointConfig::default(), pool)?;
//!
//! # let (sink, _written) =
//! #     futures::channel::mpsc::unbounded::<tokio_tungstenite::tungstenite::Message>();
//! tokio::spawn(session.writer(frames, sink).run());
//!
//! session
//!     .sender()
//!     .send_text("hello", send_handler(|result| println!("sent: {:?}", result)))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod connection;
pub mod facade;
pub mod future;
pub mod idle;
pub mod pool;
pub mod session;
pub mod writer;

pub use bridge::{AnyBridge, BinaryBridge, ObjectBridge, SendCompletionBridge, TextBridge};
pub use connection::{ChannelRemoteEndpoint, OutboundFrame};
pub use facade::AsyncRemoteEndpoint;
pub use future::{SendFuture, SendHandler, send_handler};
pub use idle::IdleTimer;
pub use pool::{Task, TokioWorkerPool, WorkerPool};
pub use session::EndpointSession;
pub use writer::{WebSocketWriter, to_ws_message};

// Re-export types for convenience
pub use ras_endpoint_types::{
    AnyKind, Binary, ConnectionId, EndpointConfig, EndpointError, MessageKind, MessageKindTag,
    Object, OutboundMessage, RemoteEndpoint, SendError, SendResult, SyncCompletion, Text,
};
