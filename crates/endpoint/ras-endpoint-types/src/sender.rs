//! Synchronous send primitives of a remote endpoint

use crate::{ConnectionId, SendError, SendResult};
use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::trace;

/// The per-connection remote endpoint the send bridge drives.
///
/// Each primitive hands a payload to the transport and returns a blocking
/// [`SyncCompletion`] that resolves once the transport has written (or failed
/// to write) the message. A primitive may also fail outright, before any
/// completion exists.
pub trait RemoteEndpoint: Send + Sync {
    /// Get the connection ID
    fn connection_id(&self) -> ConnectionId;

    /// Send a text message
    fn send_sync_text(&self, text: String) -> Result<SyncCompletion, SendError>;

    /// Send a binary message
    fn send_sync_binary(&self, data: Bytes) -> Result<SyncCompletion, SendError>;

    /// Send a structured message through the endpoint's object encoder
    fn send_sync_object(&self, value: serde_json::Value) -> Result<SyncCompletion, SendError>;

    /// Record activity on the connection.
    ///
    /// Called from worker threads after every finished send; must be safe to
    /// call concurrently and repeatedly.
    fn restart_idle_timeout(&self);
}

/// Blocking completion handle returned by the send primitives.
#[derive(Debug)]
pub struct SyncCompletion {
    state: CompletionState,
}

#[derive(Debug)]
enum CompletionState {
    Ready(SendResult),
    Pending(oneshot::Receiver<SendResult>),
}

impl SyncCompletion {
    /// Create a pending completion and the completer that resolves it
    pub fn channel() -> (SyncCompleter, SyncCompletion) {
        let (tx, rx) = oneshot::channel();
        (
            SyncCompleter { tx },
            SyncCompletion {
                state: CompletionState::Pending(rx),
            },
        )
    }

    /// A completion that is already resolved
    pub fn ready(result: SendResult) -> Self {
        Self {
            state: CompletionState::Ready(result),
        }
    }

    /// Block the current thread until the send has finished.
    ///
    /// A completer dropped without reporting yields [`SendError::Canceled`].
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous execution context;
    /// call it from a blocking worker thread.
    pub fn wait(self) -> SendResult {
        match self.state {
            CompletionState::Ready(result) => result,
            CompletionState::Pending(rx) => rx.blocking_recv().unwrap_or(Err(SendError::Canceled)),
        }
    }

    /// Await the send from asynchronous code
    pub async fn completed(self) -> SendResult {
        match self.state {
            CompletionState::Ready(result) => result,
            CompletionState::Pending(rx) => rx.await.unwrap_or(Err(SendError::Canceled)),
        }
    }
}

/// Resolves a pending [`SyncCompletion`]
#[derive(Debug)]
pub struct SyncCompleter {
    tx: oneshot::Sender<SendResult>,
}

impl SyncCompleter {
    /// Report the outcome of the send. Ignored if nobody is waiting anymore.
    pub fn complete(self, result: SendResult) {
        if self.tx.send(result).is_err() {
            trace!("Send completion dropped before the result was reported");
        }
    }

    /// Whether the waiting side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A remote endpoint that accepts every message and writes nothing
pub struct NoOpRemoteEndpoint {
    connection_id: ConnectionId,
}

impl NoOpRemoteEndpoint {
    /// Create a new no-op endpoint
    pub fn new() -> Self {
        Self {
            connection_id: ConnectionId::new(),
        }
    }

    /// Create a new no-op endpoint with a specific connection ID
    pub fn with_connection_id(connection_id: ConnectionId) -> Self {
        Self { connection_id }
    }
}

impl Default for NoOpRemoteEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteEndpoint for NoOpRemoteEndpoint {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn send_sync_text(&self, _text: String) -> Result<SyncCompletion, SendError> {
        Ok(SyncCompletion::ready(Ok(())))
    }

    fn send_sync_binary(&self, _data: Bytes) -> Result<SyncCompletion, SendError> {
        Ok(SyncCompletion::ready(Ok(())))
    }

    fn send_sync_object(&self, _value: serde_json::Value) -> Result<SyncCompletion, SendError> {
        Ok(SyncCompletion::ready(Ok(())))
    }

    fn restart_idle_timeout(&self) {}
}
