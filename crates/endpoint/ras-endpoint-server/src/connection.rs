//! Channel-backed remote endpoint for a single connection

use crate::IdleTimer;
use bytes::Bytes;
use ras_endpoint_types::{
    ConnectionId, EndpointConfig, OutboundMessage, RemoteEndpoint, SendError, SyncCompleter,
    SyncCompletion,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A message queued for the connection writer, with the completer the
/// writer resolves once the transport has taken it.
#[derive(Debug)]
pub struct OutboundFrame {
    pub connection_id: ConnectionId,
    pub message: OutboundMessage,
    completer: SyncCompleter,
}

impl OutboundFrame {
    /// Report the write outcome back to the sender
    pub fn complete(self, result: ras_endpoint_types::SendResult) {
        self.completer.complete(result);
    }

    pub fn into_parts(self) -> (OutboundMessage, SyncCompleter) {
        (self.message, self.completer)
    }
}

/// Remote endpoint that queues messages onto a channel drained by the
/// connection's writer task.
#[derive(Debug, Clone)]
pub struct ChannelRemoteEndpoint {
    connection_id: ConnectionId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
    idle_timer: Arc<IdleTimer>,
    max_text_message_size: Option<usize>,
    max_binary_message_size: Option<usize>,
}

impl ChannelRemoteEndpoint {
    /// Create an endpoint and the receiving end its writer drains
    pub fn new(
        connection_id: ConnectionId,
        config: &EndpointConfig,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let endpoint = Self {
            connection_id,
            sender,
            idle_timer: Arc::new(IdleTimer::from_config(config)),
            max_text_message_size: config.max_text_message_size,
            max_binary_message_size: config.max_binary_message_size,
        };
        (endpoint, receiver)
    }

    pub fn idle_timer(&self) -> &Arc<IdleTimer> {
        &self.idle_timer
    }

    /// Whether the writer is still draining the channel
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    fn check_size(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let limit = match message {
            OutboundMessage::Binary(_) => self.max_binary_message_size,
            OutboundMessage::Text(_) | OutboundMessage::Object(_) => self.max_text_message_size,
        };

        if let Some(limit) = limit {
            let size = message.encoded_len().map_err(SendError::encode)?;
            if size > limit {
                return Err(SendError::Encode(format!(
                    "{} message of {} bytes exceeds the limit of {} bytes",
                    message.kind(),
                    size,
                    limit
                )));
            }
        }
        Ok(())
    }

    fn enqueue(&self, message: OutboundMessage) -> Result<SyncCompletion, SendError> {
        self.check_size(&message)?;

        let (completer, completion) = SyncCompletion::channel();
        self.sender
            .send(OutboundFrame {
                connection_id: self.connection_id,
                message,
                completer,
            })
            .map_err(|_| SendError::ConnectionClosed)?;

        Ok(completion)
    }
}

impl RemoteEndpoint for ChannelRemoteEndpoint {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn send_sync_text(&self, text: String) -> Result<SyncCompletion, SendError> {
        self.enqueue(OutboundMessage::Text(text))
    }

    fn send_sync_binary(&self, data: Bytes) -> Result<SyncCompletion, SendError> {
        self.enqueue(OutboundMessage::Binary(data))
    }

    fn send_sync_object(&self, value: serde_json::Value) -> Result<SyncCompletion, SendError> {
        self.enqueue(OutboundMessage::Object(value))
    }

    fn restart_idle_timeout(&self) {
        self.idle_timer.restart();
    }
}
