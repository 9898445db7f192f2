//! Pump that drains queued frames into a WebSocket sink

use crate::OutboundFrame;
use futures::sink::{Sink, SinkExt};
use ras_endpoint_types::{ConnectionId, OutboundMessage, SendError};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

/// Convert a queued message to a WebSocket message
pub fn to_ws_message(message: OutboundMessage) -> Result<WsMessage, SendError> {
    match message {
        OutboundMessage::Text(text) => Ok(WsMessage::Text(text.into())),
        OutboundMessage::Binary(data) => Ok(WsMessage::Binary(data)),
        OutboundMessage::Object(value) => serde_json::to_string(&value)
            .map(|json| WsMessage::Text(json.into()))
            .map_err(SendError::encode),
    }
}

/// Writes frames from a [`ChannelRemoteEndpoint`](crate::ChannelRemoteEndpoint)
/// to the connection, resolving each frame's completion with the outcome.
pub struct WebSocketWriter<S> {
    connection_id: ConnectionId,
    frames: mpsc::UnboundedReceiver<OutboundFrame>,
    sink: S,
}

impl<S> WebSocketWriter<S>
where
    S: Sink<WsMessage> + Send + Unpin,
    S::Error: std::fmt::Display,
{
    pub fn new(
        connection_id: ConnectionId,
        frames: mpsc::UnboundedReceiver<OutboundFrame>,
        sink: S,
    ) -> Self {
        Self {
            connection_id,
            frames,
            sink,
        }
    }

    /// Run until every endpoint handle is dropped or the sink fails.
    ///
    /// After a sink failure the remaining queued frames are failed with
    /// [`SendError::ConnectionClosed`] and the error is returned.
    pub async fn run(mut self) -> Result<(), SendError> {
        debug!("Starting writer for connection: {}", self.connection_id);

        while let Some(frame) = self.frames.recv().await {
            let (message, completer) = frame.into_parts();
            let kind = message.kind();

            let ws_message = match to_ws_message(message) {
                Ok(ws_message) => ws_message,
                Err(e) => {
                    completer.complete(Err(e));
                    continue;
                }
            };

            match self.sink.send(ws_message).await {
                Ok(()) => {
                    debug!("Wrote {} message to {}", kind, self.connection_id);
                    completer.complete(Ok(()));
                }
                Err(e) => {
                    let error = SendError::transport(e);
                    warn!("Write to {} failed: {}", self.connection_id, error);
                    completer.complete(Err(error.clone()));
                    self.fail_pending();
                    return Err(error);
                }
            }
        }

        debug!("Writer for {} finished, closing sink", self.connection_id);
        if let Err(e) = self.sink.close().await {
            debug!("Closing sink for {} failed: {}", self.connection_id, e);
        }
        Ok(())
    }

    fn fail_pending(&mut self) {
        self.frames.close();
        while let Ok(frame) = self.frames.try_recv() {
            frame.complete(Err(SendError::ConnectionClosed));
        }
    }
}
