//! Per-connection session assembled from a completed handshake

use crate::{
    AsyncRemoteEndpoint, ChannelRemoteEndpoint, IdleTimer, OutboundFrame, WebSocketWriter,
    WorkerPool,
};
use futures::sink::Sink;
use ras_endpoint_types::{ConnectionId, EndpointConfig, EndpointError};
use ras_handshake::HandshakeRequest;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::info;

/// The state of one open connection: the handshake it was opened with, its
/// remote endpoint and the asynchronous send surface over it.
pub struct EndpointSession {
    request: HandshakeRequest,
    remote: ChannelRemoteEndpoint,
    sender: AsyncRemoteEndpoint,
}

impl EndpointSession {
    /// Open a session for a negotiated handshake.
    ///
    /// The connection id is taken from the request when the transport
    /// assigned one. The returned receiver must be drained by a
    /// [`WebSocketWriter`].
    pub fn open(
        request: HandshakeRequest,
        config: &EndpointConfig,
        pool: Arc<dyn WorkerPool>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<OutboundFrame>), EndpointError> {
        config.validate()?;

        let connection_id = request.connection().unwrap_or_default();
        let (remote, frames) = ChannelRemoteEndpoint::new(connection_id, config);
        let sender = AsyncRemoteEndpoint::new(Arc::new(remote.clone()), pool);

        info!(
            "Opened endpoint session {} for {}",
            connection_id,
            request.create_metadata()
        );

        Ok((
            Self {
                request,
                remote,
                sender,
            },
            frames,
        ))
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.sender.connection_id()
    }

    /// The handshake this session was opened with
    pub fn request(&self) -> &HandshakeRequest {
        &self.request
    }

    pub fn sender(&self) -> &AsyncRemoteEndpoint {
        &self.sender
    }

    pub fn remote(&self) -> &ChannelRemoteEndpoint {
        &self.remote
    }

    pub fn idle_timer(&self) -> &Arc<IdleTimer> {
        self.remote.idle_timer()
    }

    /// Build the writer that drains `frames` into `sink`
    pub fn writer<S>(
        &self,
        frames: mpsc::UnboundedReceiver<OutboundFrame>,
        sink: S,
    ) -> WebSocketWriter<S>
    where
        S: Sink<WsMessage> + Send + Unpin,
        S::Error: std::fmt::Display,
    {
        WebSocketWriter::new(self.connection_id(), frames, sink)
    }

    /// Handshake metadata plus the connection id, for logging and auditing
    pub fn metadata(&self) -> serde_json::Value {
        let mut metadata = self.request.create_metadata();
        if let Some(object) = metadata.as_object_mut() {
            object.insert(
                "connection_id".to_string(),
                serde_json::Value::String(self.connection_id().to_string()),
            );
        }
        metadata
    }
}

impl std::fmt::Debug for EndpointSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSession")
            .field("connection_id", &self.connection_id())
            .field("request_path", &self.request.request_path())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Task;
    use ras_endpoint_types::RemoteEndpoint;

    struct InlinePool;

    impl WorkerPool for InlinePool {
        fn submit(&self, task: Task) -> Result<(), Task> {
            task();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_open_uses_request_connection_id() {
        let id = ConnectionId::new();
        let request = HandshakeRequest::builder()
            .request_uri("/chat?room=1".parse().unwrap())
            .connection(id)
            .secure(true)
            .build();

        let (session, _frames) =
            EndpointSession::open(request, &EndpointConfig::default(), Arc::new(InlinePool))
                .unwrap();

        assert_eq!(session.connection_id(), id);
        assert_eq!(session.remote().connection_id(), id);
        assert_eq!(session.request().request_path(), "/chat");

        let metadata = session.metadata();
        assert_eq!(metadata["connection_id"], id.to_string());
        assert_eq!(metadata["request_path"], "/chat");
        assert_eq!(metadata["secure"], true);
    }

    #[tokio::test]
    async fn test_open_assigns_fresh_id() {
        let request = HandshakeRequest::builder().build();
        let config = EndpointConfig::default();
        let (a, _fa) =
            EndpointSession::open(request.clone(), &config, Arc::new(InlinePool)).unwrap();
        let (b, _fb) = EndpointSession::open(request, &config, Arc::new(InlinePool)).unwrap();

        assert_ne!(a.connection_id(), b.connection_id());
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = EndpointConfig::builder().max_blocking_threads(0).build();
        let result = EndpointSession::open(
            HandshakeRequest::builder().build(),
            &config,
            Arc::new(InlinePool),
        );

        assert!(matches!(result, Err(EndpointError::InvalidConfig(_))));
    }
}
