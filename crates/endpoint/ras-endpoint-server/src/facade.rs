//! Asynchronous send surface of a connection

use crate::bridge::{AnyBridge, BinaryBridge, SendCompletionBridge, TextBridge};
use crate::future::{SendFuture, SendHandler};
use crate::pool::WorkerPool;
use bytes::Bytes;
use ras_endpoint_types::{ConnectionId, Object, OutboundMessage, RemoteEndpoint};
use serde::Serialize;
use std::sync::Arc;

/// Non-blocking sends for one connection.
///
/// Every method returns immediately with a [`SendFuture`]; the optional
/// handler is called on the worker once the message has been written or has
/// failed.
#[derive(Clone)]
pub struct AsyncRemoteEndpoint {
    owner: Arc<dyn RemoteEndpoint>,
    pool: Arc<dyn WorkerPool>,
    text: TextBridge,
    binary: BinaryBridge,
    any: AnyBridge,
}

impl AsyncRemoteEndpoint {
    pub fn new(owner: Arc<dyn RemoteEndpoint>, pool: Arc<dyn WorkerPool>) -> Self {
        Self {
            text: SendCompletionBridge::new(owner.clone(), pool.clone()),
            binary: SendCompletionBridge::new(owner.clone(), pool.clone()),
            any: SendCompletionBridge::new(owner.clone(), pool.clone()),
            owner,
            pool,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.owner.connection_id()
    }

    pub fn send_text(&self, text: impl Into<String>, handler: Option<SendHandler>) -> SendFuture {
        self.text.send(text.into(), handler)
    }

    pub fn send_binary(&self, data: impl Into<Bytes>, handler: Option<SendHandler>) -> SendFuture {
        self.binary.send(data.into(), handler)
    }

    /// Send any serializable value; it is encoded on the worker
    pub fn send_object<T>(&self, object: T, handler: Option<SendHandler>) -> SendFuture
    where
        T: Serialize + Send + 'static,
    {
        SendCompletionBridge::<Object<T>>::new(self.owner.clone(), self.pool.clone())
            .send(object, handler)
    }

    /// Send a message whose kind is only known at runtime
    pub fn send(&self, message: OutboundMessage, handler: Option<SendHandler>) -> SendFuture {
        self.any.send(message, handler)
    }
}

impl std::fmt::Debug for AsyncRemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRemoteEndpoint")
            .field("connection_id", &self.connection_id())
            .finish_non_exhaustive()
    }
}
