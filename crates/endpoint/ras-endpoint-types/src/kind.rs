//! Message kinds and their dispatch onto the synchronous send primitives
//!
//! A bridge is fixed to one kind for its whole life. The kind is a type, so
//! the payload a bridge accepts is checked by the compiler: a binary buffer
//! cannot be handed to a text bridge.
//!
//! ```compile_fail
//! use ras_endpoint_types::{MessageKind, Text};
//!
//! fn payload_of<K: MessageKind>(_payload: K::Payload) {}
//!
//! payload_of::<Text>(bytes::Bytes::from_static(b"not text"));
//! ```

use crate::{MessageKindTag, OutboundMessage, RemoteEndpoint, SendError, SyncCompletion};
use bytes::Bytes;
use serde::Serialize;
use std::marker::PhantomData;

/// A message kind: the payload type it carries and the primitive it uses.
pub trait MessageKind: Send + Sync + 'static {
    /// Payload accepted by bridges of this kind
    type Payload: Send + 'static;

    /// Runtime tag for logging
    const KIND: MessageKindTag;

    /// Hand the payload to the matching synchronous primitive of `endpoint`.
    fn dispatch(
        endpoint: &dyn RemoteEndpoint,
        payload: Self::Payload,
    ) -> Result<SyncCompletion, SendError>;
}

/// Text messages, sent through [`RemoteEndpoint::send_sync_text`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl MessageKind for Text {
    type Payload = String;
    const KIND: MessageKindTag = MessageKindTag::Text;

    fn dispatch(
        endpoint: &dyn RemoteEndpoint,
        payload: String,
    ) -> Result<SyncCompletion, SendError> {
        endpoint.send_sync_text(payload)
    }
}

/// Binary messages, sent through [`RemoteEndpoint::send_sync_binary`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Binary;

impl MessageKind for Binary {
    type Payload = Bytes;
    const KIND: MessageKindTag = MessageKindTag::Binary;

    fn dispatch(
        endpoint: &dyn RemoteEndpoint,
        payload: Bytes,
    ) -> Result<SyncCompletion, SendError> {
        endpoint.send_sync_binary(payload)
    }
}

/// Arbitrary serializable payloads, routed through
/// [`RemoteEndpoint::send_sync_object`].
///
/// The payload is converted to a JSON value on the worker; a value that
/// refuses to serialize fails the send with [`SendError::Encode`]. Struct
/// fields keep their declaration order.
pub struct Object<T = serde_json::Value>(PhantomData<fn() -> T>);

impl<T> MessageKind for Object<T>
where
    T: Serialize + Send + 'static,
{
    type Payload = T;
    const KIND: MessageKindTag = MessageKindTag::Object;

    fn dispatch(endpoint: &dyn RemoteEndpoint, payload: T) -> Result<SyncCompletion, SendError> {
        let value = serde_json::to_value(&payload).map_err(SendError::encode)?;
        endpoint.send_sync_object(value)
    }
}

/// Any [`OutboundMessage`]; the variant picks the primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyKind;

impl MessageKind for AnyKind {
    type Payload = OutboundMessage;
    const KIND: MessageKindTag = MessageKindTag::Any;

    fn dispatch(
        endpoint: &dyn RemoteEndpoint,
        payload: OutboundMessage,
    ) -> Result<SyncCompletion, SendError> {
        match payload {
            OutboundMessage::Text(text) => endpoint.send_sync_text(text),
            OutboundMessage::Binary(data) => endpoint.send_sync_binary(data),
            OutboundMessage::Object(value) => endpoint.send_sync_object(value),
        }
    }
}
