//! Asynchronous send over blocking send primitives
//!
//! [`SendCompletionBridge::send`] returns a pending [`SendFuture`] at once and
//! performs the blocking send on a worker pool. On the worker the send moves
//! through `scheduled -> executing -> succeeded | failed -> finalized`, and
//! finalization always runs the same three steps in order:
//!
//! 1. the completion handler (if any) is called with the result,
//! 2. the future is marked done,
//! 3. the owner's idle timeout is restarted.
//!
//! Finalization is owned by a guard, so it also runs when the task unwinds or
//! is dropped without running.

use crate::future::{SendFuture, SendHandler, SendPromise};
use crate::pool::{Task, WorkerPool};
use ras_endpoint_types::{
    AnyKind, Binary, ConnectionId, MessageKind, MessageKindTag, Object, RemoteEndpoint, SendError,
    SendResult, SyncCompletion, Text,
};
use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Per-connection adapter from blocking sends to completion callbacks.
///
/// The message kind `K` is fixed for the bridge's lifetime and decides both
/// the payload type [`send`](Self::send) accepts and the primitive it calls.
pub struct SendCompletionBridge<K: MessageKind> {
    owner: Arc<dyn RemoteEndpoint>,
    pool: Arc<dyn WorkerPool>,
    kind: PhantomData<fn() -> K>,
}

pub type TextBridge = SendCompletionBridge<Text>;
pub type BinaryBridge = SendCompletionBridge<Binary>;
pub type ObjectBridge<T = serde_json::Value> = SendCompletionBridge<Object<T>>;
pub type AnyBridge = SendCompletionBridge<AnyKind>;

impl<K: MessageKind> Clone for SendCompletionBridge<K> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            pool: self.pool.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: MessageKind> SendCompletionBridge<K> {
    pub fn new(owner: Arc<dyn RemoteEndpoint>, pool: Arc<dyn WorkerPool>) -> Self {
        Self {
            owner,
            pool,
            kind: PhantomData,
        }
    }

    pub fn kind(&self) -> MessageKindTag {
        K::KIND
    }

    pub fn owner(&self) -> &Arc<dyn RemoteEndpoint> {
        &self.owner
    }

    /// Send `message` without blocking the caller.
    ///
    /// The returned future is pending until the send finishes. Failures are
    /// only reported through `handler` and the future, never by this call.
    /// If the pool rejects the task, finalization with
    /// [`SendError::Rejected`] happens on the calling thread.
    pub fn send(&self, message: K::Payload, handler: Option<SendHandler>) -> SendFuture {
        let (future, promise) = SendFuture::pending();
        let connection_id = self.owner.connection_id();
        let finalizer = Finalizer {
            connection_id,
            kind: K::KIND,
            handler,
            promise: Some(promise),
            owner: self.owner.clone(),
            result: None,
        };

        let owner = self.owner.clone();
        let task: Task = Box::new(move || {
            debug!("Executing {} send on {}", K::KIND, connection_id);
            let result = execute::<K>(owner.as_ref(), message);
            finalizer.finish(result);
        });

        debug!("Scheduling {} send on {}", K::KIND, connection_id);
        if let Err(task) = self.pool.submit(task) {
            error!("Worker pool rejected {} send on {}", K::KIND, connection_id);
            // Dropping the unrun task drops its finalizer, which reports
            // the rejection.
            drop(task);
        }

        future
    }
}

/// Dispatch and block, turning every failure (including a panic in the
/// primitive) into a failure result.
fn execute<K: MessageKind>(owner: &dyn RemoteEndpoint, message: K::Payload) -> SendResult {
    panic::catch_unwind(AssertUnwindSafe(|| {
        K::dispatch(owner, message).and_then(SyncCompletion::wait)
    }))
    .unwrap_or_else(|payload| Err(SendError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs finalization exactly once, when dropped.
struct Finalizer {
    connection_id: ConnectionId,
    kind: MessageKindTag,
    handler: Option<SendHandler>,
    promise: Option<SendPromise>,
    owner: Arc<dyn RemoteEndpoint>,
    result: Option<SendResult>,
}

impl Finalizer {
    fn finish(mut self, result: SendResult) {
        self.result = Some(result);
    }

    fn outcome(&mut self) -> SendResult {
        self.result.take().unwrap_or_else(|| {
            if std::thread::panicking() {
                Err(SendError::Panicked(
                    "send task unwound before completing".to_string(),
                ))
            } else {
                Err(SendError::Rejected)
            }
        })
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        let result = self.outcome();
        match &result {
            Ok(()) => debug!("{} send on {} succeeded", self.kind, self.connection_id),
            Err(e) => warn!("{} send on {} failed: {}", self.kind, self.connection_id, e),
        }

        if let Some(handler) = self.handler.take() {
            let handler_result = result.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(move || handler(handler_result)));
            if let Err(payload) = outcome {
                error!(
                    "Completion handler for {} panicked: {}",
                    self.connection_id,
                    panic_message(payload.as_ref())
                );
            }
        }

        if let Some(promise) = self.promise.take() {
            promise.complete(result);
        }

        let owner = &self.owner;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| owner.restart_idle_timeout()));
        if let Err(payload) = outcome {
            error!(
                "Idle timeout restart for {} panicked: {}",
                self.connection_id,
                panic_message(payload.as_ref())
            );
        }

        debug!("{} send on {} finalized", self.kind, self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::send_handler;
    use bytes::Bytes;
    use ras_endpoint_types::{NoOpRemoteEndpoint, OutboundMessage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Runs tasks on the submitting thread
    struct InlinePool;

    impl WorkerPool for InlinePool {
        fn submit(&self, task: Task) -> Result<(), Task> {
            task();
            Ok(())
        }
    }

    struct RejectingPool;

    impl WorkerPool for RejectingPool {
        fn submit(&self, task: Task) -> Result<(), Task> {
            Err(task)
        }
    }

    #[derive(Default)]
    struct CountingEndpoint {
        restarts: AtomicUsize,
    }

    impl RemoteEndpoint for CountingEndpoint {
        fn connection_id(&self) -> ConnectionId {
            ConnectionId::default()
        }

        fn send_sync_text(&self, _text: String) -> Result<SyncCompletion, SendError> {
            Ok(SyncCompletion::ready(Ok(())))
        }

        fn send_sync_binary(&self, _data: Bytes) -> Result<SyncCompletion, SendError> {
            panic!("binary primitive exploded");
        }

        fn send_sync_object(
            &self,
            _value: serde_json::Value,
        ) -> Result<SyncCompletion, SendError> {
            Err(SendError::ConnectionClosed)
        }

        fn restart_idle_timeout(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// How every primitive of a [`FailingEndpoint`] fails
    #[derive(Debug, Clone, Copy)]
    enum Failure {
        /// The primitive refuses the message outright
        Refuse,
        /// The primitive accepts it and the completion reports an error
        Complete,
        /// The completion is dropped without reporting
        Abandon,
    }

    struct FailingEndpoint {
        failure: Failure,
        restarts: AtomicUsize,
    }

    impl FailingEndpoint {
        fn new(failure: Failure) -> Self {
            Self {
                failure,
                restarts: AtomicUsize::new(0),
            }
        }

        fn fail(&self) -> Result<SyncCompletion, SendError> {
            match self.failure {
                Failure::Refuse => Err(SendError::ConnectionClosed),
                Failure::Complete => Ok(SyncCompletion::ready(Err(SendError::transport(
                    "reset by peer",
                )))),
                Failure::Abandon => {
                    let (completer, completion) = SyncCompletion::channel();
                    drop(completer);
                    Ok(completion)
                }
            }
        }
    }

    impl RemoteEndpoint for FailingEndpoint {
        fn connection_id(&self) -> ConnectionId {
            ConnectionId::default()
        }

        fn send_sync_text(&self, _text: String) -> Result<SyncCompletion, SendError> {
            self.fail()
        }

        fn send_sync_binary(&self, _data: Bytes) -> Result<SyncCompletion, SendError> {
            self.fail()
        }

        fn send_sync_object(
            &self,
            _value: serde_json::Value,
        ) -> Result<SyncCompletion, SendError> {
            self.fail()
        }

        fn restart_idle_timeout(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn assert_fails_once<K: MessageKind>(
        failure: Failure,
        payload: K::Payload,
        expected: SendError,
    ) {
        let endpoint = Arc::new(FailingEndpoint::new(failure));
        let bridge = SendCompletionBridge::<K>::new(endpoint.clone(), Arc::new(InlinePool));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let future = {
            let calls = calls.clone();
            bridge.send(
                payload,
                send_handler(move |result| calls.lock().unwrap().push(result)),
            )
        };

        assert!(future.is_done(), "{} send with {:?}", K::KIND, failure);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Err(expected.clone())],
            "{} send with {:?}",
            K::KIND,
            failure
        );
        assert_eq!(future.result(), Some(Err(expected)));
        assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_success_runs_handler_then_done_then_restart() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let bridge = TextBridge::new(endpoint.clone(), Arc::new(InlinePool));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let future = {
            let seen = seen.clone();
            let endpoint = endpoint.clone();
            bridge.send(
                "hi".to_string(),
                send_handler(move |result| {
                    // the idle timer has not been touched yet
                    assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 0);
                    seen.lock().unwrap().push(result);
                }),
            )
        };

        assert_eq!(future.result(), Some(Ok(())));
        assert_eq!(*seen.lock().unwrap(), vec![Ok(())]);
        assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.kind(), MessageKindTag::Text);
    }

    #[test]
    fn test_failures_reach_the_handler_once_for_every_kind() {
        let cases = [
            (Failure::Refuse, SendError::ConnectionClosed),
            (Failure::Complete, SendError::transport("reset by peer")),
            (Failure::Abandon, SendError::Canceled),
        ];

        for (failure, expected) in cases {
            assert_fails_once::<Text>(failure, "hi".to_string(), expected.clone());
            assert_fails_once::<Binary>(failure, Bytes::from_static(b"\x01"), expected.clone());
            assert_fails_once::<Object<Vec<u8>>>(failure, vec![1, 2], expected.clone());
            assert_fails_once::<AnyKind>(failure, OutboundMessage::from("any"), expected);
        }
    }

    #[test]
    fn test_primitive_error_without_handler_still_resolves() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let bridge: ObjectBridge =
            SendCompletionBridge::new(endpoint.clone(), Arc::new(InlinePool));

        let future = bridge.send(serde_json::json!({"a": 1}), None);
        assert_eq!(future.result(), Some(Err(SendError::ConnectionClosed)));
        assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_primitive_becomes_failure() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let bridge = BinaryBridge::new(endpoint.clone(), Arc::new(InlinePool));
        let calls = Arc::new(AtomicUsize::new(0));

        let future = {
            let calls = calls.clone();
            bridge.send(
                Bytes::from_static(b"\x01"),
                send_handler(move |result| {
                    assert!(matches!(
                        result,
                        Err(SendError::Panicked(ref m)) if m.contains("exploded")
                    ));
                    calls.fetch_add(1, Ordering::SeqCst);
                }),
            )
        };

        assert!(matches!(future.result(), Some(Err(SendError::Panicked(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_skip_finalization() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let bridge = TextBridge::new(endpoint.clone(), Arc::new(InlinePool));

        let future = bridge.send("hi".to_string(), send_handler(|_| panic!("handler bug")));

        assert_eq!(future.result(), Some(Ok(())));
        assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejected_task_is_finalized_once() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let bridge = AnyBridge::new(endpoint.clone(), Arc::new(RejectingPool));
        let calls = Arc::new(AtomicUsize::new(0));

        let future = {
            let calls = calls.clone();
            bridge.send(
                "hi".into(),
                send_handler(move |result| {
                    assert_eq!(result, Err(SendError::Rejected));
                    calls.fetch_add(1, Ordering::SeqCst);
                }),
            )
        };

        assert_eq!(future.result(), Some(Err(SendError::Rejected)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop_endpoint_succeeds_for_every_kind() {
        let owner: Arc<dyn RemoteEndpoint> = Arc::new(NoOpRemoteEndpoint::new());
        let pool: Arc<dyn WorkerPool> = Arc::new(InlinePool);

        let text = TextBridge::new(owner.clone(), pool.clone()).send("a".into(), None);
        let binary = BinaryBridge::new(owner.clone(), pool.clone()).send(Bytes::new(), None);
        let object = ObjectBridge::<Vec<u32>>::new(owner.clone(), pool.clone())
            .send(vec![1, 2], None);

        for future in [text, binary, object] {
            assert_eq!(future.result(), Some(Ok(())));
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let from_str: Box<dyn Any + Send> = Box::new("static");
        let from_string: Box<dyn Any + Send> = Box::new("owned".to_string());
        let other: Box<dyn Any + Send> = Box::new(7u8);

        assert_eq!(panic_message(from_str.as_ref()), "static");
        assert_eq!(panic_message(from_string.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
