//! The handle returned by an asynchronous send

use futures::future::BoxFuture;
use ras_endpoint_types::{SendError, SendResult};
use std::future::IntoFuture;
use std::time::Duration;
use tokio::sync::watch;

/// Callback invoked exactly once with the outcome of a send
pub type SendHandler = Box<dyn FnOnce(SendResult) + Send + 'static>;

/// Box a closure as a [`SendHandler`]
pub fn send_handler<F>(f: F) -> Option<SendHandler>
where
    F: FnOnce(SendResult) + Send + 'static,
{
    Some(Box::new(f))
}

/// Pending-then-done handle for one send.
///
/// The handle can be awaited, checked with [`is_done`](SendFuture::is_done),
/// or waited on from blocking code. Clones observe the same send.
#[derive(Clone)]
pub struct SendFuture {
    state: watch::Receiver<Option<SendResult>>,
}

/// Completing side of a [`SendFuture`]
pub(crate) struct SendPromise {
    state: watch::Sender<Option<SendResult>>,
}

impl SendFuture {
    pub(crate) fn pending() -> (SendFuture, SendPromise) {
        let (tx, rx) = watch::channel(None);
        (SendFuture { state: rx }, SendPromise { state: tx })
    }

    /// Whether the send has been finalized
    pub fn is_done(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The outcome, once done
    pub fn result(&self) -> Option<SendResult> {
        Option::clone(&self.state.borrow())
    }

    /// Wait for the outcome from asynchronous code.
    ///
    /// A promise dropped without completing yields [`SendError::Canceled`].
    pub async fn completed(&self) -> SendResult {
        let mut state = self.state.clone();
        let result = match state.wait_for(Option::is_some).await {
            Ok(done) => Option::clone(&done),
            Err(_) => None,
        };
        result.unwrap_or(Err(SendError::Canceled))
    }

    /// Block until the send is done.
    ///
    /// Do not call this from an async task; await the handle instead.
    pub fn wait(&self) -> SendResult {
        futures::executor::block_on(self.completed())
    }

    /// Block until the send is done or `timeout` elapses.
    ///
    /// Like [`wait`](Self::wait), this must not be called from an async task.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SendResult> {
        if let Some(result) = self.result() {
            return Some(result);
        }

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(_) => return self.result(),
        };
        runtime
            .block_on(tokio::time::timeout(timeout, self.completed()))
            .ok()
    }
}

impl std::fmt::Debug for SendFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendFuture")
            .field("result", &self.result())
            .finish()
    }
}

impl IntoFuture for SendFuture {
    type Output = SendResult;
    type IntoFuture = BoxFuture<'static, SendResult>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.completed().await })
    }
}

impl SendPromise {
    /// Mark the handle done with `result`. Consumes the promise, so a handle
    /// is resolved at most once.
    pub(crate) fn complete(self, result: SendResult) {
        self.state.send_replace(Some(result));
    }
}
