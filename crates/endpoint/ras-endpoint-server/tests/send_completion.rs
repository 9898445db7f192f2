use bytes::Bytes;
use futures::StreamExt;
use ras_endpoint_server::{
    EndpointConfig, EndpointSession, IdleTimer, OutboundMessage, SendError, TokioWorkerPool,
    WorkerPool, send_handler,
};
use ras_handshake::HandshakeRequestBuilder;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message as WsMessage;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn handshake(uri: &str) -> ras_handshake::HandshakeRequest {
    let request = http::Request::builder()
        .uri(uri)
        .header("User-Agent", "integration-test")
        .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .body(())
        .unwrap();
    let (parts, _) = request.into_parts();
    HandshakeRequestBuilder::from_parts(&parts).build()
}

/// The idle restart is the last finalization step and can land after the
/// future resolves.
async fn wait_for_restarts(timer: &IdleTimer, expected: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while timer.restart_count() < expected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
}

#[derive(Serialize)]
struct Update {
    seq: u32,
    body: &'static str,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sends_of_every_kind_complete_once() {
    init_tracing();

    let request = handshake("wss://example.com/chat?room=lobby");
    assert_eq!(request.request_path(), "/chat");
    assert_eq!(request.parameter("room"), Some("lobby"));
    assert!(request.is_secure());

    let pool: Arc<dyn WorkerPool> = Arc::new(TokioWorkerPool::current().unwrap());
    let (session, frames) =
        EndpointSession::open(request, &EndpointConfig::default(), pool).unwrap();
    assert_eq!(session.metadata()["client_ip"], "203.0.113.7");

    let (sink, mut written) = futures::channel::mpsc::unbounded::<WsMessage>();
    let writer = tokio::spawn(session.writer(frames, sink).run());

    let handled = Arc::new(AtomicUsize::new(0));
    let counting = |handled: &Arc<AtomicUsize>| {
        let handled = handled.clone();
        send_handler(move |result| {
            assert_eq!(result, Ok(()));
            handled.fetch_add(1, Ordering::SeqCst);
        })
    };

    let sender = session.sender();
    let results = [
        sender.send_text("hello", counting(&handled)).await,
        sender
            .send_binary(Bytes::from_static(b"\x00\x01"), counting(&handled))
            .await,
        sender
            .send_object(Update { seq: 1, body: "joined" }, counting(&handled))
            .await,
        sender.send(OutboundMessage::from("any"), None).await,
    ];
    assert!(results.iter().all(Result::is_ok));

    assert_eq!(handled.load(Ordering::SeqCst), 3);
    wait_for_restarts(session.idle_timer(), 4).await;
    assert_eq!(session.idle_timer().restart_count(), 4);

    assert_eq!(written.next().await, Some(WsMessage::Text("hello".into())));
    assert_eq!(
        written.next().await,
        Some(WsMessage::Binary(Bytes::from_static(b"\x00\x01")))
    );
    assert_eq!(
        written.next().await,
        Some(WsMessage::Text(r#"{"seq":1,"body":"joined"}"#.into()))
    );
    assert_eq!(written.next().await, Some(WsMessage::Text("any".into())));

    drop(session);
    assert_eq!(writer.await.unwrap(), Ok(()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handler_runs_before_idle_restart() {
    init_tracing();

    let pool: Arc<dyn WorkerPool> = Arc::new(TokioWorkerPool::current().unwrap());
    let (session, frames) =
        EndpointSession::open(handshake("/ws"), &EndpointConfig::default(), pool).unwrap();
    let (sink, _written) = futures::channel::mpsc::unbounded::<WsMessage>();
    tokio::spawn(session.writer(frames, sink).run());

    let restarts_seen = Arc::new(AtomicU64::new(u64::MAX));
    let timer = session.idle_timer().clone();
    let seen = restarts_seen.clone();

    let future = session.sender().send_text(
        "ping",
        send_handler(move |_| seen.store(timer.restart_count(), Ordering::SeqCst)),
    );

    assert_eq!(future.clone().await, Ok(()));
    assert!(future.is_done());

    wait_for_restarts(session.idle_timer(), 1).await;

    assert_eq!(restarts_seen.load(Ordering::SeqCst), 0);
    assert_eq!(session.idle_timer().restart_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transport_failure_reaches_every_handler() {
    init_tracing();

    let pool: Arc<dyn WorkerPool> = Arc::new(TokioWorkerPool::current().unwrap());
    let (session, frames) =
        EndpointSession::open(handshake("/ws"), &EndpointConfig::default(), pool).unwrap();

    let (sink, written) = futures::channel::mpsc::unbounded::<WsMessage>();
    drop(written);
    let writer = tokio::spawn(session.writer(frames, sink).run());

    let failures = Arc::new(Mutex::new(Vec::new()));
    let record = |failures: &Arc<Mutex<Vec<SendError>>>| {
        let failures = failures.clone();
        send_handler(move |result| {
            if let Err(e) = result {
                failures.lock().unwrap().push(e);
            }
        })
    };

    let first = session.sender().send_text("lost", record(&failures)).await;
    assert!(matches!(first, Err(SendError::Transport(_))));
    assert!(matches!(writer.await.unwrap(), Err(SendError::Transport(_))));

    let second = session.sender().send_text("too late", record(&failures)).await;
    assert_eq!(second, Err(SendError::ConnectionClosed));

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[1], SendError::ConnectionClosed);
    drop(failures);
    wait_for_restarts(session.idle_timer(), 2).await;
    assert_eq!(session.idle_timer().restart_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shut_down_pool_rejects_inline() {
    init_tracing();

    let tokio_pool = Arc::new(TokioWorkerPool::current().unwrap());
    tokio_pool.shutdown();
    let (session, _frames) =
        EndpointSession::open(handshake("/ws"), &EndpointConfig::default(), tokio_pool).unwrap();

    let handled = Arc::new(AtomicUsize::new(0));
    let future = {
        let handled = handled.clone();
        session.sender().send_binary(
            vec![1u8, 2, 3],
            send_handler(move |result| {
                assert_eq!(result, Err(SendError::Rejected));
                handled.fetch_add(1, Ordering::SeqCst);
            }),
        )
    };

    // finalized before send returned
    assert!(future.is_done());
    assert_eq!(future.await, Err(SendError::Rejected));
    assert_eq!(handled.load(Ordering::SeqCst), 1);
    assert_eq!(session.idle_timer().restart_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_oversized_message_fails_without_reaching_the_wire() {
    init_tracing();

    let config = EndpointConfig::builder().max_text_message_size(8).build();
    let pool: Arc<dyn WorkerPool> = Arc::new(TokioWorkerPool::current().unwrap());
    let (session, frames) = EndpointSession::open(handshake("/ws"), &config, pool).unwrap();
    let (sink, mut written) = futures::channel::mpsc::unbounded::<WsMessage>();
    let writer = tokio::spawn(session.writer(frames, sink).run());

    let result = session
        .sender()
        .send_text("far more than eight bytes", None)
        .await;
    assert!(matches!(result, Err(SendError::Encode(_))));
    wait_for_restarts(session.idle_timer(), 1).await;
    assert_eq!(session.idle_timer().restart_count(), 1);

    drop(session);
    assert_eq!(writer.await.unwrap(), Ok(()));
    assert_eq!(written.next().await, None);
}
