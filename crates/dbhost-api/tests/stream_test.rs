#![allow(clippy::unwrap_used)]
// Stream subscriber tests against a local WebSocket server.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_util::sync::CancellationToken;
use url::Url;

use dbhost_api::{
    Error, Session, StreamFrame, StreamSubscription, TransportConfig, TrustAnchor, USER_AGENT,
    open_stream,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// What the server saw during the handshake and first frame.
struct Captured {
    query: Option<String>,
    user_agent: Option<String>,
    subscription: String,
}

fn session() -> Session {
    Session::new("ada@example.test", SecretString::from("tok1".to_string())).unwrap()
}

fn transport() -> TransportConfig {
    let anchor = TrustAnchor::from_pem(include_bytes!("fixtures/root.pem")).unwrap();
    TransportConfig::new(Arc::new(anchor)).with_timeout(Duration::from_secs(5))
}

/// Accept one connection, record the handshake, play `script`, then either
/// close or hold the socket open.
async fn serve_once(script: Vec<Message>, hold_open: bool) -> (Url, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();

        let (meta_tx, meta_rx) = mpsc::channel();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let query = req.uri().query().map(String::from);
            let user_agent = req
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            meta_tx.send((query, user_agent)).unwrap();
            Ok(resp)
        };

        let mut ws = accept_hdr_async(tcp, callback).await.unwrap();
        let subscription = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            other => panic!("expected subscription frame, got {other:?}"),
        };
        let (query, user_agent) = meta_rx.recv().unwrap();
        let _ = tx.send(Captured {
            query,
            user_agent,
            subscription,
        });

        for message in script {
            ws.send(message).await.unwrap();
        }

        if hold_open {
            tokio::time::sleep(Duration::from_secs(30)).await;
        } else {
            let _ = ws.close(None).await;
        }
    });

    (Url::parse(&format!("ws://{addr}/ws")).unwrap(), rx)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_subscribes_and_yields_frames_in_order() {
    let (endpoint, captured) = serve_once(
        vec![
            Message::text(r#"{"qps":10}"#),
            Message::Ping(vec![1, 2].into()),
            Message::binary(vec![0xde, 0xad]),
            Message::text(r#"{"qps":12}"#),
        ],
        false,
    )
    .await;

    let subscription = StreamSubscription::mongostat("dep1");
    let mut handle = open_stream(
        &endpoint,
        &subscription,
        &session(),
        &transport(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let captured = captured.await.unwrap();
    assert_eq!(captured.query.as_deref(), Some("token=Bearer%20tok1"));
    assert_eq!(captured.user_agent.as_deref(), Some(USER_AGENT));
    let sent: serde_json::Value = serde_json::from_str(&captured.subscription).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({ "command": "mongostat", "deployment_id": "dep1" })
    );

    let first = handle.next_frame().await.unwrap().unwrap();
    let sample: serde_json::Value = first.json().unwrap();
    assert_eq!(sample["qps"], 10);

    let second = handle.next_frame().await.unwrap().unwrap();
    assert_eq!(second, StreamFrame::Binary(vec![0xde, 0xad].into()));

    let third = handle.next_frame().await.unwrap().unwrap();
    assert_eq!(third.as_text(), Some(r#"{"qps":12}"#));

    assert!(handle.next_frame().await.is_none());
    assert!(handle.next_frame().await.is_none());
}

#[tokio::test]
async fn test_into_stream_collects_until_close() {
    let (endpoint, _captured) = serve_once(
        vec![Message::text("a"), Message::text("b")],
        false,
    )
    .await;

    let handle = open_stream(
        &endpoint,
        &StreamSubscription::oplog("dep1"),
        &session(),
        &transport(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let frames: Vec<_> = handle
        .into_stream()
        .map(|frame| frame.unwrap().as_text().unwrap().to_owned())
        .collect()
        .await;
    assert_eq!(frames, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_cancellation_ends_an_idle_stream() {
    let (endpoint, _captured) = serve_once(Vec::new(), true).await;
    let cancel = CancellationToken::new();

    let mut handle = open_stream(
        &endpoint,
        &StreamSubscription::oplog("dep1"),
        &session(),
        &transport(),
        cancel.clone(),
    )
    .await
    .unwrap();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(5), handle.next_frame())
        .await
        .unwrap();
    assert!(next.is_none());
}

#[tokio::test]
async fn test_close_releases_connection() {
    let (endpoint, _captured) = serve_once(Vec::new(), true).await;

    let handle = open_stream(
        &endpoint,
        &StreamSubscription::logs("dep1"),
        &session(),
        &transport(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_refused_connection_is_stream_connect_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoint = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let result = open_stream(
        &endpoint,
        &StreamSubscription::mongostat("dep1"),
        &session(),
        &transport(),
        CancellationToken::new(),
    )
    .await;

    assert!(
        matches!(result, Err(Error::StreamConnect(_))),
        "expected StreamConnect"
    );
}
