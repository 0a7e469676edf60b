//! Authenticated live-event stream.
//!
//! Opens a WebSocket to a streaming endpoint, sends a single JSON
//! subscription frame, then hands back a [`StreamHandle`] that yields
//! inbound frames on demand. There is no background reader and no
//! reconnection: a dropped connection ends the sequence, and callers that
//! want resilience open a new stream.
//!
//! # Example
//!
//! ```rust,ignore
//! use dbhost_api::{open_stream, StreamSubscription};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let subscription = StreamSubscription::mongostat("5301e6f2a1b2c3d4e5f60718");
//! let mut handle = open_stream(&endpoint, &subscription, &session, &transport, cancel.clone()).await?;
//!
//! while let Some(frame) = handle.next_frame().await {
//!     println!("{}", frame?.as_text().unwrap_or_default());
//! }
//! ```

use bytes::Bytes;
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use url::Url;
use url::form_urlencoded;

use crate::auth::Session;
use crate::error::{Error, certificate_rejection};
use crate::transport::{TransportConfig, USER_AGENT};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── StreamFrame ──────────────────────────────────────────────────────

/// One inbound frame. Decoding is up to the caller, since every endpoint
/// has its own payload shape (log lines, stat samples, oplog entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Text(String),
    Binary(Bytes),
}

impl StreamFrame {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Decode the frame payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        crate::client::decode(self.as_bytes())
    }
}

// ── StreamSubscription ───────────────────────────────────────────────

/// The subscription message the streaming endpoint expects as its first frame.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSubscription {
    pub command: String,
    pub deployment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl StreamSubscription {
    pub fn new(command: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            deployment_id: deployment_id.into(),
            database: None,
        }
    }

    /// Realtime `mongostat` samples for a deployment.
    pub fn mongostat(deployment_id: impl Into<String>) -> Self {
        Self::new("mongostat", deployment_id)
    }

    /// Tail the replication oplog of a deployment.
    pub fn oplog(deployment_id: impl Into<String>) -> Self {
        Self::new("oplog", deployment_id)
    }

    /// Tail the server log of a deployment.
    pub fn logs(deployment_id: impl Into<String>) -> Self {
        Self::new("logs", deployment_id)
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

// ── open_stream ──────────────────────────────────────────────────────

/// Connect to `endpoint`, authenticate, and send `subscription`.
///
/// The bearer token travels as `?token=Bearer%20<token>` because the
/// streaming protocol has no header-based auth. The connect is bounded by
/// `transport.timeout`; reads are not, but they stop as soon as `cancel`
/// fires.
pub async fn open_stream<S>(
    endpoint: &Url,
    subscription: &S,
    session: &Session,
    transport: &TransportConfig,
    cancel: CancellationToken,
) -> Result<StreamHandle, Error>
where
    S: Serialize + ?Sized,
{
    info!(endpoint = %redacted(endpoint), "connecting to stream");

    let url = with_token(endpoint, session);
    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::StreamConnect(e.to_string()))?;
    let request = ClientRequestBuilder::new(uri).with_header("User-Agent", USER_AGENT);
    let connector = transport.stream_connector()?;

    let connect =
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector));

    let (mut ws, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled),
        result = tokio::time::timeout(transport.timeout, connect) => match result {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(match certificate_rejection(&e) {
                    Some(reason) => Error::CertificateRejected(reason),
                    None => Error::StreamConnect(e.to_string()),
                });
            }
            Err(_) => {
                return Err(Error::StreamConnect(format!(
                    "timed out after {}s",
                    transport.timeout.as_secs()
                )));
            }
        },
    };

    debug!("stream connected, sending subscription");

    let payload = serde_json::to_string(subscription)
        .map_err(|e| Error::StreamSubscribe(format!("could not encode subscription: {e}")))?;

    // On failure the socket is dropped here, never returned half-subscribed.
    ws.send(Message::text(payload))
        .await
        .map_err(|e| Error::StreamSubscribe(e.to_string()))?;

    info!("stream subscribed");

    Ok(StreamHandle {
        ws,
        cancel,
        finished: false,
    })
}

/// Append the bearer credential to the endpoint's query string.
fn with_token(endpoint: &Url, session: &Session) -> Url {
    let bearer = session.bearer();
    let token = bearer.strip_prefix("Bearer ").unwrap_or(&bearer);
    let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
    let credential = format!("token=Bearer%20{encoded}");

    let mut url = endpoint.clone();
    let query = match endpoint.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{credential}"),
        _ => credential,
    };
    url.set_query(Some(&query));
    url
}

/// The endpoint without its query, safe to log.
fn redacted(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    url.set_query(None);
    url
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// An open, subscribed stream.
///
/// Owned by the caller until [`close`](Self::close) or drop. Frames are
/// pulled with [`next_frame`](Self::next_frame); each call suspends the
/// caller until the next frame arrives, the connection ends, or the
/// cancellation token fires.
pub struct StreamHandle {
    ws: Socket,
    cancel: CancellationToken,
    finished: bool,
}

impl StreamHandle {
    /// Wait for the next data frame.
    ///
    /// Returns `None` once the server closes, the connection drops, or the
    /// stream is cancelled. A transport error is yielded once, then the
    /// sequence ends.
    pub async fn next_frame(&mut self) -> Option<Result<StreamFrame, Error>> {
        loop {
            if self.finished {
                return None;
            }

            let frame = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!("stream cancelled");
                    self.finished = true;
                    return None;
                }
                frame = self.ws.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    return Some(Ok(StreamFrame::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(data))) => return Some(Ok(StreamFrame::Binary(data))),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // tungstenite answers pings itself
                    trace!("stream control frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    if let Some(ref cf) = frame {
                        info!(code = %cf.code, reason = %cf.reason, "stream closed by server");
                    } else {
                        info!("stream closed by server");
                    }
                    self.finished = true;
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(Error::Stream(e.to_string())));
                }
                None => {
                    info!("stream ended");
                    self.finished = true;
                }
            }
        }
    }

    /// Turn the handle into a lazy `Stream` of frames.
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamFrame, Error>> {
        futures_util::stream::unfold(self, |mut handle| async move {
            let frame = handle.next_frame().await?;
            Some((frame, handle))
        })
    }

    /// Send a close frame and release the connection.
    pub async fn close(mut self) -> Result<(), Error> {
        self.finished = true;
        match self.ws.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(Error::Stream(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use secrecy::SecretString;

    use super::*;

    fn session(token: &str) -> Session {
        Session::new("a@x.com", SecretString::from(token.to_string())).unwrap()
    }

    #[test]
    fn token_travels_in_query() {
        let endpoint = Url::parse("wss://api.example.test/mongo/ws").unwrap();
        let url = with_token(&endpoint, &session("tok1"));
        assert_eq!(url.as_str(), "wss://api.example.test/mongo/ws?token=Bearer%20tok1");
    }

    #[test]
    fn token_is_percent_encoded_and_appended() {
        let endpoint = Url::parse("wss://api.example.test/mongo/ws?v=2").unwrap();
        let url = with_token(&endpoint, &session("a/b+c"));
        assert_eq!(url.query(), Some("v=2&token=Bearer%20a%2Fb%2Bc"));
    }

    #[test]
    fn redacted_endpoint_drops_query() {
        let endpoint = Url::parse("wss://api.example.test/mongo/ws?token=Bearer%20tok1").unwrap();
        assert_eq!(redacted(&endpoint).as_str(), "wss://api.example.test/mongo/ws");
    }

    #[test]
    fn subscription_serializes_compactly() {
        let sub = StreamSubscription::oplog("dep1");
        assert_eq!(
            serde_json::to_value(&sub).unwrap(),
            serde_json::json!({ "command": "oplog", "deployment_id": "dep1" })
        );

        let sub = StreamSubscription::mongostat("dep1").with_database("app");
        assert_eq!(serde_json::to_value(&sub).unwrap()["database"], "app");
    }

    #[test]
    fn frame_json_decoding() {
        let frame = StreamFrame::Text(r#"{"host":"db1","qps":12}"#.into());
        let value: serde_json::Value = frame.json().unwrap();
        assert_eq!(value["qps"], 12);
        assert!(StreamFrame::Binary(Bytes::from_static(b"x")).as_text().is_none());
    }
}
