//! Outbound link dialing: connect to a peer's WebSocket endpoint and hand
//! the resulting stream to `run_link_loop`. Reconnects on its own schedule
//! using `Backoff`, the way the teacher's `UplinkSession::connect` pairs
//! with its forwarder's reconnect loop, except here every peer link is a
//! dial target rather than a single uplink to one server.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::backoff::Backoff;
use crate::io::TransportError;

type RawWsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Adapts a tungstenite sink half to `Sink<Vec<u8>, Error = TransportError>`.
pub struct WsFrameSink {
    inner: SplitSink<RawWsStream, WsMessage>,
}

impl Sink<Vec<u8>> for WsFrameSink {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_ready(cx)
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    fn start_send(self: Pin<&mut Self>, item: Vec<u8>) -> Result<(), Self::Error> {
        Pin::new(&mut self.get_mut().inner)
            .start_send(WsMessage::Binary(item.into()))
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_flush(cx)
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_close(cx)
            .map_err(|e| TransportError::Socket(e.to_string()))
    }
}

/// Adapts a tungstenite stream half to `Stream<Item = Result<Vec<u8>, TransportError>>`,
/// discarding ping/pong/close frames and surfacing only binary payloads —
/// every frame on this wire is our own length-prefixed binary encoding.
pub struct WsFrameStream {
    inner: SplitStream<RawWsStream>,
}

impl Stream for WsFrameStream {
    type Item = Result<Vec<u8>, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = &mut self.get_mut().inner;
        loop {
            match Pin::new(&mut *inner).poll_next(cx) {
                Poll::Ready(Some(Ok(WsMessage::Binary(bytes)))) => {
                    return Poll::Ready(Some(Ok(bytes.to_vec())))
                }
                Poll::Ready(Some(Ok(WsMessage::Close(_)))) | Poll::Ready(None) => return Poll::Ready(None),
                Poll::Ready(Some(Ok(_))) => continue,
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(TransportError::Socket(e.to_string())))),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("dial to {peer_url} failed: {source}")]
    Connect {
        peer_url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// Dial a peer's WebSocket endpoint once. Callers loop this with `Backoff`
/// between attempts; this function does not retry internally so the caller
/// can observe and log each failed attempt.
pub async fn dial(peer_url: &str) -> Result<(WsFrameSink, WsFrameStream), DialError> {
    let (ws, _response) = tokio_tungstenite::connect_async(peer_url)
        .await
        .map_err(|e| DialError::Connect { peer_url: peer_url.to_owned(), source: e })?;
    let (sink, stream) = ws.split();
    Ok((WsFrameSink { inner: sink }, WsFrameStream { inner: stream }))
}

/// Dial with retry: keeps attempting with exponential backoff until a
/// connection succeeds or `max_attempts` is exhausted (`None` retries
/// forever, matching a long-lived overlay link that should always heal).
pub async fn dial_with_backoff(
    peer_url: &str,
    mut backoff: Backoff,
    max_attempts: Option<u32>,
) -> Result<(WsFrameSink, WsFrameStream), DialError> {
    let mut attempts = 0u32;
    loop {
        match dial(peer_url).await {
            Ok(pair) => return Ok(pair),
            Err(err) => {
                attempts += 1;
                if max_attempts.is_some_and(|max| attempts >= max) {
                    return Err(err);
                }
                tracing::warn!(peer_url, attempt = attempts, error = %err, "dial failed, backing off");
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dial_to_an_unreachable_port_fails_without_panicking() {
        let result = dial("ws://127.0.0.1:1/never-listening").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dial_with_backoff_gives_up_after_max_attempts() {
        let backoff = Backoff::new(crate::backoff::BackoffPolicy {
            base: std::time::Duration::from_millis(1),
            max: std::time::Duration::from_millis(5),
            multiplier: 1.0,
        });
        let result = dial_with_backoff("ws://127.0.0.1:1/never-listening", backoff, Some(2)).await;
        assert!(result.is_err());
    }
}
