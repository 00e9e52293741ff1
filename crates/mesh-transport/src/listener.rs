//! Inbound link acceptance: an axum WebSocket upgrade handler, grounded on
//! the teacher's `ws_forwarder_handler`/`handle_forwarder_socket` pair —
//! upgrade, then hand the socket to the same per-link loop the dialer
//! feeds. Peer authentication (mesh membership / tenant key lookup) is
//! the caller's job; this module only does the upgrade and framing.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::io::TransportError;

/// Adapts the axum socket's sink half to `Sink<Vec<u8>, Error = TransportError>`.
pub struct AxumFrameSink {
    inner: SplitSink<WebSocket, AxumMessage>,
}

impl Sink<Vec<u8>> for AxumFrameSink {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_ready(cx)
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    fn start_send(self: Pin<&mut Self>, item: Vec<u8>) -> Result<(), Self::Error> {
        Pin::new(&mut self.get_mut().inner)
            .start_send(AxumMessage::Binary(item.into()))
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

pub struct AxumFrameStream {
    inner: SplitStream<WebSocket>,
}

impl Stream for AxumFrameStream {
    type Item = Result<Vec<u8>, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = &mut self.get_mut().inner;
        loop {
            match Pin::new(&mut *inner).poll_next(cx) {
                Poll::Ready(Some(Ok(AxumMessage::Binary(bytes)))) => return Poll::Ready(Some(Ok(bytes.to_vec()))),
                Poll::Ready(Some(Ok(AxumMessage::Close(_)))) | Poll::Ready(None) => return Poll::Ready(None),
                Poll::Ready(Some(Ok(_))) => continue,
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(TransportError::Socket(e.to_string())))),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Split an accepted axum WebSocket into the frame sink/stream pair the
/// link loop expects. Called from the upgrade callback after whatever
/// handshake (peer id exchange, mesh key check) the caller performs first.
pub fn split_socket(socket: WebSocket) -> (AxumFrameSink, AxumFrameStream) {
    let (sink, stream) = socket.split();
    (AxumFrameSink { inner: sink }, AxumFrameStream { inner: stream })
}

/// Minimal upgrade handler: accepts the upgrade and invokes `on_connected`
/// with the split frame halves. Left generic over the callback so
/// `services/node` can wire in its own peer-authentication and
/// link-registration logic without this crate knowing about node state.
pub async fn ws_link_upgrade<F, Fut>(ws: WebSocketUpgrade, on_connected: F) -> impl IntoResponse
where
    F: FnOnce(AxumFrameSink, AxumFrameStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = split_socket(socket);
        on_connected(sink, stream).await;
    })
}
