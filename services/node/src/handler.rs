//! Default `HandlerPort`: a standalone node has no database adapter
//! registered out of the box, so delivered payloads are just logged.
//! A real deployment swaps this for whatever consumes decoded stream
//! payloads without touching `dispatch::handle_data`.

use async_trait::async_trait;
use mesh_streams::{HandlerError, HandlerPort};
use tracing::info;

#[derive(Default)]
pub struct LoggingHandler;

#[async_trait]
impl HandlerPort for LoggingHandler {
    async fn handle(&self, stream_id: &str, msg_id: &str, payload: &[u8]) -> Result<(), HandlerError> {
        info!(stream_id, msg_id, bytes = payload.len(), "delivered message to handler");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_handler_always_succeeds() {
        let handler = LoggingHandler;
        handler.handle("s1", "m1", b"hello").await.unwrap();
    }
}
