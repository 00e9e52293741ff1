//! The handler registry boundary (§4.6 step 6, spec Non-goals: "defining
//! handler business logic"). A target delivers each in-order, deduped
//! message to whatever is registered for its stream; this crate only
//! defines the seam and never implements handler logic itself.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("handler for stream {0} rejected the delivery: {1}")]
    Rejected(String, String),
}

/// External collaborator: a real deployment registers one of these per
/// stream (or a catch-all) backed by whatever database adapter or queue
/// consumes the decoded payload. Must be idempotent keyed by
/// `(stream_id, msg_id)` — a handler can be invoked again after a crash
/// between success and the processed-ack committing.
#[async_trait]
pub trait HandlerPort: Send + Sync {
    async fn handle(&self, stream_id: &str, msg_id: &str, payload: &[u8]) -> Result<(), HandlerError>;
}
