//! Source-side stream state (§4.6 publish path steps 1, 3, 7): assigns
//! monotonic `stream_seq`, tracks the in-flight outbox, and enforces
//! per-stream backpressure by withholding new admits once the
//! outstanding-unprocessed count exceeds the configured window.

use std::collections::HashMap;

use mesh_core::model::{OutboxEntry, OutboxStatus};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("stream {0} is at its backpressure window limit")]
    WindowExceeded(String),
}

pub struct StreamManagerConfig {
    pub window: usize,
}

impl Default for StreamManagerConfig {
    fn default() -> Self {
        StreamManagerConfig { window: 64 }
    }
}

/// One stream's source-side publish state.
pub struct StreamPublisher {
    stream_id: String,
    next_seq: u64,
    config: StreamManagerConfig,
    outbox: HashMap<String, OutboxEntry>,
}

impl StreamPublisher {
    pub fn new(stream_id: impl Into<String>, config: StreamManagerConfig) -> Self {
        StreamPublisher {
            stream_id: stream_id.into(),
            next_seq: 1,
            config,
            outbox: HashMap::new(),
        }
    }

    pub fn outstanding_unprocessed(&self) -> usize {
        self.outbox.values().filter(|e| e.status != OutboxStatus::Processed).count()
    }

    /// Admit a new message for publish: assign its `stream_seq`, create
    /// the outbox entry, and return the assigned sequence for the caller
    /// to chunk and append to the DSG log. Refuses when the backpressure
    /// window is exhausted (§4.6 "Backpressure").
    pub fn admit(&mut self, msg_id: impl Into<String>, payload: Vec<u8>) -> Result<u64, PublishError> {
        if self.outstanding_unprocessed() >= self.config.window {
            return Err(PublishError::WindowExceeded(self.stream_id.clone()));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let msg_id = msg_id.into();
        let mut entry = OutboxEntry::new(self.stream_id.clone(), msg_id.clone(), payload);
        entry.status = OutboxStatus::Sent;
        self.outbox.insert(msg_id, entry);
        Ok(seq)
    }

    /// §8 property 4: a message leaves the outbox only once its
    /// processed-ack quorum has committed.
    pub fn mark_processed_and_prune(&mut self, msg_id: &str) {
        self.outbox.remove(msg_id);
    }

    pub fn is_outbox_empty(&self) -> bool {
        self.outbox.is_empty()
    }

    pub fn pending_entries(&self) -> impl Iterator<Item = &OutboxEntry> {
        self.outbox.values().filter(|e| e.status != OutboxStatus::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_assigned_monotonically() {
        let mut publisher = StreamPublisher::new("s1", StreamManagerConfig::default());
        let s1 = publisher.admit("m1", b"a".to_vec()).unwrap();
        let s2 = publisher.admit("m2", b"b".to_vec()).unwrap();
        assert_eq!((s1, s2), (1, 2));
    }

    #[test]
    fn window_exhaustion_blocks_new_admits() {
        let mut publisher = StreamPublisher::new("s1", StreamManagerConfig { window: 1 });
        publisher.admit("m1", b"a".to_vec()).unwrap();
        let err = publisher.admit("m2", b"b".to_vec()).unwrap_err();
        assert!(matches!(err, PublishError::WindowExceeded(_)));
    }

    #[test]
    fn pruning_frees_window_capacity() {
        let mut publisher = StreamPublisher::new("s1", StreamManagerConfig { window: 1 });
        publisher.admit("m1", b"a".to_vec()).unwrap();
        publisher.mark_processed_and_prune("m1");
        assert!(publisher.is_outbox_empty());
        assert!(publisher.admit("m2", b"b".to_vec()).is_ok());
    }
}
