//! Message construction: fresh ids and a process-wide monotonic sequence
//! number per the generation contract (§4.1/§9).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{new_message_id, Header, MessageType, NodeId, Priority, PROTOCOL_VERSION};

/// Builds headers for one local node. `sequence` is process-wide and
/// monotonic for the lifetime of the `Framer`; it is not persisted here —
/// a restart resets it, which is why consumers that need a durable,
/// never-reused sequence must track incarnation separately (mesh-membership
/// does this for SWIM incarnation numbers).
pub struct Framer {
    node_id: NodeId,
    sequence: AtomicU64,
}

impl Framer {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Framer {
            node_id: node_id.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Build a header addressed to `to` (empty string for broadcast).
    pub fn header(&self, kind: MessageType, to: impl Into<NodeId>, priority: Priority, ttl_s: u32) -> Header {
        Header {
            version: PROTOCOL_VERSION.to_owned(),
            id: new_message_id(),
            kind,
            from: self.node_id.clone(),
            to: to.into(),
            priority,
            timestamp_ns: now_unix_ns(),
            ttl_s,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn broadcast_header(&self, kind: MessageType, priority: Priority, ttl_s: u32) -> Header {
        self.header(kind, NodeId::new(), priority, ttl_s)
    }
}

fn now_unix_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic_and_starts_at_zero() {
        let framer = Framer::new("node-a");
        let h0 = framer.header(MessageType::Data, "node-b", Priority::Normal, 30);
        let h1 = framer.header(MessageType::Data, "node-b", Priority::Normal, 30);
        assert_eq!(h0.sequence, 0);
        assert_eq!(h1.sequence, 1);
    }

    #[test]
    fn each_header_gets_a_fresh_id() {
        let framer = Framer::new("node-a");
        let h0 = framer.header(MessageType::Heartbeat, "node-b", Priority::Low, 0);
        let h1 = framer.header(MessageType::Heartbeat, "node-b", Priority::Low, 0);
        assert_ne!(h0.id, h1.id);
    }

    #[test]
    fn broadcast_header_has_empty_to() {
        let framer = Framer::new("node-a");
        let h = framer.broadcast_header(MessageType::Routing, Priority::High, 10);
        assert!(h.is_broadcast());
        assert_eq!(h.from, "node-a");
    }
}
