//! The link registry: tracks one send queue per established peer link.
//! §4.2: "Only one link per peer pair is kept; duplicate inbound
//! connection attempts close the older one after the newer completes
//! authentication."

use std::collections::HashMap;
use std::sync::RwLock;

use mesh_protocol::{NodeId, Priority};

use crate::queue::{EnqueueError, PriorityQueueSender};

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("no link established to {0}")]
    NoLink(NodeId),
    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
}

/// Many-readers, one-writer map from peer node id to that link's send
/// queue handle.
#[derive(Default)]
pub struct LinkRegistry {
    links: RwLock<HashMap<NodeId, PriorityQueueSender>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly authenticated link, replacing (and implicitly
    /// superseding) any prior queue for the same peer — the caller is
    /// responsible for having already closed the older transport
    /// connection per the "duplicate inbound" rule above.
    pub fn register(&self, peer_id: NodeId, sender: PriorityQueueSender) {
        self.links.write().unwrap().insert(peer_id, sender);
    }

    pub fn remove(&self, peer_id: &str) {
        self.links.write().unwrap().remove(peer_id);
    }

    pub fn is_connected(&self, peer_id: &str) -> bool {
        self.links.read().unwrap().contains_key(peer_id)
    }

    pub fn connected_peers(&self) -> Vec<NodeId> {
        self.links.read().unwrap().keys().cloned().collect()
    }

    pub fn send_to(&self, peer_id: &str, priority: Priority, frame: Vec<u8>) -> Result<(), SendError> {
        let sender = self
            .links
            .read()
            .unwrap()
            .get(peer_id)
            .cloned()
            .ok_or_else(|| SendError::NoLink(peer_id.to_owned()))?;
        sender.try_enqueue(priority, frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::PriorityQueue;

    #[test]
    fn sending_to_an_unregistered_peer_fails() {
        let registry = LinkRegistry::new();
        let err = registry.send_to("ghost", Priority::Normal, vec![1]).unwrap_err();
        assert!(matches!(err, SendError::NoLink(_)));
    }

    #[test]
    fn registering_then_removing_updates_connected_state() {
        let registry = LinkRegistry::new();
        let (sender, _queue) = PriorityQueue::new(8);
        registry.register("peer-a".to_owned(), sender);
        assert!(registry.is_connected("peer-a"));
        registry.remove("peer-a");
        assert!(!registry.is_connected("peer-a"));
    }
}
