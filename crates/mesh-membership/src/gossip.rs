//! SWIM gossip message vocabulary (§4.3): `join`, `alive`, `suspect`,
//! `confirm`, `leave`, `user-event`. These are piggybacked on probe
//! traffic by the transport layer; this crate only defines and queues
//! them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GossipEvent {
    Join {
        node_id: String,
        address: String,
        incarnation: u64,
    },
    Alive {
        node_id: String,
        incarnation: u64,
    },
    Suspect {
        node_id: String,
        incarnation: u64,
    },
    Confirm {
        node_id: String,
        incarnation: u64,
    },
    Leave {
        node_id: String,
        incarnation: u64,
    },
    UserEvent {
        topic: String,
        data: Vec<u8>,
    },
}

impl GossipEvent {
    pub fn subject(&self) -> Option<&str> {
        match self {
            GossipEvent::Join { node_id, .. }
            | GossipEvent::Alive { node_id, .. }
            | GossipEvent::Suspect { node_id, .. }
            | GossipEvent::Confirm { node_id, .. }
            | GossipEvent::Leave { node_id, .. } => Some(node_id),
            GossipEvent::UserEvent { .. } => None,
        }
    }
}

/// Bounded dissemination buffer: events piggyback on outgoing probes
/// until a send cap is reached, then age out, matching SWIM's practice
/// of preferring fresher events over indefinite redelivery.
pub struct GossipBuffer {
    capacity: usize,
    max_piggyback_sends: u32,
    pending: Vec<(GossipEvent, u32)>,
}

impl GossipBuffer {
    pub fn new(capacity: usize, max_piggyback_sends: u32) -> Self {
        GossipBuffer {
            capacity,
            max_piggyback_sends,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, event: GossipEvent) {
        if self.pending.len() >= self.capacity {
            self.pending.remove(0);
        }
        self.pending.push((event, 0));
    }

    /// Select up to `max` events to attach to an outgoing probe, bumping
    /// their send counter and dropping any that have aged out.
    pub fn select_for_piggyback(&mut self, max: usize) -> Vec<GossipEvent> {
        let mut selected = Vec::with_capacity(max.min(self.pending.len()));
        for (event, sends) in self.pending.iter_mut() {
            if selected.len() >= max {
                break;
            }
            selected.push(event.clone());
            *sends += 1;
        }
        let max_sends = self.max_piggyback_sends;
        self.pending.retain(|(_, sends)| *sends < max_sends);
        selected
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_age_out_after_max_sends() {
        let mut buffer = GossipBuffer::new(10, 2);
        buffer.push(GossipEvent::Alive {
            node_id: "n1".into(),
            incarnation: 1,
        });
        assert_eq!(buffer.select_for_piggyback(5).len(), 1);
        assert_eq!(buffer.select_for_piggyback(5).len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn oldest_event_is_evicted_over_capacity() {
        let mut buffer = GossipBuffer::new(1, 5);
        buffer.push(GossipEvent::Alive {
            node_id: "n1".into(),
            incarnation: 1,
        });
        buffer.push(GossipEvent::Alive {
            node_id: "n2".into(),
            incarnation: 1,
        });
        assert_eq!(buffer.len(), 1);
        let selected = buffer.select_for_piggyback(10);
        assert_eq!(selected[0].subject(), Some("n2"));
    }
}
