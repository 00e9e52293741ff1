//! A broadcast-plus-ring-buffer event bus for mesh health and lifecycle
//! events, so `WatchMeshEvents` subscribers get both a live stream and a
//! recent-history snapshot for late joiners (the same pattern this
//! codebase uses for its log broadcaster, minus the UI-facing framing).

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

/// A mesh-wide or per-component event worth surfacing to an operator or
/// collaborating service. Each variant carries just enough to explain
/// what changed; consumers that need more detail query the relevant
/// repo/port directly.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    NodeJoined { node_id: String },
    NodeSuspect { node_id: String },
    NodeDead { node_id: String },
    NodeLeft { node_id: String },
    LinkUp { a: String, b: String },
    LinkDown { a: String, b: String },
    MeshStatusChanged { status: String },
    LeaderElected { group_id: String, leader_id: String },
    StreamOpened { stream_id: String },
    StreamClosed { stream_id: String },
    MessageDelivered { stream_id: String, msg_id: String },
}

impl MeshEvent {
    fn describe(&self) -> String {
        match self {
            MeshEvent::NodeJoined { node_id } => format!("node {node_id} joined"),
            MeshEvent::NodeSuspect { node_id } => format!("node {node_id} suspected"),
            MeshEvent::NodeDead { node_id } => format!("node {node_id} declared dead"),
            MeshEvent::NodeLeft { node_id } => format!("node {node_id} left"),
            MeshEvent::LinkUp { a, b } => format!("link {a}-{b} up"),
            MeshEvent::LinkDown { a, b } => format!("link {a}-{b} down"),
            MeshEvent::MeshStatusChanged { status } => format!("mesh status -> {status}"),
            MeshEvent::LeaderElected { group_id, leader_id } => {
                format!("group {group_id} elected leader {leader_id}")
            }
            MeshEvent::StreamOpened { stream_id } => format!("stream {stream_id} opened"),
            MeshEvent::StreamClosed { stream_id } => format!("stream {stream_id} closed"),
            MeshEvent::MessageDelivered { stream_id, msg_id } => {
                format!("stream {stream_id} delivered {msg_id}")
            }
        }
    }
}

/// An entry retained in the ring buffer: a formatted, timestamped line
/// plus the event it was derived from, so `WatchMeshEvents` callers that
/// want structure don't have to re-parse the text.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogEntry {
    pub formatted: String,
    pub event: MeshEvent,
}

/// Broadcasts events live and retains the last `max_entries` for
/// subscribers that join mid-stream.
pub struct MeshEventBus {
    tx: broadcast::Sender<MeshEvent>,
    buffer: Arc<RwLock<VecDeque<EventLogEntry>>>,
    max_entries: usize,
}

impl MeshEventBus {
    pub fn new(capacity: usize, max_entries: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        MeshEventBus {
            tx,
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeshEvent> {
        self.tx.subscribe()
    }

    /// Publish an event: log it, buffer it, and broadcast it. A send
    /// failure just means there are currently no subscribers, which is
    /// not an error — the event is still retained in the buffer.
    pub fn publish(&self, event: MeshEvent) {
        let formatted = format!("{} {}", chrono::Utc::now().format("%H:%M:%S"), event.describe());
        tracing::info!("{}", formatted);
        if let Ok(mut entries) = self.buffer.write() {
            entries.push_back(EventLogEntry { formatted, event: event.clone() });
            while entries.len() > self.max_entries {
                entries.pop_front();
            }
        }
        let _ = self.tx.send(event);
    }

    /// Snapshot of retained entries, oldest first.
    pub fn recent(&self) -> Vec<EventLogEntry> {
        self.buffer.read().map(|b| b.iter().cloned().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_sends_to_subscribers_and_buffers() {
        let bus = MeshEventBus::new(8, 4);
        let mut rx = bus.subscribe();
        bus.publish(MeshEvent::NodeJoined { node_id: "node-a".to_owned() });
        let received = rx.try_recv().unwrap();
        assert_eq!(received, MeshEvent::NodeJoined { node_id: "node-a".to_owned() });
        assert_eq!(bus.recent().len(), 1);
    }

    #[test]
    fn ring_buffer_evicts_oldest_past_capacity() {
        let bus = MeshEventBus::new(8, 2);
        bus.publish(MeshEvent::NodeJoined { node_id: "a".to_owned() });
        bus.publish(MeshEvent::NodeJoined { node_id: "b".to_owned() });
        bus.publish(MeshEvent::NodeJoined { node_id: "c".to_owned() });
        let recent = bus.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, MeshEvent::NodeJoined { node_id: "b".to_owned() });
        assert_eq!(recent[1].event, MeshEvent::NodeJoined { node_id: "c".to_owned() });
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let bus = MeshEventBus::new(4, 4);
        bus.publish(MeshEvent::MeshStatusChanged { status: "critical".to_owned() });
        assert_eq!(bus.recent().len(), 1);
    }
}
