use serde::{Deserialize, Serialize};

/// A node's failure-detector state (§4.3). Transitions only flow
/// alive -> suspect -> dead -> left, though a higher-incarnation `alive`
/// report can refute a suspicion and send a node back to `alive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Alive,
    Suspect,
    Dead,
    Left,
}

/// A mesh member (§3 `Node`). `(node_id, incarnation)` is the conflict
/// resolution key: an update carrying an incarnation older than what's
/// already stored for that node is ignored outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub public_key: Vec<u8>,
    pub address: String,
    pub incarnation: u64,
    pub state: NodeState,
    pub capabilities: Vec<String>,
    /// Unix seconds of the last liveness observation, direct or gossiped.
    pub last_seen: i64,
}

impl Node {
    pub fn new(node_id: impl Into<String>, address: impl Into<String>, public_key: Vec<u8>) -> Self {
        Node {
            node_id: node_id.into(),
            public_key,
            address: address.into(),
            incarnation: 0,
            state: NodeState::Alive,
            capabilities: Vec::new(),
            last_seen: 0,
        }
    }

    /// Whether `update` should supersede `self` per the monotonic
    /// incarnation invariant (§8 property 1).
    pub fn accepts_update(&self, update_incarnation: u64) -> bool {
        update_incarnation >= self.incarnation
    }
}
