//! Structured payload schemas for the `routing`, `consensus`, and
//! `management` message types (§6 of the spec).
//!
//! These are the JSON shapes carried inside `Message::payload` once a
//! message's `header.kind` says it's one of these three types. `data` and
//! `heartbeat` messages carry opaque/empty payloads and have no type here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// consensus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusSubType {
    RequestVote,
    AppendEntries,
    Heartbeat,
    ConfigChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusPayload {
    pub sub_type: ConsensusSubType,
    /// `0` is a legitimate initial term (see SPEC_FULL.md's resolved Open
    /// Question); only a missing `term` field is a validation error.
    pub term: u64,
    pub data: ConsensusData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsensusData {
    RequestVote {
        term: u64,
        candidate_id: String,
        last_log_index: u64,
        last_log_term: u64,
    },
    AppendEntries {
        term: u64,
        leader_id: String,
        prev_log_index: u64,
        prev_log_term: u64,
        entries: Vec<serde_json::Value>,
        leader_commit: u64,
    },
    ConfigChange {
        term: u64,
        #[serde(rename = "type")]
        change_type: ConfigChangeType,
        node_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigChangeType {
    Add,
    Remove,
}

// ---------------------------------------------------------------------------
// management
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementSubType {
    NodeDiscovery,
    ConnectionManagement,
    TopologyUpdate,
    HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementPayload {
    pub sub_type: ManagementSubType,
    pub data: ManagementData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManagementData {
    NodeDiscovery {
        node_id: String,
        mesh_id: String,
        address: String,
        #[serde(default)]
        capabilities: Vec<String>,
        #[serde(default)]
        metadata: serde_json::Map<String, serde_json::Value>,
    },
    ConnectionManagement {
        #[serde(rename = "type")]
        action: ConnectionAction,
        peer_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    TopologyUpdate {
        action: TopologyAction,
        node_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(default)]
        neighbors: Vec<String>,
    },
    HealthStatus {
        node_id: String,
        status: HealthState,
        #[serde(default)]
        metrics: serde_json::Map<String, serde_json::Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionAction {
    Connect,
    Disconnect,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyAction {
    Add,
    Remove,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

// ---------------------------------------------------------------------------
// routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingSubType {
    RouteUpdate,
    RouteRequest,
    RouteResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPayload {
    pub sub_type: RoutingSubType,
    /// LSA digests and/or path advertisements; kept opaque-ish (a JSON
    /// value) here since mesh-topology owns the concrete LSA shape.
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consensus_config_change_roundtrips() {
        let payload = ConsensusPayload {
            sub_type: ConsensusSubType::ConfigChange,
            term: 0,
            data: ConsensusData::ConfigChange {
                term: 0,
                change_type: ConfigChangeType::Add,
                node_id: "node-x".to_owned(),
                address: Some("10.0.0.9:7000".to_owned()),
            },
        };
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: ConsensusPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn management_topology_update_roundtrips() {
        let payload = ManagementPayload {
            sub_type: ManagementSubType::TopologyUpdate,
            data: ManagementData::TopologyUpdate {
                action: TopologyAction::Add,
                node_id: "node-a".to_owned(),
                address: Some("10.0.0.1:7000".to_owned()),
                neighbors: vec!["node-b".to_owned()],
            },
        };
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: ManagementPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }
}
