//! Data Stream Group entry types and processed-ack quorum policy (§4.5,
//! §4.6). Members are small (typically 2-10: one source, several
//! targets); the quorum policy decides when a chunk counts as
//! `processed-committed` and is therefore safe to prune from the source
//! outbox (§8 property 4).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DsgEntry {
    StreamOpen { stream_id: String, members: Vec<String> },
    ChunkAdmit { stream_id: String, msg_id: String, stream_seq: u64 },
    ProcessedAck { stream_id: String, msg_id: String, member: String },
    StreamClose { stream_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckQuorumPolicy {
    AllOfSet,
    Quorum(usize),
}

impl AckQuorumPolicy {
    /// Whether `acked_by` (distinct members who have committed a
    /// `ProcessedAck` for this message) satisfies the policy given a
    /// `required` member set.
    pub fn is_satisfied(&self, required: &HashSet<String>, acked_by: &HashSet<String>) -> bool {
        let acked_required: HashSet<&String> = required.intersection(acked_by).collect();
        match self {
            AckQuorumPolicy::AllOfSet => acked_required.len() == required.len(),
            AckQuorumPolicy::Quorum(n) => acked_required.len() >= *n,
        }
    }
}

/// Tracks processed-acks for one `(stream_id, msg_id)` pair as DSG
/// entries commit, to answer "is this chunk processed-committed yet".
#[derive(Debug, Default)]
pub struct AckTracker {
    acked_by: HashSet<String>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ack(&mut self, member: impl Into<String>) {
        self.acked_by.insert(member.into());
    }

    pub fn is_committed(&self, required: &HashSet<String>, policy: AckQuorumPolicy) -> bool {
        policy.is_satisfied(required, &self.acked_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_of_set_requires_every_required_member() {
        let required = set(&["b", "c"]);
        let mut tracker = AckTracker::new();
        tracker.record_ack("b");
        assert!(!tracker.is_committed(&required, AckQuorumPolicy::AllOfSet));
        tracker.record_ack("c");
        assert!(tracker.is_committed(&required, AckQuorumPolicy::AllOfSet));
    }

    #[test]
    fn quorum_policy_needs_only_n_of_required() {
        let required = set(&["b", "c", "d"]);
        let mut tracker = AckTracker::new();
        tracker.record_ack("b");
        assert!(!tracker.is_committed(&required, AckQuorumPolicy::Quorum(2)));
        tracker.record_ack("c");
        assert!(tracker.is_committed(&required, AckQuorumPolicy::Quorum(2)));
    }

    #[test]
    fn acks_outside_the_required_set_do_not_count() {
        let required = set(&["b"]);
        let mut tracker = AckTracker::new();
        tracker.record_ack("stranger");
        assert!(!tracker.is_committed(&required, AckQuorumPolicy::AllOfSet));
    }
}
