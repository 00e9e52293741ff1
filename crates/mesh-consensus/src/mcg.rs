//! Mesh Control Group entry types and critical-mode gating (§4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum McgEntry {
    MembershipChange { node_id: String, joining: bool },
    LsaVersionDigest { origin: String, version: u64, digest: String },
    SystemUpdate { payload: Vec<u8> },
    InternalDbUpdate { payload: Vec<u8> },
    /// The only entry type admitted while the mesh is in critical mode.
    EvictNode { node_id: String },
}

impl McgEntry {
    pub fn is_eviction(&self) -> bool {
        matches!(self, McgEntry::EvictNode { .. })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum McgProposalError {
    #[error("mesh is in critical mode; only eviction proposals are admitted")]
    CriticalModeRestriction,
}

/// §4.5 degradation rule: while the mesh cannot form an MCG quorum
/// (≥50% of known nodes unreachable), only `EvictNode` entries may be
/// proposed. §8 property 8 depends on this gate being checked before
/// every proposal, not just at entry into critical mode.
pub fn gate_proposal(entry: &McgEntry, mesh_is_critical: bool) -> Result<(), McgProposalError> {
    if mesh_is_critical && !entry.is_eviction() {
        return Err(McgProposalError::CriticalModeRestriction);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_mode_blocks_non_eviction_entries() {
        let entry = McgEntry::SystemUpdate { payload: vec![1] };
        assert!(gate_proposal(&entry, true).is_err());
        assert!(gate_proposal(&entry, false).is_ok());
    }

    #[test]
    fn eviction_is_always_admitted() {
        let entry = McgEntry::EvictNode { node_id: "dead-node".into() };
        assert!(gate_proposal(&entry, true).is_ok());
        assert!(gate_proposal(&entry, false).is_ok());
    }
}
