use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    Open,
    KeyRequired,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshStatus {
    Active,
    Degraded,
    Critical,
}

/// The single mesh identity this process participates in (§3). Exactly
/// one exists per process; `status` is derived from the reachable
/// fraction of known nodes, not stored authoritatively (the control
/// plane recomputes it as membership changes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub mesh_id: String,
    pub name: String,
    pub join_policy: JoinPolicy,
    pub join_key_digest: Option<String>,
    pub status: MeshStatus,
}

impl Mesh {
    pub fn seed(mesh_id: impl Into<String>, name: impl Into<String>, join_policy: JoinPolicy, join_key_digest: Option<String>) -> Self {
        Mesh {
            mesh_id: mesh_id.into(),
            name: name.into(),
            join_policy,
            join_key_digest,
            status: MeshStatus::Active,
        }
    }

    /// §4.5 degradation rule: the mesh is `critical` once at least half of
    /// known nodes are unreachable.
    pub fn status_for_reachable_fraction(reachable: usize, known: usize) -> MeshStatus {
        if known == 0 {
            return MeshStatus::Active;
        }
        let unreachable = known - reachable;
        if unreachable * 2 >= known {
            MeshStatus::Critical
        } else if unreachable > 0 {
            MeshStatus::Degraded
        } else {
            MeshStatus::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_unreachable_is_critical() {
        assert_eq!(Mesh::status_for_reachable_fraction(2, 4), MeshStatus::Critical);
        assert_eq!(Mesh::status_for_reachable_fraction(3, 4), MeshStatus::Degraded);
        assert_eq!(Mesh::status_for_reachable_fraction(4, 4), MeshStatus::Active);
    }
}
