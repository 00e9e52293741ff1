use serde::{Deserialize, Serialize};

/// One neighbor entry in an LSA's adjacency list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjacency {
    pub neighbor_id: String,
    pub cost: f64,
}

/// A link-state advertisement: one origin's view of its own adjacencies,
/// versioned so stale copies can be detected and dropped (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lsa {
    pub origin: String,
    pub version: u64,
    pub digest: String,
    pub adjacencies: Vec<Adjacency>,
}

impl Lsa {
    pub fn new(origin: impl Into<String>, version: u64, adjacencies: Vec<Adjacency>) -> Self {
        let origin = origin.into();
        let digest = compute_digest(&origin, version, &adjacencies);
        Lsa {
            origin,
            version,
            digest,
            adjacencies,
        }
    }

    /// Per §3: "a node accepts an LSA only if version > stored version
    /// for that origin".
    pub fn supersedes(&self, stored_version: Option<u64>) -> bool {
        match stored_version {
            Some(v) => self.version > v,
            None => true,
        }
    }
}

fn compute_digest(origin: &str, version: u64, adjacencies: &[Adjacency]) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    origin.hash(&mut hasher);
    version.hash(&mut hasher);
    for adj in adjacencies {
        adj.neighbor_id.hash(&mut hasher);
        adj.cost.to_bits().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_strictly_higher_version_supersedes() {
        let lsa = Lsa::new("node-a", 3, vec![]);
        assert!(!lsa.supersedes(Some(3)));
        assert!(!lsa.supersedes(Some(4)));
        assert!(lsa.supersedes(Some(2)));
        assert!(lsa.supersedes(None));
    }
}
