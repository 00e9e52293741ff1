//! Link-state database (§4.4): the most recent LSA per origin, keyed by
//! version. Flooding decisions (re-broadcast to all neighbors but the
//! sender) live in the control plane / transport; this module only
//! decides acceptance and exposes a graph view for path computation.

use std::collections::HashMap;

use mesh_core::model::{Adjacency, Lsa};

#[derive(Default)]
pub struct LinkStateDb {
    by_origin: HashMap<String, Lsa>,
}

impl LinkStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an LSA; accepts (and returns true, meaning "flood it") only
    /// if its version is strictly newer than what's stored for the
    /// origin.
    pub fn offer(&mut self, lsa: Lsa) -> bool {
        let accept = lsa.supersedes(self.by_origin.get(&lsa.origin).map(|l| l.version));
        if accept {
            self.by_origin.insert(lsa.origin.clone(), lsa);
        }
        accept
    }

    pub fn get(&self, origin: &str) -> Option<&Lsa> {
        self.by_origin.get(origin)
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.by_origin.keys().map(String::as_str)
    }

    /// A read-only snapshot suitable for path computation: copy-on-write
    /// in the sense that callers get an owned `Vec` rather than a lock
    /// held across computation (§5 "LSDB: copy-on-write snapshots; path
    /// computation reads a snapshot").
    pub fn snapshot(&self) -> Vec<Lsa> {
        self.by_origin.values().cloned().collect()
    }

    /// Build an adjacency map (`node -> [(neighbor, cost)]`) from the
    /// current snapshot, for Dijkstra/Yen's to consume directly.
    pub fn adjacency_graph(&self) -> HashMap<String, Vec<Adjacency>> {
        self.by_origin
            .iter()
            .map(|(origin, lsa)| (origin.clone(), lsa.adjacencies.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_newer_versions_are_flooded() {
        let mut db = LinkStateDb::new();
        assert!(db.offer(Lsa::new("a", 1, vec![])));
        assert!(!db.offer(Lsa::new("a", 1, vec![])));
        assert!(db.offer(Lsa::new("a", 2, vec![])));
    }
}
