use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::model::Lsa;
use crate::ports::TopologySnapshotRepo;

#[derive(Default)]
pub struct InMemoryTopologySnapshotRepo {
    latest: RwLock<Option<(u64, Vec<Lsa>)>>,
}

impl InMemoryTopologySnapshotRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopologySnapshotRepo for InMemoryTopologySnapshotRepo {
    async fn save_snapshot(&self, version: u64, lsas: Vec<Lsa>) -> RepoResult<()> {
        *self.latest.write().unwrap() = Some((version, lsas));
        Ok(())
    }

    async fn load_latest(&self) -> RepoResult<Option<(u64, Vec<Lsa>)>> {
        Ok(self.latest.read().unwrap().clone())
    }
}
