use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RepoError, RepoResult};
use crate::model::RaftGroupMeta;
use crate::ports::RaftGroupRepo;

#[derive(Default)]
pub struct InMemoryRaftGroupRepo {
    groups: RwLock<HashMap<String, RaftGroupMeta>>,
}

impl InMemoryRaftGroupRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RaftGroupRepo for InMemoryRaftGroupRepo {
    async fn put(&self, meta: RaftGroupMeta) -> RepoResult<()> {
        self.groups.write().unwrap().insert(meta.group_id.clone(), meta);
        Ok(())
    }

    async fn get(&self, group_id: &str) -> RepoResult<RaftGroupMeta> {
        self.groups.read().unwrap().get(group_id).cloned().ok_or(RepoError::NotFound)
    }

    async fn remove(&self, group_id: &str) -> RepoResult<()> {
        self.groups.write().unwrap().remove(group_id);
        Ok(())
    }
}
