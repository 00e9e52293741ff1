use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RepoError, RepoResult};
use crate::model::{OutboxEntry, OutboxStatus};
use crate::ports::OutboxRepo;

#[derive(Default)]
pub struct InMemoryOutboxRepo {
    entries: RwLock<HashMap<(String, String), OutboxEntry>>,
}

impl InMemoryOutboxRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutboxRepo for InMemoryOutboxRepo {
    async fn put(&self, entry: OutboxEntry) -> RepoResult<()> {
        self.entries
            .write()
            .unwrap()
            .insert((entry.stream_id.clone(), entry.msg_id.clone()), entry);
        Ok(())
    }

    async fn get(&self, stream_id: &str, msg_id: &str) -> RepoResult<OutboxEntry> {
        self.entries
            .read()
            .unwrap()
            .get(&(stream_id.to_owned(), msg_id.to_owned()))
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_pending(&self, stream_id: &str) -> RepoResult<Vec<OutboxEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.stream_id == stream_id && e.status != OutboxStatus::Processed)
            .cloned()
            .collect())
    }

    async fn remove(&self, stream_id: &str, msg_id: &str) -> RepoResult<()> {
        self.entries.write().unwrap().remove(&(stream_id.to_owned(), msg_id.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pruned_entries_no_longer_list_as_pending() {
        let repo = InMemoryOutboxRepo::new();
        repo.put(OutboxEntry::new("s1", "m1", b"x".to_vec())).await.unwrap();
        assert_eq!(repo.list_pending("s1").await.unwrap().len(), 1);
        repo.remove("s1", "m1").await.unwrap();
        assert_eq!(repo.list_pending("s1").await.unwrap().len(), 0);
    }
}
