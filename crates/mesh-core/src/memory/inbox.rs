use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::model::InboxEntry;
use crate::ports::InboxRepo;

#[derive(Default)]
pub struct InMemoryInboxRepo {
    entries: RwLock<HashMap<(String, String), InboxEntry>>,
}

impl InMemoryInboxRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InboxRepo for InMemoryInboxRepo {
    async fn put(&self, entry: InboxEntry) -> RepoResult<()> {
        let key = (entry.stream_id.clone(), entry.msg_id.clone());
        self.entries.write().unwrap().entry(key).or_insert(entry);
        Ok(())
    }

    async fn get(&self, stream_id: &str, msg_id: &str) -> RepoResult<Option<InboxEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .get(&(stream_id.to_owned(), msg_id.to_owned()))
            .cloned())
    }

    async fn mark_processed(&self, stream_id: &str, msg_id: &str, processed_ts: i64) -> RepoResult<()> {
        if let Some(entry) = self
            .entries
            .write()
            .unwrap()
            .get_mut(&(stream_id.to_owned(), msg_id.to_owned()))
        {
            entry.processed_ts = Some(processed_ts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_write_wins_on_duplicate_put() {
        let repo = InMemoryInboxRepo::new();
        repo.put(InboxEntry::new("s1", "m1", b"first".to_vec(), 1)).await.unwrap();
        repo.put(InboxEntry::new("s1", "m1", b"second".to_vec(), 2)).await.unwrap();
        let entry = repo.get("s1", "m1").await.unwrap().unwrap();
        assert_eq!(entry.payload, b"first");
    }

    #[tokio::test]
    async fn mark_processed_sets_the_timestamp() {
        let repo = InMemoryInboxRepo::new();
        repo.put(InboxEntry::new("s1", "m1", b"x".to_vec(), 1)).await.unwrap();
        repo.mark_processed("s1", "m1", 42).await.unwrap();
        let entry = repo.get("s1", "m1").await.unwrap().unwrap();
        assert!(entry.is_processed());
        assert_eq!(entry.processed_ts, Some(42));
    }
}
