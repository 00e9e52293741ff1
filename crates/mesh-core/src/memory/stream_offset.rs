use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::ports::StreamOffsetRepo;

#[derive(Default)]
pub struct InMemoryStreamOffsetRepo {
    cursors: RwLock<HashMap<(String, String), u64>>,
}

impl InMemoryStreamOffsetRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamOffsetRepo for InMemoryStreamOffsetRepo {
    async fn get_committed_seq(&self, stream_id: &str, member: &str) -> RepoResult<u64> {
        Ok(*self
            .cursors
            .read()
            .unwrap()
            .get(&(stream_id.to_owned(), member.to_owned()))
            .unwrap_or(&0))
    }

    async fn advance_committed_seq(&self, stream_id: &str, member: &str, seq: u64) -> RepoResult<()> {
        let mut guard = self.cursors.write().unwrap();
        let entry = guard.entry((stream_id.to_owned(), member.to_owned())).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
        Ok(())
    }
}
