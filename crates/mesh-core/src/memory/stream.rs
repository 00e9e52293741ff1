use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RepoError, RepoResult};
use crate::model::Stream;
use crate::ports::StreamRepo;

#[derive(Default)]
pub struct InMemoryStreamRepo {
    streams: RwLock<HashMap<String, Stream>>,
}

impl InMemoryStreamRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamRepo for InMemoryStreamRepo {
    async fn put(&self, stream: Stream) -> RepoResult<()> {
        self.streams.write().unwrap().insert(stream.stream_id.clone(), stream);
        Ok(())
    }

    async fn get(&self, stream_id: &str) -> RepoResult<Stream> {
        self.streams.read().unwrap().get(stream_id).cloned().ok_or(RepoError::NotFound)
    }

    async fn remove(&self, stream_id: &str) -> RepoResult<()> {
        self.streams.write().unwrap().remove(stream_id);
        Ok(())
    }

    async fn list(&self) -> RepoResult<Vec<Stream>> {
        Ok(self.streams.read().unwrap().values().cloned().collect())
    }
}
