use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::ports::ConfigKvRepo;

#[derive(Default)]
pub struct InMemoryConfigKvRepo {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryConfigKvRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigKvRepo for InMemoryConfigKvRepo {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> RepoResult<()> {
        self.entries.write().unwrap().insert(key.to_owned(), value);
        Ok(())
    }
}
