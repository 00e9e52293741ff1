use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RepoError, RepoResult};
use crate::model::Link;
use crate::ports::LinkRepo;

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

#[derive(Default)]
pub struct InMemoryLinkRepo {
    links: RwLock<HashMap<(String, String), Link>>,
}

impl InMemoryLinkRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkRepo for InMemoryLinkRepo {
    async fn put(&self, link: Link) -> RepoResult<()> {
        self.links.write().unwrap().insert(key(&link.a, &link.b), link);
        Ok(())
    }

    async fn get(&self, a: &str, b: &str) -> RepoResult<Link> {
        self.links.read().unwrap().get(&key(a, b)).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_for(&self, node_id: &str) -> RepoResult<Vec<Link>> {
        Ok(self
            .links
            .read()
            .unwrap()
            .values()
            .filter(|l| l.a == node_id || l.b == node_id)
            .cloned()
            .collect())
    }

    async fn remove(&self, a: &str, b: &str) -> RepoResult<()> {
        self.links.write().unwrap().remove(&key(a, b));
        Ok(())
    }
}
