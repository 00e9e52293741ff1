use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RepoError, RepoResult};
use crate::model::Lsa;
use crate::ports::LsaRepo;

#[derive(Default)]
pub struct InMemoryLsaRepo {
    by_origin: RwLock<HashMap<String, Lsa>>,
}

impl InMemoryLsaRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LsaRepo for InMemoryLsaRepo {
    async fn offer(&self, lsa: Lsa) -> RepoResult<bool> {
        let mut guard = self.by_origin.write().unwrap();
        let stored_version = guard.get(&lsa.origin).map(|l| l.version);
        if lsa.supersedes(stored_version) {
            guard.insert(lsa.origin.clone(), lsa);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn get(&self, origin: &str) -> RepoResult<Lsa> {
        self.by_origin.read().unwrap().get(origin).cloned().ok_or(RepoError::NotFound)
    }

    async fn list(&self) -> RepoResult<Vec<Lsa>> {
        Ok(self.by_origin.read().unwrap().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let repo = InMemoryLsaRepo::new();
        assert!(repo.offer(Lsa::new("a", 5, vec![])).await.unwrap());
        assert!(!repo.offer(Lsa::new("a", 4, vec![])).await.unwrap());
        assert!(repo.offer(Lsa::new("a", 6, vec![])).await.unwrap());
        assert_eq!(repo.get("a").await.unwrap().version, 6);
    }
}
