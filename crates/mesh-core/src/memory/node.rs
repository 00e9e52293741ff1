use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RepoError, RepoResult};
use crate::model::Node;
use crate::ports::NodeRepo;

#[derive(Default)]
pub struct InMemoryNodeRepo {
    nodes: RwLock<HashMap<String, Node>>,
}

impl InMemoryNodeRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeRepo for InMemoryNodeRepo {
    async fn put(&self, node: Node) -> RepoResult<()> {
        self.nodes.write().unwrap().insert(node.node_id.clone(), node);
        Ok(())
    }

    async fn get(&self, node_id: &str) -> RepoResult<Node> {
        self.nodes.read().unwrap().get(node_id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list(&self) -> RepoResult<Vec<Node>> {
        Ok(self.nodes.read().unwrap().values().cloned().collect())
    }

    async fn remove(&self, node_id: &str) -> RepoResult<()> {
        self.nodes.write().unwrap().remove(node_id);
        Ok(())
    }
}
