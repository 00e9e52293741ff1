use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::ports::DeliveryLogRepo;

/// Backs §4.6's exactly-once rule: even after an inbox TTL expires, this
/// log is still checked before invoking a handler a second time.
#[derive(Default)]
pub struct InMemoryDeliveryLogRepo {
    delivered: RwLock<HashMap<(String, String), i64>>,
}

impl InMemoryDeliveryLogRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryLogRepo for InMemoryDeliveryLogRepo {
    async fn has_delivered(&self, stream_id: &str, msg_id: &str) -> RepoResult<bool> {
        Ok(self
            .delivered
            .read()
            .unwrap()
            .contains_key(&(stream_id.to_owned(), msg_id.to_owned())))
    }

    async fn record_delivered(&self, stream_id: &str, msg_id: &str, processed_ts: i64) -> RepoResult<()> {
        self.delivered
            .write()
            .unwrap()
            .insert((stream_id.to_owned(), msg_id.to_owned()), processed_ts);
        Ok(())
    }
}
