//! Persistence ports (§6 "Persistence ports"). Each trait is the abstract
//! store a real backend (Postgres, Redis, an embedded log store) would
//! satisfy; this crate only ships the trait plus an in-memory reference
//! implementation (`crate::memory`) for tests and single-process runs.
//! Wiring a durable adapter is out of scope here.

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::model::{InboxEntry, Link, Lsa, Node, OutboxEntry, RaftGroupMeta, Stream};

#[async_trait]
pub trait NodeRepo: Send + Sync {
    async fn put(&self, node: Node) -> RepoResult<()>;
    async fn get(&self, node_id: &str) -> RepoResult<Node>;
    async fn list(&self) -> RepoResult<Vec<Node>>;
    async fn remove(&self, node_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait LinkRepo: Send + Sync {
    async fn put(&self, link: Link) -> RepoResult<()>;
    async fn get(&self, a: &str, b: &str) -> RepoResult<Link>;
    async fn list_for(&self, node_id: &str) -> RepoResult<Vec<Link>>;
    async fn remove(&self, a: &str, b: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait LsaRepo: Send + Sync {
    /// Store `lsa` only if it supersedes what's stored for its origin;
    /// returns whether it was accepted.
    async fn offer(&self, lsa: Lsa) -> RepoResult<bool>;
    async fn get(&self, origin: &str) -> RepoResult<Lsa>;
    async fn list(&self) -> RepoResult<Vec<Lsa>>;
}

#[async_trait]
pub trait StreamRepo: Send + Sync {
    async fn put(&self, stream: Stream) -> RepoResult<()>;
    async fn get(&self, stream_id: &str) -> RepoResult<Stream>;
    async fn remove(&self, stream_id: &str) -> RepoResult<()>;
    async fn list(&self) -> RepoResult<Vec<Stream>>;
}

/// Per-member committed_seq cursors, split out from `StreamRepo` since
/// it is updated far more often than the rest of a stream's record.
#[async_trait]
pub trait StreamOffsetRepo: Send + Sync {
    async fn get_committed_seq(&self, stream_id: &str, member: &str) -> RepoResult<u64>;
    async fn advance_committed_seq(&self, stream_id: &str, member: &str, seq: u64) -> RepoResult<()>;
}

/// Durable delivery log backing exactly-once effects (§4.6): even after
/// an inbox dedup TTL expires, this log is still checked.
#[async_trait]
pub trait DeliveryLogRepo: Send + Sync {
    async fn has_delivered(&self, stream_id: &str, msg_id: &str) -> RepoResult<bool>;
    async fn record_delivered(&self, stream_id: &str, msg_id: &str, processed_ts: i64) -> RepoResult<()>;
}

#[async_trait]
pub trait OutboxRepo: Send + Sync {
    async fn put(&self, entry: OutboxEntry) -> RepoResult<()>;
    async fn get(&self, stream_id: &str, msg_id: &str) -> RepoResult<OutboxEntry>;
    async fn list_pending(&self, stream_id: &str) -> RepoResult<Vec<OutboxEntry>>;
    async fn remove(&self, stream_id: &str, msg_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait InboxRepo: Send + Sync {
    async fn put(&self, entry: InboxEntry) -> RepoResult<()>;
    async fn get(&self, stream_id: &str, msg_id: &str) -> RepoResult<Option<InboxEntry>>;
    async fn mark_processed(&self, stream_id: &str, msg_id: &str, processed_ts: i64) -> RepoResult<()>;
}

#[async_trait]
pub trait TopologySnapshotRepo: Send + Sync {
    async fn save_snapshot(&self, version: u64, lsas: Vec<Lsa>) -> RepoResult<()>;
    async fn load_latest(&self) -> RepoResult<Option<(u64, Vec<Lsa>)>>;
}

#[async_trait]
pub trait ConfigKvRepo: Send + Sync {
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;
    async fn put(&self, key: &str, value: String) -> RepoResult<()>;
}

#[async_trait]
pub trait RaftGroupRepo: Send + Sync {
    async fn put(&self, meta: RaftGroupMeta) -> RepoResult<()>;
    async fn get(&self, group_id: &str) -> RepoResult<RaftGroupMeta>;
    async fn remove(&self, group_id: &str) -> RepoResult<()>;
}
