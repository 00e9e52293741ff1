//! In-memory reference implementations of the persistence ports. These are
//! what single-process tests and a standalone node run against; a real
//! deployment swaps them for durable adapters behind the same traits.

mod config_kv;
mod delivery_log;
mod inbox;
mod link;
mod lsa;
mod node;
mod outbox;
mod raft_group;
mod stream;
mod stream_offset;
mod topology_snapshot;

pub use config_kv::InMemoryConfigKvRepo;
pub use delivery_log::InMemoryDeliveryLogRepo;
pub use inbox::InMemoryInboxRepo;
pub use link::InMemoryLinkRepo;
pub use lsa::InMemoryLsaRepo;
pub use node::InMemoryNodeRepo;
pub use outbox::InMemoryOutboxRepo;
pub use raft_group::InMemoryRaftGroupRepo;
pub use stream::InMemoryStreamRepo;
pub use stream_offset::InMemoryStreamOffsetRepo;
pub use topology_snapshot::InMemoryTopologySnapshotRepo;
