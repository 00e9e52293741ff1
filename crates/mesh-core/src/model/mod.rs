//! Entity types from the data model: the things the mesh persists and
//! reasons about, independent of wire representation (that's
//! `mesh-protocol`) and independent of any particular storage backend
//! (that's `crate::ports` and `crate::memory`).

mod chunk;
mod link;
mod lsa;
mod mesh;
mod node;
mod outbox;
mod path;
mod raft_group;
mod stream;

pub use chunk::Chunk;
pub use link::{Link, LinkMetrics, LinkState};
pub use lsa::{Adjacency, Lsa};
pub use mesh::{JoinPolicy, Mesh, MeshStatus};
pub use node::{Node, NodeState};
pub use outbox::{InboxEntry, OutboxEntry, OutboxStatus};
pub use path::Path;
pub use raft_group::{GroupId, GroupType, RaftGroupMeta};
pub use stream::{QosClass, Stream};
