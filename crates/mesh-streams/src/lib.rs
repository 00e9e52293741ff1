//! mesh-streams: chunking/reassembly, per-stream ordering, inbox dedup,
//! and the source-side outbox/backpressure state (§4.6).

pub mod chunker;
pub mod dedup;
pub mod handler;
pub mod reorder;
pub mod stream_manager;

pub use chunker::{chunk_payload, Reassembler, ReassemblyError};
pub use dedup::DedupCache;
pub use handler::{HandlerError, HandlerPort};
pub use reorder::ReorderBuffer;
pub use stream_manager::{PublishError, StreamManagerConfig, StreamPublisher};
