//! mesh-transport: the WebSocket link layer. Owns per-link send queues,
//! reconnect backoff, the link registry, and the read/write loop that
//! glues validated wire frames to whatever forwards or delivers them
//! locally. Knows nothing about routing decisions or node lifecycle —
//! those live in `mesh-topology` and `services/node` respectively.

pub mod backoff;
pub mod dialer;
pub mod heartbeat;
pub mod io;
pub mod link;
pub mod listener;
pub mod queue;
pub mod router_port;

pub use backoff::{Backoff, BackoffPolicy};
pub use heartbeat::build_heartbeat_frame;
pub use io::{run_link_loop, FrameSink, FrameStream, LinkLoopConfig, TransportError};
pub use link::{LinkRegistry, SendError};
pub use queue::{EnqueueError, PriorityQueue, PriorityQueueSender};
pub use router_port::{ForwardingPlan, RouterPort};
