//! mesh-membership: SWIM-like gossip failure detection (§4.3). Produces
//! membership state transitions and a piggyback-ready gossip buffer;
//! mesh-transport owns the actual probe scheduling and socket I/O.

pub mod gossip;
pub mod swim;

pub use gossip::{GossipBuffer, GossipEvent};
pub use swim::{MemberRecord, MemberState, SuspicionOutcome, SwimConfig, SwimDetector};
