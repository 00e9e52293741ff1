//! The seam between transport and routing (§4.2 "Forwarding"): transport
//! hands a message that isn't addressed to this node to the router,
//! which decides next hops. mesh-topology owns path computation;
//! whatever wires a running node together (`services/node`) implements
//! this trait over a `PathScheduler` plus the link registry.

use mesh_protocol::{Message, NodeId};

/// A forwarding decision: the message should go out over each of these
/// next hops. More than one entry means a multipath dispatch plan (chunk
/// traffic striped across paths); exactly one entry is the common case
/// for control/system/internal-DB traffic, which §4.4 says is never
/// striped.
pub struct ForwardingPlan {
    pub next_hops: Vec<NodeId>,
}

pub trait RouterPort: Send + Sync {
    /// Decide where `message` goes next. An empty plan means "no route",
    /// and the caller should drop the message rather than loop forever
    /// decrementing ttl.
    fn plan_forward(&self, message: &Message) -> ForwardingPlan;
}
