//! Mesh-wide fanout: push one management frame to every currently linked
//! peer. Adapted from this codebase's consumer-fanout shape (push one
//! payload to every currently-subscribed consumer) — here the
//! "consumers" are the node's live links, addressed through the link
//! registry rather than a broadcast channel, since each link has its
//! own priority-ordered send queue and credit state.

use mesh_protocol::{ManagementPayload, MessageType, Priority};
use tracing::warn;

use crate::state::AppState;

/// Frames `payload` as a `Management` message and enqueues it on every
/// connected link. A link whose queue is full or closed is skipped and
/// logged; fanout never blocks on a slow peer.
pub fn fanout_management(state: &AppState, payload: ManagementPayload) {
    let Ok(body) = serde_json::to_vec(&payload) else {
        warn!("failed to serialize management payload for fanout");
        return;
    };

    for peer_id in state.link_registry.connected_peers() {
        let header = state.framer.header(MessageType::Management, peer_id.clone(), Priority::Normal, 30);
        let message = mesh_protocol::Message::new(header, body.clone());
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(peer = %peer_id, error = %err, "failed to frame management fanout message");
                continue;
            }
        };
        if let Err(err) = state.link_registry.send_to(&peer_id, Priority::Normal, frame) {
            warn!(peer = %peer_id, error = %err, "dropping fanout message, link unavailable");
        }
    }
}
