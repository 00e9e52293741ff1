//! Heartbeat frame construction (§4.2: "every established link exchanges
//! heartbeats on a fixed interval independent of application traffic").
//! A missed/failed heartbeat write is what `run_link_loop` treats as link
//! death; this module only builds the frame, it doesn't schedule it.

use mesh_protocol::{Framer, Message, MessageType, Priority};

pub fn build_heartbeat_frame(framer: &Framer, to: &str) -> Vec<u8> {
    let header = framer.header(MessageType::Heartbeat, to, Priority::Low, 0);
    let message = Message::new(header, Vec::new());
    message.to_frame().expect("heartbeat payload is always serializable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_protocol::MessageType as Mt;

    #[test]
    fn heartbeat_frame_roundtrips_as_a_heartbeat_message() {
        let framer = Framer::new("node-a");
        let frame = build_heartbeat_frame(&framer, "node-b");
        let parsed = Message::from_frame(&frame).unwrap();
        assert_eq!(parsed.header.kind, Mt::Heartbeat);
        assert_eq!(parsed.header.to, "node-b");
    }
}
