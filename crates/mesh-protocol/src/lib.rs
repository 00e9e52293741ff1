//! mesh-protocol: wire message types, framing, validation, and rate limiting
//! for the mesh overlay.
//!
//! Every message on the wire is a header plus an opaque payload. The header
//! carries the routing and lifecycle metadata (§4.1 of the spec); the
//! payload's schema is determined by `MessageType` and, for structured
//! types, a `sub_type` field carried inside the payload itself.
//!
//! This crate only knows about the wire format. It does not know how to
//! open a socket (`mesh-transport`), how to route a message (`mesh-topology`),
//! or what a consensus log entry means (`mesh-consensus`) — those crates
//! build on top of the types here.

pub mod framer;
pub mod payload;
pub mod ratelimit;
pub mod validate;

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

pub use framer::Framer;
pub use payload::{ConsensusData, ConsensusPayload, ConsensusSubType, ManagementPayload, ManagementSubType, RoutingPayload, RoutingSubType};
pub use ratelimit::{RateLimitError, TokenBucket, TokenBucketLimiter};
pub use validate::{ValidationError, Validator};

/// Current protocol version. Bumped only on a breaking wire change.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Message priority. Ordered low < normal < high < urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

/// Top-level message type. Determines how `payload` must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Heartbeat,
    Data,
    Routing,
    Consensus,
    Management,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::Heartbeat => "heartbeat",
            MessageType::Data => "data",
            MessageType::Routing => "routing",
            MessageType::Consensus => "consensus",
            MessageType::Management => "management",
        };
        f.write_str(s)
    }
}

/// A node identifier. Opaque outside this crate; carried as a string on the
/// wire (mesh-core attaches the richer `Node` entity).
pub type NodeId = String;

/// The wire header. Field names are lower-snake-case on the wire, matching
/// §4.1/§6 of the spec exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub from: NodeId,
    /// Empty string means broadcast.
    #[serde(default)]
    pub to: NodeId,
    pub priority: Priority,
    pub timestamp_ns: i64,
    /// Seconds. 0 means non-expiring.
    pub ttl_s: u32,
    pub sequence: u64,
}

impl Header {
    pub fn is_broadcast(&self) -> bool {
        self.to.is_empty()
    }

    /// True if the header's `ttl_s` has elapsed relative to `now_unix_s`.
    pub fn is_expired(&self, now_unix_s: i64) -> bool {
        if self.ttl_s == 0 {
            return false;
        }
        let timestamp_unix_s = self.timestamp_ns / 1_000_000_000;
        now_unix_s > timestamp_unix_s + i64::from(self.ttl_s)
    }
}

/// A length-prefixed `{header, payload}` record. `payload` is opaque bytes
/// whose schema is determined by `header.kind` (and, for structured types,
/// a `sub_type` field within the deserialized payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,
    #[serde(with = "payload_bytes")]
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(header: Header, payload: Vec<u8>) -> Self {
        Message { header, payload }
    }

    /// Serialize to the wire's length-prefixed JSON form: a 4-byte big-endian
    /// length prefix followed by the JSON object.
    pub fn to_frame(&self) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        let mut out = Vec::with_capacity(4 + json.len());
        out.extend_from_slice(&(json.len() as u32).to_be_bytes());
        out.extend_from_slice(&json);
        Ok(out)
    }

    /// Parse a length-prefixed frame previously produced by `to_frame`.
    pub fn from_frame(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 4 {
            return Err(FrameError::Truncated);
        }
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let body = bytes.get(4..4 + len).ok_or(FrameError::Truncated)?;
        serde_json::from_slice(body).map_err(FrameError::Json)
    }
}

/// Payload is stored as raw bytes internally, but serializes to/from a JSON
/// base64 string on the wire (so a `data` message's arbitrary bytes and a
/// structured control payload share one field).
mod payload_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        base64::engine::general_purpose::STANDARD
            .encode(bytes)
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame truncated")]
    Truncated,
    #[error("JSON error: {0}")]
    Json(serde_json::Error),
}

/// Generate a fresh message id: a ULID, which is lexically sortable and
/// embeds a millisecond timestamp. Rendered as its canonical Crockford
/// base32 string form on the wire.
pub fn new_message_id() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: PROTOCOL_VERSION.to_owned(),
            id: new_message_id(),
            kind: MessageType::Data,
            from: "node-a".to_owned(),
            to: "node-b".to_owned(),
            priority: Priority::Normal,
            timestamp_ns: 1_700_000_000_000_000_000,
            ttl_s: 30,
            sequence: 1,
        }
    }

    #[test]
    fn message_id_is_a_valid_ulid() {
        let id = new_message_id();
        assert_eq!(id.len(), 26);
        assert!(Ulid::from_string(&id).is_ok());
    }

    #[test]
    fn frame_roundtrips_through_length_prefix() {
        let msg = Message::new(sample_header(), b"hello".to_vec());
        let frame = msg.to_frame().unwrap();
        let parsed = Message::from_frame(&frame).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn from_frame_rejects_truncated_input() {
        assert!(matches!(Message::from_frame(&[0, 0, 0, 5]), Err(FrameError::Truncated)));
        assert!(matches!(Message::from_frame(&[0, 0]), Err(FrameError::Truncated)));
    }

    #[test]
    fn header_broadcast_is_empty_to() {
        let mut h = sample_header();
        assert!(!h.is_broadcast());
        h.to = String::new();
        assert!(h.is_broadcast());
    }

    #[test]
    fn header_expiry_respects_zero_ttl_as_non_expiring() {
        let mut h = sample_header();
        h.ttl_s = 0;
        assert!(!h.is_expired(i64::MAX / 1_000_000_000));
    }

    #[test]
    fn header_expiry_triggers_after_ttl_elapses() {
        let mut h = sample_header();
        h.timestamp_ns = 0;
        h.ttl_s = 30;
        assert!(!h.is_expired(29));
        assert!(h.is_expired(31));
    }
}
