//! Header and payload validation (§4.1, §7 error kinds).

use crate::ratelimit::TokenBucketLimiter;
use crate::{Header, Message, MessageType, Priority};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),
    #[error("message expired")]
    Expired,
    #[error("unknown message type")]
    UnknownType,
    #[error("invalid or missing sub_type payload for this message type")]
    InvalidSubType,
    #[error("sender exceeded its rate limit")]
    RateLimited,
}

/// Stateful validator: owns the rate limiter so repeated calls against the
/// same sender share its bucket.
pub struct Validator {
    limiter: TokenBucketLimiter,
}

impl Default for Validator {
    fn default() -> Self {
        Validator {
            limiter: TokenBucketLimiter::with_defaults(),
        }
    }
}

impl Validator {
    pub fn new(limiter: TokenBucketLimiter) -> Self {
        Validator { limiter }
    }

    /// Validate a header in isolation (version/id/from/priority/timestamp and
    /// expiry), without touching the rate limiter.
    pub fn validate_header(header: &Header, now_unix_s: i64) -> Result<(), ValidationError> {
        if header.version.is_empty() {
            return Err(ValidationError::MalformedHeader("version is empty"));
        }
        if header.id.is_empty() {
            return Err(ValidationError::MalformedHeader("id is empty"));
        }
        if header.from.is_empty() {
            return Err(ValidationError::MalformedHeader("from is empty"));
        }
        if header.timestamp_ns <= 0 {
            return Err(ValidationError::MalformedHeader("timestamp_ns must be positive"));
        }
        if header.is_expired(now_unix_s) {
            return Err(ValidationError::Expired);
        }
        Ok(())
    }

    /// Validate a full message: header, then type-specific payload shape,
    /// then the sender's rate limit. `term == 0` is a legitimate consensus
    /// term and is not treated as malformed.
    pub fn validate(&mut self, message: &Message, now_unix_s: i64) -> Result<(), ValidationError> {
        Self::validate_header(&message.header, now_unix_s)?;
        Self::validate_payload_shape(&message.header, &message.payload)?;
        self.limiter
            .check(&message.header.from)
            .map_err(|_| ValidationError::RateLimited)
    }

    fn validate_payload_shape(header: &Header, payload: &[u8]) -> Result<(), ValidationError> {
        match header.kind {
            MessageType::Heartbeat | MessageType::Data => Ok(()),
            MessageType::Routing => {
                serde_json::from_slice::<crate::RoutingPayload>(payload).map_err(|_| ValidationError::InvalidSubType)?;
                Ok(())
            }
            MessageType::Consensus => {
                let parsed: crate::ConsensusPayload =
                    serde_json::from_slice(payload).map_err(|_| ValidationError::InvalidSubType)?;
                Self::validate_consensus_sub_type(&parsed)
            }
            MessageType::Management => {
                let parsed: crate::ManagementPayload =
                    serde_json::from_slice(payload).map_err(|_| ValidationError::InvalidSubType)?;
                Self::validate_management_sub_type(&parsed)
            }
        }
    }

    /// `sub_type` and `data` are deserialized independently (`data` is
    /// `#[serde(untagged)]`), so a frame whose `sub_type` disagrees with
    /// the shape its `data` actually parsed as must be rejected explicitly.
    /// `Heartbeat` carries the same shape as `AppendEntries` (an empty
    /// `entries` list), matching how `handle_consensus` treats them.
    fn validate_consensus_sub_type(payload: &crate::ConsensusPayload) -> Result<(), ValidationError> {
        use crate::payload::ConsensusData;
        use crate::ConsensusSubType;
        match (payload.sub_type, &payload.data) {
            (ConsensusSubType::RequestVote, ConsensusData::RequestVote { .. }) => Ok(()),
            (ConsensusSubType::AppendEntries, ConsensusData::AppendEntries { .. }) => Ok(()),
            (ConsensusSubType::Heartbeat, ConsensusData::AppendEntries { .. }) => Ok(()),
            (ConsensusSubType::ConfigChange, ConsensusData::ConfigChange { .. }) => Ok(()),
            _ => Err(ValidationError::InvalidSubType),
        }
    }

    /// Same cross-check for management payloads, plus §4.1's requirement
    /// that a `topology_update` adding or updating a node must carry an
    /// `address` (only `remove` may omit one).
    fn validate_management_sub_type(payload: &crate::ManagementPayload) -> Result<(), ValidationError> {
        use crate::payload::{ManagementData, TopologyAction};
        use crate::ManagementSubType;
        match (payload.sub_type, &payload.data) {
            (ManagementSubType::NodeDiscovery, ManagementData::NodeDiscovery { .. }) => Ok(()),
            (ManagementSubType::ConnectionManagement, ManagementData::ConnectionManagement { .. }) => Ok(()),
            (ManagementSubType::TopologyUpdate, ManagementData::TopologyUpdate { action, address, .. }) => {
                match (action, address) {
                    (TopologyAction::Add | TopologyAction::Update, None) => Err(ValidationError::InvalidSubType),
                    _ => Ok(()),
                }
            }
            (ManagementSubType::HealthStatus, ManagementData::HealthStatus { .. }) => Ok(()),
            _ => Err(ValidationError::InvalidSubType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ManagementData, TopologyAction};
    use crate::{new_message_id, ConsensusData, ConsensusPayload, ConsensusSubType, ManagementPayload, ManagementSubType, PROTOCOL_VERSION};

    fn header(kind: MessageType) -> Header {
        Header {
            version: PROTOCOL_VERSION.to_owned(),
            id: new_message_id(),
            kind,
            from: "node-a".to_owned(),
            to: "node-b".to_owned(),
            priority: Priority::Normal,
            timestamp_ns: 1_700_000_000_000_000_000,
            ttl_s: 30,
            sequence: 0,
        }
    }

    #[test]
    fn rejects_empty_from() {
        let mut h = header(MessageType::Heartbeat);
        h.from = String::new();
        let err = Validator::validate_header(&h, 1_700_000_010).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedHeader(_)));
    }

    #[test]
    fn rejects_expired_message() {
        let h = header(MessageType::Heartbeat);
        let far_future = h.timestamp_ns / 1_000_000_000 + 1000;
        let err = Validator::validate_header(&h, far_future).unwrap_err();
        assert_eq!(err, ValidationError::Expired);
    }

    #[test]
    fn term_zero_is_accepted_as_a_legitimate_initial_term() {
        let payload = ConsensusPayload {
            sub_type: ConsensusSubType::RequestVote,
            term: 0,
            data: ConsensusData::RequestVote {
                term: 0,
                candidate_id: "node-a".to_owned(),
                last_log_index: 0,
                last_log_term: 0,
            },
        };
        let bytes = serde_json::to_vec(&payload).unwrap();
        let h = header(MessageType::Consensus);
        let msg = Message::new(h, bytes);
        let mut validator = Validator::default();
        assert!(validator.validate(&msg, 1_700_000_010).is_ok());
    }

    #[test]
    fn malformed_consensus_payload_is_rejected() {
        let h = header(MessageType::Consensus);
        let msg = Message::new(h, b"not json".to_vec());
        let mut validator = Validator::default();
        let err = validator.validate(&msg, 1_700_000_010).unwrap_err();
        assert_eq!(err, ValidationError::InvalidSubType);
    }

    #[test]
    fn topology_update_add_without_address_is_rejected() {
        let payload = ManagementPayload {
            sub_type: ManagementSubType::TopologyUpdate,
            data: ManagementData::TopologyUpdate {
                action: TopologyAction::Add,
                node_id: "node-a".to_owned(),
                address: None,
                neighbors: Vec::new(),
            },
        };
        let bytes = serde_json::to_vec(&payload).unwrap();
        let h = header(MessageType::Management);
        let msg = Message::new(h, bytes);
        let mut validator = Validator::default();
        let err = validator.validate(&msg, 1_700_000_010).unwrap_err();
        assert_eq!(err, ValidationError::InvalidSubType);
    }

    #[test]
    fn topology_update_remove_without_address_is_accepted() {
        let payload = ManagementPayload {
            sub_type: ManagementSubType::TopologyUpdate,
            data: ManagementData::TopologyUpdate {
                action: TopologyAction::Remove,
                node_id: "node-a".to_owned(),
                address: None,
                neighbors: Vec::new(),
            },
        };
        let bytes = serde_json::to_vec(&payload).unwrap();
        let h = header(MessageType::Management);
        let msg = Message::new(h, bytes);
        let mut validator = Validator::default();
        assert!(validator.validate(&msg, 1_700_000_010).is_ok());
    }

    #[test]
    fn sub_type_disagreeing_with_data_shape_is_rejected() {
        let payload = ConsensusPayload {
            sub_type: ConsensusSubType::RequestVote,
            term: 0,
            data: ConsensusData::ConfigChange {
                term: 0,
                change_type: crate::payload::ConfigChangeType::Add,
                node_id: "node-a".to_owned(),
                address: Some("10.0.0.1:7000".to_owned()),
            },
        };
        let bytes = serde_json::to_vec(&payload).unwrap();
        let h = header(MessageType::Consensus);
        let msg = Message::new(h, bytes);
        let mut validator = Validator::default();
        let err = validator.validate(&msg, 1_700_000_010).unwrap_err();
        assert_eq!(err, ValidationError::InvalidSubType);
    }

    #[test]
    fn rate_limit_is_enforced_per_sender() {
        let mut validator = Validator::new(TokenBucketLimiter::new(1.0, 0.0));
        let h = header(MessageType::Heartbeat);
        let msg = Message::new(h.clone(), Vec::new());
        assert!(validator.validate(&msg, 1_700_000_010).is_ok());
        let err = validator.validate(&msg, 1_700_000_010).unwrap_err();
        assert_eq!(err, ValidationError::RateLimited);
    }
}
