use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Processed,
    Failed,
}

/// A source-side outbox entry (§3). Retained until every required
/// recipient's processed-ack has committed to the owning DSG; pruned on
/// commit advance (§4.6 step 7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub stream_id: String,
    pub msg_id: String,
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
    pub next_attempt: i64,
    pub attempts: u32,
    pub status: OutboxStatus,
}

impl OutboxEntry {
    pub fn new(stream_id: impl Into<String>, msg_id: impl Into<String>, payload: Vec<u8>) -> Self {
        OutboxEntry {
            stream_id: stream_id.into(),
            msg_id: msg_id.into(),
            payload,
            headers: HashMap::new(),
            next_attempt: 0,
            attempts: 0,
            status: OutboxStatus::Pending,
        }
    }
}

/// A target-side inbox entry (§3). Unique per `(stream_id, msg_id)`;
/// duplicates are discarded on arrival, and `processed_ts` is set only
/// once the handler has actually succeeded, never on receipt alone
/// (§9 "two-phase processed").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub stream_id: String,
    pub msg_id: String,
    pub payload: Vec<u8>,
    pub received_ts: i64,
    pub processed_ts: Option<i64>,
}

impl InboxEntry {
    pub fn new(stream_id: impl Into<String>, msg_id: impl Into<String>, payload: Vec<u8>, received_ts: i64) -> Self {
        InboxEntry {
            stream_id: stream_id.into(),
            msg_id: msg_id.into(),
            payload,
            received_ts,
            processed_ts: None,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.processed_ts.is_some()
    }
}
