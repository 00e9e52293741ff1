use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosClass {
    System,
    Priority,
    Bulk,
}

/// A client-data stream (§3, §4.6). `committed_seq` tracks, per member,
/// the highest `stream_seq` known to have been processed — it only ever
/// moves forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub stream_id: String,
    pub tenant_id: String,
    pub src: String,
    pub dst_set: Vec<String>,
    pub qos: QosClass,
    pub priority: u8,
    pub committed_seq: HashMap<String, u64>,
}

impl Stream {
    pub fn new(
        stream_id: impl Into<String>,
        tenant_id: impl Into<String>,
        src: impl Into<String>,
        dst_set: Vec<String>,
        qos: QosClass,
        priority: u8,
    ) -> Self {
        let src = src.into();
        let mut committed_seq = HashMap::new();
        committed_seq.insert(src.clone(), 0);
        for dst in &dst_set {
            committed_seq.insert(dst.clone(), 0);
        }
        Stream {
            stream_id: stream_id.into(),
            tenant_id: tenant_id.into(),
            src,
            dst_set,
            qos,
            priority,
            committed_seq,
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.src.as_str()).chain(self.dst_set.iter().map(String::as_str))
    }

    /// Advance a member's committed_seq, refusing to move it backward.
    pub fn advance_committed(&mut self, member: &str, seq: u64) {
        let entry = self.committed_seq.entry(member.to_owned()).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_seq_never_moves_backward() {
        let mut stream = Stream::new("s1", "tenant-1", "a", vec!["b".into()], QosClass::Bulk, 0);
        stream.advance_committed("b", 5);
        stream.advance_committed("b", 3);
        assert_eq!(stream.committed_seq["b"], 5);
        stream.advance_committed("b", 9);
        assert_eq!(stream.committed_seq["b"], 9);
    }
}
