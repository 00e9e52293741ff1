use serde::{Deserialize, Serialize};

/// A fragment of a stream message (§3, §4.6). All chunks sharing `msg_id`
/// also share `total_chunks`; reassembly at the target waits until every
/// `chunk_seq` in `0..total_chunks` has arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub stream_id: String,
    pub msg_id: String,
    pub stream_seq: u64,
    pub chunk_seq: u32,
    pub total_chunks: u32,
    pub checksum: u32,
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn new(
        stream_id: impl Into<String>,
        msg_id: impl Into<String>,
        stream_seq: u64,
        chunk_seq: u32,
        total_chunks: u32,
        payload: Vec<u8>,
    ) -> Self {
        let checksum = crc32c::crc32c(&payload);
        Chunk {
            stream_id: stream_id.into(),
            msg_id: msg_id.into(),
            stream_seq,
            chunk_seq,
            total_chunks,
            checksum,
            payload,
        }
    }

    pub fn verify_checksum(&self) -> bool {
        crc32c::crc32c(&self.payload) == self.checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_verifies_unmodified_payload() {
        let chunk = Chunk::new("s1", "01HX", 1, 0, 1, b"hello".to_vec());
        assert!(chunk.verify_checksum());
    }

    #[test]
    fn checksum_fails_on_corrupted_payload() {
        let mut chunk = Chunk::new("s1", "01HX", 1, 0, 1, b"hello".to_vec());
        chunk.payload[0] ^= 0xFF;
        assert!(!chunk.verify_checksum());
    }
}
