//! Chunking and reassembly (§4.6 publish path steps 2 and 6). Chunking is
//! stateless; reassembly is stateful per `(stream_id, msg_id)` and lives
//! in `Reassembler`.

use std::collections::HashMap;

use mesh_core::model::Chunk;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReassemblyError {
    #[error("chunk checksum mismatch for msg_id {0}")]
    ChecksumMismatch(String),
    #[error("chunk_seq {0} out of range for total_chunks {1}")]
    ChunkSeqOutOfRange(u32, u32),
    #[error("total_chunks disagreement for msg_id {0}")]
    InconsistentTotalChunks(String),
}

/// Split `payload` into size-bounded chunks, each CRC32C-checksummed and
/// tagged with its position (§4.6 step 2).
pub fn chunk_payload(stream_id: &str, msg_id: &str, stream_seq: u64, payload: &[u8], max_chunk_size: usize) -> Vec<Chunk> {
    if payload.is_empty() {
        return vec![Chunk::new(stream_id, msg_id, stream_seq, 0, 1, Vec::new())];
    }
    let total_chunks = payload.len().div_ceil(max_chunk_size) as u32;
    payload
        .chunks(max_chunk_size)
        .enumerate()
        .map(|(i, slice)| Chunk::new(stream_id, msg_id, stream_seq, i as u32, total_chunks, slice.to_vec()))
        .collect()
}

struct PartialMessage {
    stream_seq: u64,
    total_chunks: u32,
    received: HashMap<u32, Vec<u8>>,
}

/// Accumulates chunks per `msg_id` until every `chunk_seq` in
/// `0..total_chunks` has arrived and verified, then yields the
/// reassembled payload.
#[derive(Default)]
pub struct Reassembler {
    partial: HashMap<String, PartialMessage>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk in. Returns `Some(payload)` once the message is
    /// complete, `None` if more chunks are still needed.
    pub fn accept(&mut self, chunk: Chunk) -> Result<Option<Vec<u8>>, ReassemblyError> {
        if !chunk.verify_checksum() {
            return Err(ReassemblyError::ChecksumMismatch(chunk.msg_id));
        }
        if chunk.chunk_seq >= chunk.total_chunks {
            return Err(ReassemblyError::ChunkSeqOutOfRange(chunk.chunk_seq, chunk.total_chunks));
        }

        let entry = self.partial.entry(chunk.msg_id.clone()).or_insert_with(|| PartialMessage {
            stream_seq: chunk.stream_seq,
            total_chunks: chunk.total_chunks,
            received: HashMap::new(),
        });
        if entry.total_chunks != chunk.total_chunks {
            return Err(ReassemblyError::InconsistentTotalChunks(chunk.msg_id.clone()));
        }
        entry.received.insert(chunk.chunk_seq, chunk.payload);

        if entry.received.len() as u32 == entry.total_chunks {
            let total_chunks = entry.total_chunks;
            let mut assembled = Vec::new();
            for i in 0..total_chunks {
                if let Some(part) = entry.received.get(&i) {
                    assembled.extend_from_slice(part);
                }
            }
            self.partial.remove(&chunk.msg_id);
            Ok(Some(assembled))
        } else {
            Ok(None)
        }
    }

    pub fn pending_message_count(&self) -> usize {
        self.partial.len()
    }
}
