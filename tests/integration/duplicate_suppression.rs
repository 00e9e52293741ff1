//! §8 scenario S4: a message redelivered after multipath striping (or a
//! retried acknowledgment) must not be delivered to the handler twice.

use mesh_core::model::Chunk;
use mesh_streams::chunker::{chunk_payload, Reassembler};
use mesh_streams::dedup::DedupCache;
use mesh_streams::reorder::ReorderBuffer;

#[test]
fn duplicate_chunked_message_is_reassembled_once_and_deduped_on_redelivery() {
    let mut reassembler = Reassembler::new();
    let mut dedup = DedupCache::new(std::time::Duration::from_secs(60));
    let mut reorder = ReorderBuffer::new(1);

    let chunks = chunk_payload("stream-1", "msg-1", 1, b"hello mesh", 4);
    assert!(chunks.len() > 1, "payload should have been split into multiple chunks");

    let mut payload = None;
    for chunk in chunks.clone() {
        if let Some(complete) = reassembler.accept(chunk).unwrap() {
            payload = Some(complete);
        }
    }
    let payload = payload.expect("all chunks were fed in, message should be complete");

    assert!(!dedup.check_and_insert("stream-1", "msg-1"));
    reorder.offer(1, "msg-1", payload.clone());
    let delivered = reorder.drain_ready();
    assert_eq!(delivered, vec![(1, "msg-1".to_owned(), payload.clone())]);

    // The same chunks arrive again (e.g. a redundant multipath copy).
    let mut redelivered_payload: Option<Vec<u8>> = None;
    for chunk in chunks {
        if let Some(complete) = reassembler.accept(chunk).unwrap() {
            redelivered_payload = Some(complete);
        }
    }
    assert!(redelivered_payload.is_some(), "reassembly itself does not dedup, only the inbox layer does");

    assert!(dedup.check_and_insert("stream-1", "msg-1"), "second sighting of the same (stream, msg) must be a duplicate");

    // A duplicate must not be re-buffered for delivery even if offered again.
    reorder.offer(1, "msg-1", redelivered_payload.unwrap());
    assert!(reorder.drain_ready().is_empty(), "stream_seq below next_expected must be dropped, not redelivered");
}

#[test]
fn corrupted_chunk_is_rejected_before_reaching_the_dedup_layer() {
    let mut reassembler = Reassembler::new();
    let mut chunk = Chunk::new("stream-1", "msg-2", 1, 0, 1, b"payload".to_vec());
    chunk.payload[0] ^= 0xFF;
    let err = reassembler.accept(chunk).unwrap_err();
    assert!(matches!(err, mesh_streams::chunker::ReassemblyError::ChecksumMismatch(_)));
}
