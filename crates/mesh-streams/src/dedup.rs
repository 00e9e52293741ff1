//! Fast-path inbox deduplication (§4.6 step 6: "inbox dedup
//! `(stream_id, msg_id)` Redis TTL + durable delivery log"). This cache
//! is the TTL layer; `mesh_core::ports::DeliveryLogRepo` is the durable
//! layer checked when an entry has already aged out of this cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct DedupCache {
    ttl: Option<Duration>,
    seen: HashMap<(String, String), Instant>,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        DedupCache {
            ttl: Some(ttl),
            seen: HashMap::new(),
        }
    }

    /// Record `(stream_id, msg_id)` as seen and report whether it was
    /// already present (a hit means "duplicate", per §8 scenario S4).
    pub fn check_and_insert(&mut self, stream_id: &str, msg_id: &str) -> bool {
        self.evict_expired();
        let key = (stream_id.to_owned(), msg_id.to_owned());
        let is_duplicate = self.seen.contains_key(&key);
        self.seen.insert(key, Instant::now());
        is_duplicate
    }

    fn evict_expired(&mut self) {
        let Some(ttl) = self.ttl else { return };
        self.seen.retain(|_, inserted_at| inserted_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_key_is_reported_as_duplicate() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        assert!(!cache.check_and_insert("s1", "m1"));
        assert!(cache.check_and_insert("s1", "m1"));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = DedupCache::new(Duration::from_millis(0));
        cache.check_and_insert("s1", "m1");
        std::thread::sleep(Duration::from_millis(2));
        assert!(!cache.check_and_insert("s1", "m1"));
    }
}
