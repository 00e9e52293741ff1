//! The replicated log itself, generic over the entry payload type so both
//! MCG and DSG groups (§4.5) share one Raft core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry<E> {
    pub index: u64,
    pub term: u64,
    pub entry: E,
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log index {0} out of range")]
    OutOfRange(u64),
}

/// The append-only, stable log store (§6 "Required Raft log store").
/// A real backend is durable; `InMemoryLogStore` below is the in-process
/// reference implementation.
#[async_trait]
pub trait LogStore<E: Send + Sync>: Send + Sync {
    async fn append(&self, term: u64, entry: E) -> Result<u64, LogError>;
    async fn get(&self, index: u64) -> Result<Option<LogEntry<E>>, LogError>;
    async fn last_index(&self) -> u64;
    async fn last_term(&self) -> u64;
    /// Truncate the log to drop every entry with index > `index` (used
    /// when a follower's log conflicts with the leader's and must be
    /// rolled back before re-appending).
    async fn truncate_after(&self, index: u64) -> Result<(), LogError>;
    async fn entries_from(&self, index: u64) -> Result<Vec<LogEntry<E>>, LogError>;
}

pub struct InMemoryLogStore<E> {
    entries: tokio::sync::RwLock<Vec<LogEntry<E>>>,
}

impl<E> Default for InMemoryLogStore<E> {
    fn default() -> Self {
        InMemoryLogStore {
            entries: tokio::sync::RwLock::new(Vec::new()),
        }
    }
}

impl<E> InMemoryLogStore<E> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<E: Clone + Send + Sync> LogStore<E> for InMemoryLogStore<E> {
    async fn append(&self, term: u64, entry: E) -> Result<u64, LogError> {
        let mut guard = self.entries.write().await;
        let index = guard.len() as u64 + 1;
        guard.push(LogEntry { index, term, entry });
        Ok(index)
    }

    async fn get(&self, index: u64) -> Result<Option<LogEntry<E>>, LogError> {
        if index == 0 {
            return Ok(None);
        }
        Ok(self.entries.read().await.get(index as usize - 1).cloned())
    }

    async fn last_index(&self) -> u64 {
        self.entries.read().await.len() as u64
    }

    async fn last_term(&self) -> u64 {
        self.entries.read().await.last().map(|e| e.term).unwrap_or(0)
    }

    async fn truncate_after(&self, index: u64) -> Result<(), LogError> {
        let mut guard = self.entries.write().await;
        if (index as usize) < guard.len() {
            guard.truncate(index as usize);
        }
        Ok(())
    }

    async fn entries_from(&self, index: u64) -> Result<Vec<LogEntry<E>>, LogError> {
        let guard = self.entries.read().await;
        let start = index.saturating_sub(1) as usize;
        Ok(guard.get(start..).map(|s| s.to_vec()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_assigns_sequential_indices() {
        let store: InMemoryLogStore<String> = InMemoryLogStore::new();
        let i1 = store.append(1, "a".into()).await.unwrap();
        let i2 = store.append(1, "b".into()).await.unwrap();
        assert_eq!(i1, 1);
        assert_eq!(i2, 2);
        assert_eq!(store.last_index().await, 2);
    }

    #[tokio::test]
    async fn truncate_after_drops_conflicting_suffix() {
        let store: InMemoryLogStore<String> = InMemoryLogStore::new();
        store.append(1, "a".into()).await.unwrap();
        store.append(1, "b".into()).await.unwrap();
        store.append(1, "c".into()).await.unwrap();
        store.truncate_after(1).await.unwrap();
        assert_eq!(store.last_index().await, 1);
        assert!(store.get(2).await.unwrap().is_none());
    }
}
