//! Durable persistence seam.
//!
//! The engine is storage-agnostic: everything it persists goes through the
//! [`Store`] trait. [`MemoryStore`] is the reference backend and the one used
//! in tests; a SQL-backed implementation can slot in behind the same trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ledger::PlayerRecord;
use crate::types::{MatchId, MatchRecord, PlayerId};

/// Retryable persistence failure. The caller decides whether to abort the
/// enclosing operation or carry on best-effort.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("storage error: {reason}")]
pub struct StorageError {
    /// Backend-specific failure description.
    pub reason: String,
}

impl StorageError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Durable table-like storage for player and match records.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load a player record, `None` if the player has never been seen.
    async fn load_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StorageError>;

    /// Persist a player record.
    async fn save_player(&self, record: &PlayerRecord) -> Result<(), StorageError>;

    /// Issue the next monotonic match id.
    async fn next_match_id(&self) -> Result<MatchId, StorageError>;

    /// Persist a match record, overwriting any prior version.
    async fn save_match(&self, record: &MatchRecord) -> Result<(), StorageError>;

    /// Load a match record by id.
    async fn load_match(&self, id: MatchId) -> Result<Option<MatchRecord>, StorageError>;
}

/// In-memory [`Store`] backend.
#[derive(Default)]
pub struct MemoryStore {
    players: Mutex<HashMap<PlayerId, PlayerRecord>>,
    matches: Mutex<BTreeMap<MatchId, MatchRecord>>,
    next_match_id: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of match records held, for assertions in tests.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches.lock().len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StorageError> {
        Ok(self.players.lock().get(&id).cloned())
    }

    async fn save_player(&self, record: &PlayerRecord) -> Result<(), StorageError> {
        self.players.lock().insert(record.id, record.clone());
        Ok(())
    }

    async fn next_match_id(&self) -> Result<MatchId, StorageError> {
        let raw = self.next_match_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MatchId::new(raw))
    }

    async fn save_match(&self, record: &MatchRecord) -> Result<(), StorageError> {
        self.matches.lock().insert(record.id, record.clone());
        Ok(())
    }

    async fn load_match(&self, id: MatchId) -> Result<Option<MatchRecord>, StorageError> {
        Ok(self.matches.lock().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn match_ids_are_monotonic() {
        let store = MemoryStore::new();
        let first = store.next_match_id().await.unwrap();
        let second = store.next_match_id().await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn player_round_trip() {
        let store = MemoryStore::new();
        let id = PlayerId::new(42);
        assert!(store.load_player(id).await.unwrap().is_none());

        let record = PlayerRecord::with_defaults(id);
        store.save_player(&record).await.unwrap();
        let loaded = store.load_player(id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.currency, record.currency);
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::new("disk on fire");
        assert!(err.to_string().contains("disk on fire"));
    }
}
