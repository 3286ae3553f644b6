//! Player Ledger - durable per-player points, currency, and win/loss record.
//!
//! `apply_delta` is the only mutator. Calls for the same player are serialized
//! through a per-player lock so concurrent additive deltas never lose updates;
//! calls for different players run concurrently. A debit that would take
//! currency negative is rejected atomically, before any other effect.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{StorageError, Store};
use crate::types::PlayerId;

/// Currency granted to a player on first reference.
pub const STARTING_CURRENCY: u32 = 1000;

/// Durable per-player record. Created lazily, never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub points: u32,
    pub currency: u32,
    pub wins: u32,
    pub losses: u32,
    pub banned: bool,
}

impl PlayerRecord {
    /// A fresh record with the documented defaults.
    #[must_use]
    pub fn with_defaults(id: PlayerId) -> Self {
        Self {
            id,
            points: 0,
            currency: STARTING_CURRENCY,
            wins: 0,
            losses: 0,
            banned: false,
        }
    }
}

/// Additive change applied to a player record in one atomic step.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub points: i64,
    pub currency: i64,
    pub wins: u32,
    pub losses: u32,
    /// `Some` overwrites the ban flag; `None` leaves it untouched.
    pub ban: Option<bool>,
}

impl LedgerDelta {
    /// Delta for a winning-side member: points, win bonus, one win.
    #[must_use]
    pub fn win(points: u32, currency: u32) -> Self {
        Self {
            points: i64::from(points),
            currency: i64::from(currency),
            wins: 1,
            ..Self::default()
        }
    }

    /// Delta for a losing-side member: one loss, nothing else.
    #[must_use]
    pub fn loss() -> Self {
        Self {
            losses: 1,
            ..Self::default()
        }
    }

    /// Pure currency credit.
    #[must_use]
    pub fn credit(amount: u32) -> Self {
        Self {
            currency: i64::from(amount),
            ..Self::default()
        }
    }

    /// Pure currency debit.
    #[must_use]
    pub fn debit(amount: u32) -> Self {
        Self {
            currency: -i64::from(amount),
            ..Self::default()
        }
    }

    /// Ban or unban without touching counters.
    #[must_use]
    pub fn set_ban(banned: bool) -> Self {
        Self {
            ban: Some(banned),
            ..Self::default()
        }
    }
}

/// Errors from ledger operations.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum LedgerError {
    /// The delta would take currency negative; nothing was applied.
    #[error("insufficient currency: balance {balance}, debit {debit}")]
    InsufficientCurrency { balance: u32, debit: u32 },
    /// Retryable persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

type PlayerLock = Arc<tokio::sync::Mutex<()>>;

/// The ledger service. Cheap to clone via `Arc`.
pub struct PlayerLedger {
    store: Arc<dyn Store>,
    /// Per-player locks, created on first use. The map lock is never held
    /// across an await; only the per-player lock spans the read-modify-write.
    locks: parking_lot::Mutex<HashMap<PlayerId, PlayerLock>>,
}

impl PlayerLedger {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: PlayerId) -> PlayerLock {
        let mut locks = self.locks.lock();
        locks.entry(id).or_default().clone()
    }

    /// Fetch a player record, materializing and persisting the default record
    /// on first reference.
    pub async fn get(&self, id: PlayerId) -> Result<PlayerRecord, LedgerError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.load_or_create(id).await
    }

    /// Whether the player is banned. Pure ledger read.
    pub async fn is_banned(&self, id: PlayerId) -> Result<bool, LedgerError> {
        Ok(self.get(id).await?.banned)
    }

    /// Apply an additive delta atomically and return the updated record.
    ///
    /// Rejects with [`LedgerError::InsufficientCurrency`], with no partial
    /// effect, if the resulting currency would be negative.
    pub async fn apply_delta(
        &self,
        id: PlayerId,
        delta: LedgerDelta,
    ) -> Result<PlayerRecord, LedgerError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut record = self.load_or_create(id).await?;

        let currency = i64::from(record.currency) + delta.currency;
        if currency < 0 {
            return Err(LedgerError::InsufficientCurrency {
                balance: record.currency,
                debit: delta.currency.unsigned_abs() as u32,
            });
        }

        // Saturate at the counter bound instead of wrapping.
        record.currency = u32::try_from(currency).unwrap_or(u32::MAX);
        record.points =
            u32::try_from((i64::from(record.points) + delta.points).max(0)).unwrap_or(u32::MAX);
        record.wins += delta.wins;
        record.losses += delta.losses;
        if let Some(banned) = delta.ban {
            record.banned = banned;
        }

        self.store.save_player(&record).await?;
        Ok(record)
    }

    /// Debit currency if and only if the balance covers it.
    ///
    /// Returns `false`, leaving the record untouched, on insufficient balance.
    pub async fn try_debit(&self, id: PlayerId, amount: u32) -> Result<bool, LedgerError> {
        match self.apply_delta(id, LedgerDelta::debit(amount)).await {
            Ok(_) => Ok(true),
            Err(LedgerError::InsufficientCurrency { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn load_or_create(&self, id: PlayerId) -> Result<PlayerRecord, LedgerError> {
        if let Some(record) = self.store.load_player(id).await? {
            return Ok(record);
        }
        let record = PlayerRecord::with_defaults(id);
        self.store.save_player(&record).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> PlayerLedger {
        PlayerLedger::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn first_reference_materializes_defaults() {
        let ledger = ledger();
        let record = ledger.get(PlayerId::new(1)).await.unwrap();
        assert_eq!(record.points, 0);
        assert_eq!(record.currency, STARTING_CURRENCY);
        assert_eq!(record.wins, 0);
        assert_eq!(record.losses, 0);
        assert!(!record.banned);
    }

    #[tokio::test]
    async fn win_delta_updates_only_expected_fields() {
        let ledger = ledger();
        let id = PlayerId::new(2);
        let record = ledger
            .apply_delta(id, LedgerDelta::win(150, 250))
            .await
            .unwrap();
        assert_eq!(record.points, 150);
        assert_eq!(record.currency, STARTING_CURRENCY + 250);
        assert_eq!(record.wins, 1);
        assert_eq!(record.losses, 0);
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_partial_effect() {
        let ledger = ledger();
        let id = PlayerId::new(3);
        ledger.get(id).await.unwrap();

        let delta = LedgerDelta {
            points: 100,
            currency: -1500,
            wins: 1,
            ..LedgerDelta::default()
        };
        let err = ledger.apply_delta(id, delta).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientCurrency {
                balance: 1000,
                debit: 1500
            }
        ));

        // No partial effect: the record is exactly as it started.
        let record = ledger.get(id).await.unwrap();
        assert_eq!(record.currency, 1000);
        assert_eq!(record.points, 0);
        assert_eq!(record.wins, 0);
    }

    #[tokio::test]
    async fn try_debit_insufficient_balance() {
        let ledger = ledger();
        let id = PlayerId::new(4);
        assert!(!ledger.try_debit(id, 1500).await.unwrap());
        assert_eq!(ledger.get(id).await.unwrap().currency, 1000);

        assert!(ledger.try_debit(id, 400).await.unwrap());
        assert_eq!(ledger.get(id).await.unwrap().currency, 600);
    }

    #[tokio::test]
    async fn ban_flag_set_and_cleared() {
        let ledger = ledger();
        let id = PlayerId::new(5);
        let record = ledger.apply_delta(id, LedgerDelta::set_ban(true)).await.unwrap();
        assert!(record.banned);
        assert!(ledger.is_banned(id).await.unwrap());

        let record = ledger.apply_delta(id, LedgerDelta::set_ban(false)).await.unwrap();
        assert!(!record.banned);
    }

    #[tokio::test]
    async fn concurrent_deltas_for_same_player_all_land() {
        let ledger = Arc::new(ledger());
        let id = PlayerId::new(6);
        ledger.get(id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.apply_delta(id, LedgerDelta::credit(10)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = ledger.get(id).await.unwrap();
        assert_eq!(record.currency, STARTING_CURRENCY + 100);
    }

    #[tokio::test]
    async fn counters_saturate_instead_of_wrapping() {
        let ledger = ledger();
        let id = PlayerId::new(8);
        ledger
            .apply_delta(id, LedgerDelta::credit(u32::MAX))
            .await
            .unwrap();

        let record = ledger
            .apply_delta(id, LedgerDelta::win(u32::MAX, u32::MAX))
            .await
            .unwrap();
        assert_eq!(record.currency, u32::MAX);
        assert_eq!(record.points, u32::MAX);
    }

    #[tokio::test]
    async fn points_clamp_at_zero() {
        let ledger = ledger();
        let id = PlayerId::new(7);
        let delta = LedgerDelta {
            points: -50,
            ..LedgerDelta::default()
        };
        let record = ledger.apply_delta(id, delta).await.unwrap();
        assert_eq!(record.points, 0);
    }
}
