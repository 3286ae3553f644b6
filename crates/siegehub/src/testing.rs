//! Test doubles for the external seams.
//!
//! Used by this crate's own tests and available to downstream integration
//! tests: a recording chat adapter and a store that fails on command.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::{ChatAdapter, NotifyError};
use crate::ledger::PlayerRecord;
use crate::store::{MemoryStore, StorageError, Store};
use crate::types::{MatchId, MatchRecord, PlayerId, RankTier};

/// Chat adapter that records every call instead of talking to a platform.
#[derive(Default)]
pub struct RecordingAdapter {
    notifications: Mutex<Vec<(PlayerId, String)>>,
    announcements: Mutex<Vec<Vec<String>>>,
    roles: Mutex<HashMap<PlayerId, BTreeSet<RankTier>>>,
    fail_notify: AtomicBool,
}

impl RecordingAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `notify` fail, to exercise best-effort paths.
    pub fn fail_notifications(&self, fail: bool) {
        self.fail_notify.store(fail, Ordering::SeqCst);
    }

    /// Messages delivered to one player, in order.
    #[must_use]
    pub fn notifications_for(&self, player: PlayerId) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of vote announcements made.
    #[must_use]
    pub fn announcement_count(&self) -> usize {
        self.announcements.lock().len()
    }

    /// Tier roles currently held by a player, ascending.
    #[must_use]
    pub fn roles_of(&self, player: PlayerId) -> Vec<RankTier> {
        self.roles
            .lock()
            .get(&player)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatAdapter for RecordingAdapter {
    async fn notify(&self, player: PlayerId, message: &str) -> Result<(), NotifyError> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(NotifyError::new("direct messages disabled"));
        }
        self.notifications
            .lock()
            .push((player, message.to_string()));
        Ok(())
    }

    async fn announce_vote(
        &self,
        choices: &[String],
        _duration: Duration,
    ) -> Result<(), NotifyError> {
        self.announcements.lock().push(choices.to_vec());
        Ok(())
    }

    async fn set_role(&self, player: PlayerId, tier: RankTier) -> Result<(), NotifyError> {
        self.roles.lock().entry(player).or_default().insert(tier);
        Ok(())
    }

    async fn remove_role(&self, player: PlayerId, tier: RankTier) -> Result<(), NotifyError> {
        if let Some(set) = self.roles.lock().get_mut(&player) {
            set.remove(&tier);
        }
        Ok(())
    }
}

/// Store wrapper that fails or delays player saves on command, for
/// partial-settlement, retryable-error, and race-window tests.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_players: Mutex<HashSet<PlayerId>>,
    save_delay: Mutex<Option<Duration>>,
}

impl FlakyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `save_player` fail for this player until cleared.
    pub fn fail_player_saves(&self, player: PlayerId) {
        self.failing_players.lock().insert(player);
    }

    /// Stop failing saves for this player.
    pub fn heal_player(&self, player: PlayerId) {
        self.failing_players.lock().remove(&player);
    }

    /// Delay every subsequent `save_player`, widening write-latency windows.
    pub fn delay_saves(&self, delay: Duration) {
        *self.save_delay.lock() = Some(delay);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn load_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StorageError> {
        self.inner.load_player(id).await
    }

    async fn save_player(&self, record: &PlayerRecord) -> Result<(), StorageError> {
        let delay = *self.save_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_players.lock().contains(&record.id) {
            return Err(StorageError::new(format!(
                "injected write failure for player {}",
                record.id
            )));
        }
        self.inner.save_player(record).await
    }

    async fn next_match_id(&self) -> Result<MatchId, StorageError> {
        self.inner.next_match_id().await
    }

    async fn save_match(&self, record: &MatchRecord) -> Result<(), StorageError> {
        self.inner.save_match(record).await
    }

    async fn load_match(&self, id: MatchId) -> Result<Option<MatchRecord>, StorageError> {
        self.inner.load_match(id).await
    }
}
