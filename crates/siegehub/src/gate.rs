//! Cooldown & Ban Gate.
//!
//! Cooldowns are an abuse rate-limit, not a correctness invariant: they live
//! in memory only and reset on restart. Entries expire by comparison, so no
//! cleanup task is needed. The ban flag is a pure ledger read.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::ledger::{LedgerError, PlayerLedger};
use crate::types::PlayerId;

/// Eligibility checks run before a player may enter matchmaking.
pub struct EligibilityGate {
    ledger: Arc<PlayerLedger>,
    cooldowns: Mutex<HashMap<PlayerId, DateTime<Utc>>>,
}

impl EligibilityGate {
    #[must_use]
    pub fn new(ledger: Arc<PlayerLedger>) -> Self {
        Self {
            ledger,
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the player is banned.
    pub async fn is_banned(&self, player: PlayerId) -> Result<bool, LedgerError> {
        self.ledger.is_banned(player).await
    }

    /// Remaining wait before the player may join a new match, `None` if
    /// eligible now.
    #[must_use]
    pub fn check_cooldown(&self, player: PlayerId, now: DateTime<Utc>) -> Option<Duration> {
        let cooldowns = self.cooldowns.lock();
        let until = cooldowns.get(&player)?;
        if *until > now {
            Some(*until - now)
        } else {
            None
        }
    }

    /// Start a cooldown running from `now`.
    pub fn set_cooldown(&self, player: PlayerId, now: DateTime<Utc>, duration: Duration) {
        self.cooldowns.lock().insert(player, now + duration);
    }
}
