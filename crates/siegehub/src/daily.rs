//! Daily currency claim - a flat reward once per rolling 24-hour window.
//!
//! Independent of match settlement; the claim timestamp map is in-memory and
//! the credit itself goes through the ledger like any other delta. The window
//! check and the credit are serialized per player, so overlapping claims
//! cannot both pass the check while the credit's store write is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerDelta, LedgerError, PlayerLedger, PlayerRecord};
use crate::types::PlayerId;

/// Length of the claim window.
pub const CLAIM_WINDOW_HOURS: i64 = 24;

/// Errors from claiming the daily reward.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum DailyClaimError {
    /// Claimed too recently; wait out the remaining seconds.
    #[error("daily reward already claimed, {remaining_secs}s remaining")]
    AlreadyClaimed { remaining_secs: i64 },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

type ClaimLock = Arc<tokio::sync::Mutex<()>>;

/// The daily claim service.
pub struct DailyClaims {
    ledger: Arc<PlayerLedger>,
    amount: u32,
    last_claim: Mutex<HashMap<PlayerId, DateTime<Utc>>>,
    /// Per-player claim locks; only the claim lock spans the credit await.
    locks: Mutex<HashMap<PlayerId, ClaimLock>>,
}

impl DailyClaims {
    #[must_use]
    pub fn new(ledger: Arc<PlayerLedger>, amount: u32) -> Self {
        Self {
            ledger,
            amount,
            last_claim: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, player: PlayerId) -> ClaimLock {
        let mut locks = self.locks.lock();
        locks.entry(player).or_default().clone()
    }

    /// Credit the flat daily amount, once per rolling 24 hours.
    ///
    /// Check and credit run under a per-player lock: of two overlapping
    /// claims, exactly one credits and the other sees `AlreadyClaimed`.
    pub async fn claim(
        &self,
        player: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, DailyClaimError> {
        let lock = self.lock_for(player);
        let _guard = lock.lock().await;

        {
            let last_claim = self.last_claim.lock();
            if let Some(last) = last_claim.get(&player) {
                let eligible_at = *last + Duration::hours(CLAIM_WINDOW_HOURS);
                if eligible_at > now {
                    return Err(DailyClaimError::AlreadyClaimed {
                        remaining_secs: (eligible_at - now).num_seconds(),
                    });
                }
            }
        }

        let record = self
            .ledger
            .apply_delta(player, LedgerDelta::credit(self.amount))
            .await?;
        self.last_claim.lock().insert(player, now);
        Ok(record)
    }
}
