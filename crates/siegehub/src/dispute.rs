//! Dispute Log - append-only record of contested matches for staff review.
//!
//! Filing a dispute snapshots the match's recorded rosters and winner; it
//! never alters match or player state, and nothing resolves automatically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::store::{StorageError, Store};
use crate::types::{MatchId, PlayerId, Winner};

/// One filed dispute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dispute {
    pub match_id: MatchId,
    pub reporter: PlayerId,
    /// Roster snapshots copied from the match record at filing time.
    pub team1_roster: Vec<PlayerId>,
    pub team2_roster: Vec<PlayerId>,
    pub winner: Option<Winner>,
    pub filed_at: DateTime<Utc>,
}

/// Errors from filing a dispute.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum DisputeError {
    /// No match with this id exists.
    #[error("match not found: {id}")]
    MatchNotFound { id: MatchId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The dispute log service.
pub struct DisputeLog {
    store: Arc<dyn Store>,
    entries: Mutex<Vec<Dispute>>,
}

impl DisputeLog {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// File a dispute against a recorded match.
    pub async fn file(
        &self,
        match_id: MatchId,
        reporter: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<Dispute, DisputeError> {
        let record = self
            .store
            .load_match(match_id)
            .await?
            .ok_or(DisputeError::MatchNotFound { id: match_id })?;

        let dispute = Dispute {
            match_id,
            reporter,
            team1_roster: record.team1_roster,
            team2_roster: record.team2_roster,
            winner: record.winner,
            filed_at: now,
        };
        self.entries.lock().push(dispute.clone());
        Ok(dispute)
    }

    /// All disputes, in filing order.
    #[must_use]
    pub fn all(&self) -> Vec<Dispute> {
        self.entries.lock().clone()
    }

    /// Disputes filed against one match.
    #[must_use]
    pub fn for_match(&self, match_id: MatchId) -> Vec<Dispute> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.match_id == match_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{MatchFormat, MatchRecord, MatchStatus};

    fn completed_match(id: MatchId) -> MatchRecord {
        MatchRecord {
            id,
            format: MatchFormat::OneVsOne,
            team1_roster: vec![PlayerId::new(1)],
            team2_roster: vec![PlayerId::new(2)],
            status: MatchStatus::Completed,
            winner: Some(Winner::Team1),
            points_awarded: 100,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn filing_against_unknown_match_rejected() {
        let log = DisputeLog::new(Arc::new(MemoryStore::new()));
        let err = log
            .file(MatchId::new(99), PlayerId::new(1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DisputeError::MatchNotFound { .. }));
        assert!(log.all().is_empty());
    }

    #[tokio::test]
    async fn dispute_snapshots_match_result() {
        let store = Arc::new(MemoryStore::new());
        let id = MatchId::new(5);
        store.save_match(&completed_match(id)).await.unwrap();

        let log = DisputeLog::new(store);
        let dispute = log.file(id, PlayerId::new(3), Utc::now()).await.unwrap();

        assert_eq!(dispute.match_id, id);
        assert_eq!(dispute.winner, Some(Winner::Team1));
        assert_eq!(dispute.team1_roster, vec![PlayerId::new(1)]);
        assert_eq!(log.for_match(id).len(), 1);
    }

    #[tokio::test]
    async fn log_is_append_only() {
        let store = Arc::new(MemoryStore::new());
        let id = MatchId::new(6);
        store.save_match(&completed_match(id)).await.unwrap();

        let log = DisputeLog::new(store);
        log.file(id, PlayerId::new(1), Utc::now()).await.unwrap();
        log.file(id, PlayerId::new(2), Utc::now()).await.unwrap();
        assert_eq!(log.all().len(), 2);
    }
}
