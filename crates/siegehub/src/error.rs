//! Engine-wide error type.
//!
//! Each service keeps its own error enum next to its code; `HubError` exists
//! for callers that drive several services behind one fallible surface, such
//! as a command front-end. Conversions are lossless so the specific rejection
//! reason survives to the reply.

use serde::{Deserialize, Serialize};

use crate::daily::DailyClaimError;
use crate::dispute::DisputeError;
use crate::ledger::LedgerError;
use crate::orchestrator::MatchError;
use crate::roster::RosterError;
use crate::store::StorageError;
use crate::voting::VoteError;

/// Any error the engine can surface to a caller.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Dispute(#[from] DisputeError),
    #[error(transparent)]
    DailyClaim(#[from] DailyClaimError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl HubError {
    /// Whether retrying the same operation can plausibly succeed. True only
    /// for persistence failures; every validation or eligibility rejection is
    /// final until state changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            HubError::Storage(_) => true,
            HubError::Ledger(err) | HubError::Roster(RosterError::Ledger(err)) => {
                matches!(err, LedgerError::Storage(_))
            }
            HubError::Match(err) => matches!(
                err,
                MatchError::Storage(_) | MatchError::Ledger(LedgerError::Storage(_))
            ),
            HubError::Dispute(err) => matches!(err, DisputeError::Storage(_)),
            HubError::DailyClaim(err) => {
                matches!(err, DailyClaimError::Ledger(LedgerError::Storage(_)))
            }
            _ => false,
        }
    }
}
