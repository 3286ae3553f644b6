//! Chat-platform seam.
//!
//! The core never renders UI or parses raw user input. The adapter announces
//! vote rounds, delivers direct messages, and holds tier roles on members;
//! platform events flow back into the engine as explicit `cast_*` calls on the
//! orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{PlayerId, RankTier};

/// Non-fatal delivery failure. Always degrades to a log line, never an abort.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("notification error: {reason}")]
pub struct NotifyError {
    pub reason: String,
}

impl NotifyError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Outbound calls to the chat platform.
///
/// Every method is best-effort from the engine's point of view: errors are
/// surfaced so the caller can log them, but they never change match state.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Direct-message a player.
    async fn notify(&self, player: PlayerId, message: &str) -> Result<(), NotifyError>;

    /// Announce a vote round and its choices to the audience. The adapter is
    /// responsible for translating reactions into `cast_*` calls.
    async fn announce_vote(
        &self,
        choices: &[String],
        duration: Duration,
    ) -> Result<(), NotifyError>;

    /// Grant a tier role. Idempotent: granting a held role is a no-op.
    async fn set_role(&self, player: PlayerId, tier: RankTier) -> Result<(), NotifyError>;

    /// Revoke a tier role. Idempotent: revoking an absent role is a no-op.
    async fn remove_role(&self, player: PlayerId, tier: RankTier) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_error_display() {
        let err = NotifyError::new("dms closed");
        assert!(err.to_string().contains("dms closed"));
    }
}
