//! Voting Collector - a generic, timeout-bounded tally of choices.
//!
//! One round serves both uses: format selection and winner selection. Each
//! voter gets at most one vote per round, and the first vote wins - a later
//! attempt by the same voter is rejected, not overwritten. The round closes
//! automatically once its deadline passes; an explicit `close` is idempotent.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::PlayerId;

/// Errors from casting a vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VoteError {
    /// This voter already cast a vote in this round; first vote wins.
    #[error("voter has already cast a vote in this round")]
    AlreadyVoted,
    /// The choice is not part of this round.
    #[error("invalid choice: {choice}")]
    ChoiceInvalid { choice: String },
    /// The round is closed, by deadline or explicitly.
    #[error("voting round is closed")]
    RoundClosed,
}

/// Final counts for a closed round, in choice-definition order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteTally {
    choices: Vec<String>,
    counts: HashMap<String, u32>,
}

impl VoteTally {
    /// Count for one choice. Unknown choices count zero.
    #[must_use]
    pub fn count(&self, choice: &str) -> u32 {
        self.counts.get(choice).copied().unwrap_or(0)
    }

    /// Total votes cast.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// The winning choice under the fixed-priority tie-break: the earliest
    /// defined choice whose count no later choice strictly exceeds.
    ///
    /// Deterministic by construction - `{1v1: 2, 2v2: 2}` resolves to `1v1`.
    #[must_use]
    pub fn leader(&self) -> Option<&str> {
        let mut best: Option<(&str, u32)> = None;
        for choice in &self.choices {
            let count = self.count(choice);
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((choice, count)),
            }
        }
        best.map(|(choice, _)| choice)
    }

    /// Counts per choice in definition order, for rendering results.
    #[must_use]
    pub fn breakdown(&self) -> Vec<(String, u32)> {
        self.choices
            .iter()
            .map(|c| (c.clone(), self.count(c)))
            .collect()
    }
}

struct RoundState {
    choices: Vec<String>,
    deadline: DateTime<Utc>,
    counts: HashMap<String, u32>,
    voters: HashSet<PlayerId>,
    closed: bool,
}

/// A single voting round. Cheap to clone; all clones share the tally.
#[derive(Clone)]
pub struct VoteRound {
    state: Arc<Mutex<RoundState>>,
}

impl VoteRound {
    /// Open a round over the given choices, closing `duration` after `now`.
    #[must_use]
    pub fn open(choices: Vec<String>, now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RoundState {
                choices,
                deadline: now + duration,
                counts: HashMap::new(),
                voters: HashSet::new(),
                closed: false,
            })),
        }
    }

    /// Cast one vote. Votes are counted in arrival order; only the first vote
    /// per voter lands.
    pub fn cast_vote(
        &self,
        voter: PlayerId,
        choice: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VoteError> {
        let mut state = self.state.lock();

        if state.closed || now >= state.deadline {
            return Err(VoteError::RoundClosed);
        }
        if !state.choices.iter().any(|c| c == choice) {
            return Err(VoteError::ChoiceInvalid {
                choice: choice.to_string(),
            });
        }
        if !state.voters.insert(voter) {
            return Err(VoteError::AlreadyVoted);
        }

        *state.counts.entry(choice.to_string()).or_insert(0) += 1;
        Ok(())
    }

    /// Close the round and return the tally. Idempotent: closing an already
    /// closed round returns the same tally.
    pub fn close(&self) -> VoteTally {
        let mut state = self.state.lock();
        state.closed = true;
        VoteTally {
            choices: state.choices.clone(),
            counts: state.counts.clone(),
        }
    }

    /// Whether the round no longer accepts votes at `now`.
    #[must_use]
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.lock();
        state.closed || now >= state.deadline
    }
}
