//! Match Orchestrator - the global state machine tying the engine together.
//!
//! States: `Idle -> FormatVoting -> RosterCheck -> Active -> WinnerVoting ->
//! Settling -> Idle`. At most one match is active at any time; the whole
//! machine lives behind one mutex that is held only for the duration of a
//! transition, never across the voting windows. The timed phases suspend the
//! driving task while votes accumulate, so balance checks, profile views, and
//! daily claims stay servable mid-match.
//!
//! An administrative `clear` cancels the match from any non-terminal state
//! and frees the slot; it bumps a generation counter so an in-flight driver
//! notices after its next suspension point and bails out instead of settling.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::adapter::ChatAdapter;
use crate::config::HubConfig;
use crate::gate::EligibilityGate;
use crate::ledger::LedgerError;
use crate::roster::RosterManager;
use crate::settlement::{decide_winner, SettlementOutcome, SettlementService};
use crate::store::{StorageError, Store};
use crate::types::{MatchFormat, MatchRecord, MatchStatus, PlayerId, Side, Winner};
use crate::voting::{VoteError, VoteRound};

/// Errors from orchestrator transitions.
///
/// Eligibility rejections (`MatchInProgress`, `PlayerBanned`, `OnCooldown`)
/// and validation rejections (`InsufficientPlayers`) are resolved at the
/// transition boundary and leave no state behind.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum MatchError {
    #[error("a match is already in progress")]
    MatchInProgress,
    #[error("player {player} is banned")]
    PlayerBanned { player: PlayerId },
    #[error("on matchmaking cooldown for another {remaining_secs}s")]
    OnCooldown { remaining_secs: i64 },
    #[error("{team} has {have} of {needed} required players")]
    InsufficientPlayers {
        team: String,
        needed: usize,
        have: usize,
    },
    /// The match was cancelled by an administrative clear while in flight.
    #[error("the match was cancelled")]
    Cancelled,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Which phase the orchestrator is in, for status displays and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Idle,
    FormatVoting,
    RosterCheck,
    Active,
    WinnerVoting,
    Settling,
}

enum Phase {
    Idle,
    FormatVoting {
        round: VoteRound,
    },
    RosterCheck,
    Active {
        record: MatchRecord,
    },
    WinnerVoting {
        record: MatchRecord,
        round: VoteRound,
    },
    Settling {
        record: MatchRecord,
    },
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::FormatVoting { .. } => PhaseKind::FormatVoting,
            Phase::RosterCheck => PhaseKind::RosterCheck,
            Phase::Active { .. } => PhaseKind::Active,
            Phase::WinnerVoting { .. } => PhaseKind::WinnerVoting,
            Phase::Settling { .. } => PhaseKind::Settling,
        }
    }
}

struct OrchestratorState {
    phase: Phase,
    /// Bumped when a match starts and when `clear` fires, so a suspended
    /// driver can tell its match was cancelled out from under it.
    generation: u64,
}

/// The completed run of one match: the final record plus what settlement did
/// for each participant. Partial settlement is visible here, never hidden.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchReport {
    pub record: MatchRecord,
    pub outcomes: Vec<SettlementOutcome>,
}

/// The orchestrator. One instance owns the global match slot.
pub struct MatchOrchestrator {
    gate: Arc<EligibilityGate>,
    roster: Arc<RosterManager>,
    settlement: Arc<SettlementService>,
    store: Arc<dyn Store>,
    adapter: Arc<dyn ChatAdapter>,
    config: Arc<HubConfig>,
    state: parking_lot::Mutex<OrchestratorState>,
}

impl MatchOrchestrator {
    #[must_use]
    pub fn new(
        gate: Arc<EligibilityGate>,
        roster: Arc<RosterManager>,
        settlement: Arc<SettlementService>,
        store: Arc<dyn Store>,
        adapter: Arc<dyn ChatAdapter>,
        config: Arc<HubConfig>,
    ) -> Self {
        Self {
            gate,
            roster,
            settlement,
            store,
            adapter,
            config,
            state: parking_lot::Mutex::new(OrchestratorState {
                phase: Phase::Idle,
                generation: 0,
            }),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PhaseKind {
        self.state.lock().phase.kind()
    }

    /// The in-flight match record, if one exists yet.
    #[must_use]
    pub fn active_match(&self) -> Option<MatchRecord> {
        match &self.state.lock().phase {
            Phase::Active { record }
            | Phase::WinnerVoting { record, .. }
            | Phase::Settling { record } => Some(record.clone()),
            _ => None,
        }
    }

    /// Cast a vote in the open format round. Fails with `RoundClosed` when no
    /// format vote is running.
    pub fn cast_format_vote(&self, voter: PlayerId, choice: &str) -> Result<(), VoteError> {
        let round = match &self.state.lock().phase {
            Phase::FormatVoting { round } => round.clone(),
            _ => return Err(VoteError::RoundClosed),
        };
        round.cast_vote(voter, choice, Utc::now())
    }

    /// Cast a vote in the open winner round. Deliberately open to the whole
    /// audience, not just roster members - the winner vote is a community
    /// vote.
    pub fn cast_winner_vote(&self, voter: PlayerId, side: Side) -> Result<(), VoteError> {
        let round = match &self.state.lock().phase {
            Phase::WinnerVoting { round, .. } => round.clone(),
            _ => return Err(VoteError::RoundClosed),
        };
        round.cast_vote(voter, side.label(), Utc::now())
    }

    /// Run one full match: format vote, roster check, match open, winner
    /// vote, settlement. Suspends for the two voting windows; everything else
    /// holds the state lock only per-transition.
    pub async fn run_match(&self, initiator: PlayerId) -> Result<MatchReport, MatchError> {
        if self.gate.is_banned(initiator).await? {
            return Err(MatchError::PlayerBanned { player: initiator });
        }
        let now = Utc::now();
        if let Some(remaining) = self.gate.check_cooldown(initiator, now) {
            return Err(MatchError::OnCooldown {
                remaining_secs: remaining.num_seconds(),
            });
        }

        let format_choices: Vec<String> =
            MatchFormat::ALL.iter().map(|f| f.label().to_string()).collect();
        let format_round = VoteRound::open(
            format_choices.clone(),
            now,
            chrono::Duration::seconds(self.config.format_vote_secs as i64),
        );

        let generation = {
            let mut state = self.state.lock();
            if !matches!(state.phase, Phase::Idle) {
                return Err(MatchError::MatchInProgress);
            }
            state.generation += 1;
            state.phase = Phase::FormatVoting {
                round: format_round.clone(),
            };
            state.generation
        };
        info!(%initiator, "match requested, format vote open");

        if let Err(err) = self
            .adapter
            .announce_vote(
                &format_choices,
                Duration::from_secs(self.config.format_vote_secs),
            )
            .await
        {
            warn!(error = %err, "failed to announce format vote");
        }

        sleep(Duration::from_secs(self.config.format_vote_secs)).await;

        let format = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Err(MatchError::Cancelled);
            }
            let tally = format_round.close();
            let format = tally
                .leader()
                .and_then(MatchFormat::parse)
                .unwrap_or(MatchFormat::ALL[0]);
            state.phase = Phase::RosterCheck;
            format
        };
        info!(%format, "format selected");

        self.roster.ensure_team(&self.config.team_one_name);
        self.roster.ensure_team(&self.config.team_two_name);
        let needed = format.team_size();
        let mut rosters = Vec::with_capacity(2);
        for name in [&self.config.team_one_name, &self.config.team_two_name] {
            let members = self.roster.get(name).map(|t| t.members).unwrap_or_default();
            if members.len() < needed {
                // Abort without creating a match record; teams survive so
                // players can keep filling them.
                self.reset_if_current(generation);
                return Err(MatchError::InsufficientPlayers {
                    team: name.clone(),
                    needed,
                    have: members.len(),
                });
            }
            rosters.push(members[..needed].to_vec());
        }
        let team2_roster = rosters.pop().unwrap_or_default();
        let team1_roster = rosters.pop().unwrap_or_default();

        let id = match self.store.next_match_id().await {
            Ok(id) => id,
            Err(err) => {
                self.reset_if_current(generation);
                return Err(err.into());
            }
        };
        let mut record = MatchRecord {
            id,
            format,
            team1_roster,
            team2_roster,
            status: MatchStatus::Active,
            winner: None,
            points_awarded: 0,
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.save_match(&record).await {
            self.reset_if_current(generation);
            return Err(err.into());
        }
        let cleared_mid_open = {
            let mut state = self.state.lock();
            if state.generation != generation {
                true
            } else {
                state.phase = Phase::Active {
                    record: record.clone(),
                };
                false
            }
        };
        if cleared_mid_open {
            // Cleared between persist and transition: take the orphaned
            // active record down with us so the slot invariant holds.
            record.status = MatchStatus::Cancelled;
            let _ = self.store.save_match(&record).await;
            return Err(MatchError::Cancelled);
        }
        info!(match_id = %record.id, %format, "match opened");

        let now = Utc::now();
        for player in record.participants() {
            self.gate.set_cooldown(
                player,
                now,
                chrono::Duration::seconds(self.config.match_cooldown_secs),
            );
            let message = format!("Match {} is live: {} - good luck!", record.id, format);
            if let Err(err) = self.adapter.notify(player, &message).await {
                warn!(%player, error = %err, "failed to notify participant");
            }
        }

        let winner_choices: Vec<String> = Side::BOTH
            .iter()
            .map(|s| s.label().to_string())
            .collect();
        let winner_round = VoteRound::open(
            winner_choices.clone(),
            Utc::now(),
            chrono::Duration::seconds(self.config.winner_vote_secs as i64),
        );
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Err(MatchError::Cancelled);
            }
            state.phase = Phase::WinnerVoting {
                record: record.clone(),
                round: winner_round.clone(),
            };
        }
        if let Err(err) = self
            .adapter
            .announce_vote(
                &winner_choices,
                Duration::from_secs(self.config.winner_vote_secs),
            )
            .await
        {
            warn!(error = %err, "failed to announce winner vote");
        }

        sleep(Duration::from_secs(self.config.winner_vote_secs)).await;

        let winner = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Err(MatchError::Cancelled);
            }
            let tally = winner_round.close();
            let winner = decide_winner(
                tally.count(Side::Team1.label()),
                tally.count(Side::Team2.label()),
            );
            state.phase = Phase::Settling {
                record: record.clone(),
            };
            winner
        };

        record.winner = Some(winner);
        record.status = MatchStatus::Completed;
        record.points_awarded = match winner {
            Winner::Tie => 0,
            _ => format.points_award(),
        };

        let outcomes = self.settlement.settle(&record).await;

        // No generation check here: once deltas are applied, the completed
        // record is the truth even if a clear raced in during settlement.
        if let Err(err) = self.store.save_match(&record).await {
            warn!(match_id = %record.id, error = %err, "failed to persist settled match");
            self.dissolve_side_teams();
            self.reset_if_current(generation);
            return Err(err.into());
        }

        self.dissolve_side_teams();
        self.reset_if_current(generation);
        info!(match_id = %record.id, winner = ?winner, "match completed");
        Ok(MatchReport { record, outcomes })
    }

    /// Administrative clear: cancel the match from any non-terminal state,
    /// with no ledger effects, and free the global slot. Any pending vote
    /// round is invalidated; its eventual close becomes a no-op.
    ///
    /// A clear that lands while settlement is already writing does not undo
    /// it: the applied deltas are the truth, and the driver writes the
    /// completed record last.
    pub async fn clear(&self) -> Result<Option<MatchRecord>, MatchError> {
        let (record, round) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut state.phase, Phase::Idle) {
                Phase::Idle => return Ok(None),
                Phase::FormatVoting { round } => {
                    state.generation += 1;
                    (None, Some(round))
                }
                Phase::RosterCheck => {
                    state.generation += 1;
                    (None, None)
                }
                Phase::Active { record } => {
                    state.generation += 1;
                    (Some(record), None)
                }
                Phase::WinnerVoting { record, round } => {
                    state.generation += 1;
                    (Some(record), Some(round))
                }
                Phase::Settling { record } => {
                    state.generation += 1;
                    (Some(record), None)
                }
            }
        };

        if let Some(round) = round {
            round.close();
        }
        self.dissolve_side_teams();

        let Some(mut record) = record else {
            info!("clear: no match record yet, slot freed");
            return Ok(None);
        };
        record.status = MatchStatus::Cancelled;
        self.store.save_match(&record).await?;
        info!(match_id = %record.id, "match cancelled by clear");
        Ok(Some(record))
    }

    fn dissolve_side_teams(&self) {
        self.roster.dissolve(&self.config.team_one_name);
        self.roster.dissolve(&self.config.team_two_name);
    }

    fn reset_if_current(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.phase = Phase::Idle;
        }
    }
}
