//! Team Roster Manager - ephemeral, in-memory grouping of players into teams.
//!
//! Teams are not persisted: a restart clears them, which caps the blast
//! radius of corrupted roster state to a single run. Membership is in join
//! order, a player belongs to at most one team per arena, and each team
//! carries a derived average of its members' current points.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerError, PlayerLedger};
use crate::types::PlayerId;

/// An ad-hoc team. Destroyed when its match settles or is cancelled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Team {
    /// Unique within the current arena.
    pub name: String,
    /// Unset when the team is empty; transfers in join order when the leader
    /// leaves.
    pub leader: Option<PlayerId>,
    /// Members in join order, no duplicates.
    pub members: Vec<PlayerId>,
    /// Mean of members' current points, recomputed on membership change.
    pub average_points: f64,
}

impl Team {
    fn new(name: String, leader: PlayerId) -> Self {
        Self {
            name,
            leader: Some(leader),
            members: vec![leader],
            average_points: 0.0,
        }
    }
}

/// Errors from roster operations.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum RosterError {
    /// A team with this name already exists.
    #[error("team name already taken: {name}")]
    NameTaken { name: String },
    /// No team with this name exists.
    #[error("team not found: {name}")]
    TeamNotFound { name: String },
    /// The player is already a member of this team.
    #[error("player is already a member of this team")]
    AlreadyMember,
    /// Banned players may not join teams.
    #[error("player {player} is banned")]
    PlayerBanned { player: PlayerId },
    /// Ledger read failed while recomputing averages or checking bans.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The roster service.
pub struct RosterManager {
    ledger: Arc<PlayerLedger>,
    teams: Mutex<Vec<Team>>,
}

impl RosterManager {
    #[must_use]
    pub fn new(ledger: Arc<PlayerLedger>) -> Self {
        Self {
            ledger,
            teams: Mutex::new(Vec::new()),
        }
    }

    /// Create a team with the given leader as its first member. The leader is
    /// removed from any team they currently belong to.
    pub async fn create_team(&self, name: &str, leader: PlayerId) -> Result<Team, RosterError> {
        {
            let teams = self.teams.lock();
            if teams.iter().any(|t| t.name == name) {
                return Err(RosterError::NameTaken {
                    name: name.to_string(),
                });
            }
        }

        self.remove_everywhere(leader);
        {
            let mut teams = self.teams.lock();
            teams.push(Team::new(name.to_string(), leader));
        }
        self.recompute_average(name).await?;
        self.get(name).ok_or_else(|| RosterError::TeamNotFound {
            name: name.to_string(),
        })
    }

    /// Join an existing team, leaving any current team first.
    pub async fn join_team(&self, name: &str, player: PlayerId) -> Result<Team, RosterError> {
        if self.ledger.is_banned(player).await? {
            return Err(RosterError::PlayerBanned { player });
        }

        {
            let teams = self.teams.lock();
            let team = teams
                .iter()
                .find(|t| t.name == name)
                .ok_or_else(|| RosterError::TeamNotFound {
                    name: name.to_string(),
                })?;
            if team.members.contains(&player) {
                return Err(RosterError::AlreadyMember);
            }
        }

        // Single-team membership per arena.
        let left = self.remove_everywhere(player);
        {
            let mut teams = self.teams.lock();
            if let Some(team) = teams.iter_mut().find(|t| t.name == name) {
                team.members.push(player);
                if team.leader.is_none() {
                    team.leader = Some(player);
                }
            }
        }

        for team_name in left {
            self.recompute_average(&team_name).await?;
        }
        self.recompute_average(name).await?;
        self.get(name).ok_or_else(|| RosterError::TeamNotFound {
            name: name.to_string(),
        })
    }

    /// Remove the player from every team they belong to.
    pub async fn leave_all_teams(&self, player: PlayerId) -> Result<(), RosterError> {
        for team_name in self.remove_everywhere(player) {
            self.recompute_average(&team_name).await?;
        }
        Ok(())
    }

    /// Remove a team entirely, used when its match settles or is cancelled.
    pub fn dissolve(&self, name: &str) {
        self.teams.lock().retain(|t| t.name != name);
    }

    /// Ensure a team exists, creating an empty bucket if needed. Used for the
    /// implicit per-side buckets.
    pub fn ensure_team(&self, name: &str) {
        let mut teams = self.teams.lock();
        if !teams.iter().any(|t| t.name == name) {
            teams.push(Team {
                name: name.to_string(),
                leader: None,
                members: Vec::new(),
                average_points: 0.0,
            });
        }
    }

    /// A snapshot of one team.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Team> {
        self.teams.lock().iter().find(|t| t.name == name).cloned()
    }

    /// Snapshots of all teams.
    #[must_use]
    pub fn list(&self) -> Vec<Team> {
        self.teams.lock().clone()
    }

    /// Remove the player from all teams, transferring leadership in join
    /// order. Returns the names of teams that changed.
    fn remove_everywhere(&self, player: PlayerId) -> Vec<String> {
        let mut changed = Vec::new();
        let mut teams = self.teams.lock();
        for team in teams.iter_mut() {
            if let Some(pos) = team.members.iter().position(|m| *m == player) {
                team.members.remove(pos);
                if team.leader == Some(player) {
                    // Next remaining member in join order, or unset if empty.
                    team.leader = team.members.first().copied();
                }
                changed.push(team.name.clone());
            }
        }
        changed
    }

    /// Recompute a team's average points from members' current ledger points.
    async fn recompute_average(&self, name: &str) -> Result<(), RosterError> {
        let members = match self.get(name) {
            Some(team) => team.members,
            None => return Ok(()),
        };

        let mut total: u64 = 0;
        for member in &members {
            total += u64::from(self.ledger.get(*member).await?.points);
        }
        let average = if members.is_empty() {
            0.0
        } else {
            total as f64 / members.len() as f64
        };

        let mut teams = self.teams.lock();
        if let Some(team) = teams.iter_mut().find(|t| t.name == name) {
            team.average_points = average;
        }
        Ok(())
    }
}
