//! Core identifier and domain types shared across the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque player identifier (platform snowflake).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlayerId(u64);

impl PlayerId {
    /// Wrap a raw platform id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw platform id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic match identifier, issued by the store.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MatchId(u64);

impl MatchId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed roster size per side for a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchFormat {
    OneVsOne,
    TwoVsTwo,
    ThreeVsThree,
    FourVsFour,
    FiveVsFive,
}

impl MatchFormat {
    /// All formats, in vote tie-break priority order (first-defined wins).
    pub const ALL: [MatchFormat; 5] = [
        MatchFormat::OneVsOne,
        MatchFormat::TwoVsTwo,
        MatchFormat::ThreeVsThree,
        MatchFormat::FourVsFour,
        MatchFormat::FiveVsFive,
    ];

    /// Required roster size per side.
    #[must_use]
    pub const fn team_size(self) -> usize {
        match self {
            MatchFormat::OneVsOne => 1,
            MatchFormat::TwoVsTwo => 2,
            MatchFormat::ThreeVsThree => 3,
            MatchFormat::FourVsFour => 4,
            MatchFormat::FiveVsFive => 5,
        }
    }

    /// Points awarded to each winning-side member. Larger formats are worth more.
    #[must_use]
    pub const fn points_award(self) -> u32 {
        match self {
            MatchFormat::OneVsOne => 100,
            MatchFormat::TwoVsTwo => 150,
            MatchFormat::ThreeVsThree => 200,
            MatchFormat::FourVsFour => 250,
            MatchFormat::FiveVsFive => 300,
        }
    }

    /// Parse the user-facing format label (e.g. `2v2`).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.label() == label)
    }

    /// The user-facing label, also used as the vote choice key.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            MatchFormat::OneVsOne => "1v1",
            MatchFormat::TwoVsTwo => "2v2",
            MatchFormat::ThreeVsThree => "3v3",
            MatchFormat::FourVsFour => "4v4",
            MatchFormat::FiveVsFive => "5v5",
        }
    }
}

impl fmt::Display for MatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the two sides of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Team1, Side::Team2];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        }
    }

    /// The vote choice key for this side.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Side::Team1 => "team1",
            Side::Team2 => "team2",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a decided match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Team1,
    Team2,
    Tie,
}

impl Winner {
    /// The winning side, if the match was decisive.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Winner::Team1 => Some(Side::Team1),
            Winner::Team2 => Some(Side::Team2),
            Winner::Tie => None,
        }
    }
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Team1 => Winner::Team1,
            Side::Team2 => Winner::Team2,
        }
    }
}

/// Lifecycle status of a match record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Rosters are locked and the match is being played.
    Active,
    /// Settled exactly once, decisive or tied.
    Completed,
    /// Administratively cleared before completion.
    Cancelled,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Active => "active",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Rank tier derived purely from a player's point total.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RankTier {
    Copper,
    Gold,
    Diamond,
}

/// Minimum points for the Gold tier.
pub const GOLD_MIN_POINTS: u32 = 500;
/// Minimum points for the Diamond tier.
pub const DIAMOND_MIN_POINTS: u32 = 1000;

impl RankTier {
    /// All tiers, ascending.
    pub const ALL: [RankTier; 3] = [RankTier::Copper, RankTier::Gold, RankTier::Diamond];

    /// Derive the tier for a point total. Pure and idempotent.
    #[must_use]
    pub const fn for_points(points: u32) -> Self {
        if points >= DIAMOND_MIN_POINTS {
            RankTier::Diamond
        } else if points >= GOLD_MIN_POINTS {
            RankTier::Gold
        } else {
            RankTier::Copper
        }
    }

    /// Role name held on the chat platform for this tier.
    #[must_use]
    pub const fn role_name(self) -> &'static str {
        match self {
            RankTier::Copper => "Copper",
            RankTier::Gold => "Gold",
            RankTier::Diamond => "Diamond",
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role_name())
    }
}

/// Persisted record of a match.
///
/// Rosters are immutable snapshots captured at match start, not live references
/// to teams, so history stays stable if teams are later mutated or dissolved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub format: MatchFormat,
    pub team1_roster: Vec<PlayerId>,
    pub team2_roster: Vec<PlayerId>,
    pub status: MatchStatus,
    /// `None` until settlement.
    pub winner: Option<Winner>,
    /// Points credited to each winning-side member; 0 for a tie.
    pub points_awarded: u32,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// All participants, winners first when the record is decided.
    #[must_use]
    pub fn participants(&self) -> Vec<PlayerId> {
        let mut all = self.team1_roster.clone();
        all.extend_from_slice(&self.team2_roster);
        all
    }

    /// The snapshot roster for a side.
    #[must_use]
    pub fn roster(&self, side: Side) -> &[PlayerId] {
        match side {
            Side::Team1 => &self.team1_roster,
            Side::Team2 => &self.team2_roster,
        }
    }
}
