//! Settlement & Rank Service.
//!
//! Applies ledger deltas exactly once per decided match and keeps each
//! player's platform role in line with their derived rank tier. A per-player
//! ledger failure is recorded in that player's outcome and never blocks the
//! rest of the roster - partial settlement is surfaced, not hidden.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapter::ChatAdapter;
use crate::config::HubConfig;
use crate::ledger::{LedgerDelta, LedgerError, PlayerLedger, PlayerRecord};
use crate::types::{MatchRecord, PlayerId, RankTier, Side, Winner};

/// What settlement did (or failed to do) for one participant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub player: PlayerId,
    pub side: Side,
    /// The updated record, or the ledger error that left this player unpaid.
    /// Storage errors here are retryable by an operator.
    pub result: Result<PlayerRecord, LedgerError>,
    /// Tier after settlement, when rank sync ran.
    pub tier: Option<RankTier>,
}

/// The settlement service.
pub struct SettlementService {
    ledger: Arc<PlayerLedger>,
    adapter: Arc<dyn ChatAdapter>,
    config: Arc<HubConfig>,
}

impl SettlementService {
    #[must_use]
    pub fn new(
        ledger: Arc<PlayerLedger>,
        adapter: Arc<dyn ChatAdapter>,
        config: Arc<HubConfig>,
    ) -> Self {
        Self {
            ledger,
            adapter,
            config,
        }
    }

    /// Apply the match result to every participant snapshot on both sides.
    ///
    /// A tie settles nobody: the returned list is empty and no ledger record
    /// changes. For a decisive result, winners get the match's point award,
    /// the flat win bonus, and a win; losers get a loss.
    pub async fn settle(&self, record: &MatchRecord) -> Vec<SettlementOutcome> {
        let winning_side = match record.winner {
            Some(winner) => match winner.side() {
                Some(side) => side,
                None => return Vec::new(),
            },
            None => return Vec::new(),
        };

        let mut outcomes = Vec::new();
        for side in Side::BOTH {
            let delta = if side == winning_side {
                LedgerDelta::win(record.points_awarded, self.config.win_currency_bonus)
            } else {
                LedgerDelta::loss()
            };

            for &player in record.roster(side) {
                let result = self.ledger.apply_delta(player, delta).await;
                let tier = match &result {
                    Ok(_) => match self.sync_rank(player).await {
                        Ok(tier) => Some(tier),
                        Err(err) => {
                            warn!(%player, error = %err, "rank sync failed after settlement");
                            None
                        }
                    },
                    Err(err) => {
                        warn!(%player, match_id = %record.id, error = %err, "settlement ledger write failed");
                        None
                    }
                };
                outcomes.push(SettlementOutcome {
                    player,
                    side,
                    result,
                    tier,
                });
            }
        }

        info!(match_id = %record.id, winner = ?record.winner, settled = outcomes.len(), "match settled");
        outcomes
    }

    /// Bring the player's platform role in line with their point total.
    ///
    /// Derivation is a pure function of points, so calling this twice with
    /// unchanged points yields the same single held tier role. Role-sync
    /// failures degrade to a logged warning.
    pub async fn sync_rank(&self, player: PlayerId) -> Result<RankTier, LedgerError> {
        let record = self.ledger.get(player).await?;
        let tier = RankTier::for_points(record.points);

        if let Err(err) = self.adapter.set_role(player, tier).await {
            warn!(%player, %tier, error = %err, "failed to grant tier role");
        }
        for other in RankTier::ALL {
            if other == tier {
                continue;
            }
            if let Err(err) = self.adapter.remove_role(player, other).await {
                warn!(%player, tier = %other, error = %err, "failed to revoke tier role");
            }
        }
        Ok(tier)
    }
}

/// True when a winner vote tally decided the match; `Winner::Tie` on an exact
/// tie between the two sides.
#[must_use]
pub fn decide_winner(team1_votes: u32, team2_votes: u32) -> Winner {
    use std::cmp::Ordering;
    match team1_votes.cmp(&team2_votes) {
        Ordering::Greater => Winner::Team1,
        Ordering::Less => Winner::Team2,
        Ordering::Equal => Winner::Tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::RecordingAdapter;
    use crate::types::{MatchFormat, MatchId, MatchStatus};
    use chrono::Utc;

    fn service() -> (Arc<PlayerLedger>, Arc<RecordingAdapter>, SettlementService) {
        let ledger = Arc::new(PlayerLedger::new(Arc::new(MemoryStore::new())));
        let adapter = Arc::new(RecordingAdapter::new());
        let service = SettlementService::new(
            ledger.clone(),
            adapter.clone(),
            Arc::new(HubConfig::default()),
        );
        (ledger, adapter, service)
    }

    fn decided_match(winner: Winner) -> MatchRecord {
        MatchRecord {
            id: MatchId::new(1),
            format: MatchFormat::TwoVsTwo,
            team1_roster: vec![PlayerId::new(1), PlayerId::new(2)],
            team2_roster: vec![PlayerId::new(3), PlayerId::new(4)],
            status: MatchStatus::Completed,
            winner: Some(winner),
            points_awarded: MatchFormat::TwoVsTwo.points_award(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn decisive_settlement_pays_winners_and_counts_losses() {
        let (ledger, _, service) = service();
        let outcomes = service.settle(&decided_match(Winner::Team1)).await;
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));

        let winner = ledger.get(PlayerId::new(1)).await.unwrap();
        assert_eq!(winner.points, 150);
        assert_eq!(winner.currency, 1000 + 250);
        assert_eq!(winner.wins, 1);
        assert_eq!(winner.losses, 0);

        let loser = ledger.get(PlayerId::new(3)).await.unwrap();
        assert_eq!(loser.points, 0);
        assert_eq!(loser.currency, 1000);
        assert_eq!(loser.wins, 0);
        assert_eq!(loser.losses, 1);
    }

    #[tokio::test]
    async fn tie_settles_nobody() {
        let (ledger, _, service) = service();
        let mut record = decided_match(Winner::Tie);
        record.points_awarded = 0;

        let outcomes = service.settle(&record).await;
        assert!(outcomes.is_empty());

        for raw in 1..=4 {
            let player = ledger.get(PlayerId::new(raw)).await.unwrap();
            assert_eq!(player.points, 0);
            assert_eq!(player.currency, 1000);
            assert_eq!(player.wins + player.losses, 0);
        }
    }

    #[tokio::test]
    async fn sync_rank_holds_exactly_one_tier_role() {
        let (ledger, adapter, service) = service();
        let player = PlayerId::new(7);
        ledger
            .apply_delta(player, LedgerDelta::win(1200, 0))
            .await
            .unwrap();

        let tier = service.sync_rank(player).await.unwrap();
        assert_eq!(tier, RankTier::Diamond);
        assert_eq!(adapter.roles_of(player), vec![RankTier::Diamond]);

        // Idempotent: a second sync with unchanged points changes nothing.
        service.sync_rank(player).await.unwrap();
        assert_eq!(adapter.roles_of(player), vec![RankTier::Diamond]);
    }

    #[tokio::test]
    async fn sync_rank_replaces_stale_tier_role() {
        let (ledger, adapter, service) = service();
        let player = PlayerId::new(8);

        ledger
            .apply_delta(player, LedgerDelta::win(600, 0))
            .await
            .unwrap();
        service.sync_rank(player).await.unwrap();
        assert_eq!(adapter.roles_of(player), vec![RankTier::Gold]);

        ledger
            .apply_delta(player, LedgerDelta::win(500, 0))
            .await
            .unwrap();
        service.sync_rank(player).await.unwrap();
        assert_eq!(adapter.roles_of(player), vec![RankTier::Diamond]);
    }

    #[test]
    fn winner_from_vote_counts() {
        assert_eq!(decide_winner(3, 1), Winner::Team1);
        assert_eq!(decide_winner(0, 2), Winner::Team2);
        assert_eq!(decide_winner(1, 1), Winner::Tie);
        assert_eq!(decide_winner(0, 0), Winner::Tie);
    }
}
