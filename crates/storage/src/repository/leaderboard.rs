use crate::dto::leaderboard::{LeaderboardEntry, LeaderboardKind};
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::models::Player;

use super::player::PlayerRepository;

pub struct LeaderboardRepository<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> LeaderboardRepository<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    pub async fn leaderboard(&self, kind: LeaderboardKind) -> Result<Vec<LeaderboardEntry>> {
        let players = PlayerRepository::new(self.store).list().await?;
        Ok(rank_players(players, kind))
    }
}

fn value_of(player: &Player, kind: LeaderboardKind) -> i64 {
    match kind {
        LeaderboardKind::Score => player.score,
        LeaderboardKind::ScoreDay => player.score_day,
        LeaderboardKind::Best => player.best,
        LeaderboardKind::Bad => player.bad,
    }
}

/// Highest value first, ties by name. The award boards only list players that
/// hold at least one credit.
fn rank_players(mut players: Vec<Player>, kind: LeaderboardKind) -> Vec<LeaderboardEntry> {
    if matches!(kind, LeaderboardKind::Best | LeaderboardKind::Bad) {
        players.retain(|player| value_of(player, kind) > 0);
    }

    players.sort_by(|a, b| {
        value_of(b, kind)
            .cmp(&value_of(a, kind))
            .then_with(|| a.name.cmp(&b.name))
    });

    players
        .into_iter()
        .enumerate()
        .map(|(index, player)| LeaderboardEntry {
            position: index + 1,
            value: value_of(&player, kind),
            player_id: player.id,
            name: player.name,
        })
        .collect()
}
