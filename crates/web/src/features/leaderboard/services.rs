use storage::{
    LedgerStore,
    dto::leaderboard::{LeaderboardEntry, LeaderboardKind},
    error::Result,
    repository::leaderboard::LeaderboardRepository,
};

pub async fn get_leaderboard(
    store: &dyn LedgerStore,
    kind: LeaderboardKind,
) -> Result<Vec<LeaderboardEntry>> {
    LeaderboardRepository::new(store).leaderboard(kind).await
}
