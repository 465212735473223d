use storage::{
    LedgerStore,
    dto::player::{CreatePlayerRequest, UpdatePlayerRequest},
    error::Result,
    models::Player,
    repository::player::PlayerRepository,
};

/// List all players
pub async fn list_players(store: &dyn LedgerStore) -> Result<Vec<Player>> {
    let repo = PlayerRepository::new(store);
    repo.list().await
}

/// Register a new player
pub async fn create_player(store: &dyn LedgerStore, request: &CreatePlayerRequest) -> Result<Player> {
    let repo = PlayerRepository::new(store);
    repo.create(request).await
}

/// Rename a player
pub async fn update_player(
    store: &dyn LedgerStore,
    id: &str,
    request: &UpdatePlayerRequest,
) -> Result<Player> {
    let repo = PlayerRepository::new(store);
    repo.rename(id, request).await
}

/// Delete a player
pub async fn delete_player(store: &dyn LedgerStore, id: &str) -> Result<()> {
    let repo = PlayerRepository::new(store);
    repo.delete(id).await
}
