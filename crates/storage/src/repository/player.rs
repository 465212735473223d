use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::dto::player::{CreatePlayerRequest, UpdatePlayerRequest};
use crate::error::{Result, StorageError};
use crate::ledger::{EntityKind, LedgerStore, Patch, WriteOp, fields};
use crate::models::Player;

use super::decode_all;

pub struct PlayerRepository<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> PlayerRepository<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    /// List all players in registration order
    pub async fn list(&self) -> Result<Vec<Player>> {
        let records = self.store.get_all(EntityKind::Players).await?;
        decode_all(&records)
    }

    /// Find player by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Player> {
        self.store
            .get_one(EntityKind::Players, id)
            .await?
            .ok_or(StorageError::NotFound)?
            .decode()
    }

    /// Register a new player with empty day and award counters
    pub async fn create(&self, req: &CreatePlayerRequest) -> Result<Player> {
        let id = Uuid::new_v4().to_string();
        let player = Player {
            id: id.clone(),
            name: req.name.trim().to_string(),
            score: req.score.unwrap_or(0),
            score_day: 0,
            best: 0,
            bad: 0,
        };

        let mut doc = fields(json!({
            "name": player.name,
            "score": player.score,
            "scoreDay": 0,
            "best": 0,
            "bad": 0,
        }));
        doc.insert("createdAt".to_string(), json!(Utc::now()));

        self.store
            .set_one(EntityKind::Players, &id, doc, false)
            .await?;

        tracing::info!(player_id = %id, "Player registered");
        Ok(player)
    }

    /// Rename a player; scores are untouched
    pub async fn rename(&self, id: &str, req: &UpdatePlayerRequest) -> Result<Player> {
        self.store
            .batch_write(vec![WriteOp::Update {
                kind: EntityKind::Players,
                id: id.to_string(),
                patch: Patch::new().set("name", req.name.trim()),
            }])
            .await?;

        self.find_by_id(id).await
    }

    /// Delete a player by ID
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.find_by_id(id).await?;
        self.store.delete_one(EntityKind::Players, id).await?;

        tracing::info!(player_id = %id, "Player removed");
        Ok(())
    }
}
