use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::dto::category::CreateCategoryRequest;
use crate::error::{Result, StorageError};
use crate::ledger::{EntityKind, LedgerStore, fields};
use crate::models::Category;

use super::decode_all;

/// Repository for scoring rule templates
pub struct CategoryRepository<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let records = self.store.get_all(EntityKind::Categories).await?;
        decode_all(&records)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Category> {
        self.store
            .get_one(EntityKind::Categories, id)
            .await?
            .ok_or(StorageError::NotFound)?
            .decode()
    }

    pub async fn create(&self, req: &CreateCategoryRequest) -> Result<Category> {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: req.name.trim().to_string(),
            points: req.points,
        };

        self.store
            .set_one(
                EntityKind::Categories,
                &category.id,
                fields(json!({
                    "name": category.name,
                    "points": category.points,
                    "createdAt": Utc::now(),
                })),
                false,
            )
            .await?;

        Ok(category)
    }

    /// Delete a category. Events keep their captured name and points.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.find_by_id(id).await?;
        self.store.delete_one(EntityKind::Categories, id).await
    }
}
