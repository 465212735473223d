use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::Result;
use crate::ledger::{EntityKind, LedgerStore, WriteOp, fields};

/// Rule set offered to a fresh league.
pub const DEFAULT_CATEGORIES: &[(&str, i64)] = &[
    ("Goal", 5),
    ("Hard save", 4),
    ("Assist", 3),
    ("Missed open goal", -2),
    ("Handball", -2),
    ("Goalkeeper conceded", -3),
    ("Gave away goal (indirect)", -3),
    ("Penalty foul", -3),
    ("Missed penalty", -4),
    ("Gave away goal (direct)", -5),
    ("Own goal", -8),
];

/// Insert the default categories unless the league already has some.
/// Returns how many were inserted.
pub async fn seed_default_categories(store: &dyn LedgerStore) -> Result<usize> {
    if !store.get_all(EntityKind::Categories).await?.is_empty() {
        tracing::debug!("Categories already present, skipping seed");
        return Ok(0);
    }

    let now = Utc::now();
    let ops: Vec<WriteOp> = DEFAULT_CATEGORIES
        .iter()
        .map(|(name, points)| WriteOp::Set {
            kind: EntityKind::Categories,
            id: Uuid::new_v4().to_string(),
            fields: fields(json!({
                "name": name,
                "points": points,
                "createdAt": now,
            })),
            merge: false,
        })
        .collect();
    let inserted = ops.len();
    store.batch_write(ops).await?;

    tracing::info!(inserted, "Seeded default categories");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::repository::category::CategoryRepository;

    #[tokio::test]
    async fn test_seed_runs_once() {
        let ledger = MemoryLedger::new();
        assert_eq!(seed_default_categories(&ledger).await.unwrap(), 11);
        assert_eq!(seed_default_categories(&ledger).await.unwrap(), 0);

        let categories = CategoryRepository::new(&ledger).list().await.unwrap();
        assert_eq!(categories.len(), 11);
        assert_eq!(categories[0].name, "Goal");
        assert_eq!(categories[10].points, -8);
    }
}
