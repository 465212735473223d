use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    DEFAULT_BATCH_LIMIT, Document, EntityKind, LedgerStore, LedgerTransaction, Patch, Record,
    WriteOp, check_batch_size,
};
use crate::error::{Result, StorageError};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    data: Document,
}

#[derive(Debug, Clone, Default)]
struct Collections {
    next_seq: u64,
    kinds: HashMap<EntityKind, BTreeMap<String, StoredDocument>>,
}

impl Collections {
    fn all(&self, kind: EntityKind) -> Vec<Record> {
        let mut docs: Vec<(&String, &StoredDocument)> = self
            .kinds
            .get(&kind)
            .map(|docs| docs.iter().collect())
            .unwrap_or_default();
        docs.sort_by_key(|(_, doc)| doc.seq);
        docs.into_iter()
            .map(|(id, doc)| Record::new(id.clone(), doc.data.clone()))
            .collect()
    }

    fn one(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.kinds
            .get(&kind)
            .and_then(|docs| docs.get(id))
            .map(|doc| Record::new(id, doc.data.clone()))
    }

    fn set(&mut self, kind: EntityKind, id: &str, fields: Document, merge: bool) {
        let seq = self.next_seq;
        let docs = self.kinds.entry(kind).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => existing.data.extend(fields),
            Some(existing) => existing.data = fields,
            None => {
                docs.insert(id.to_string(), StoredDocument { seq, data: fields });
                self.next_seq += 1;
            }
        }
    }

    fn update(&mut self, kind: EntityKind, id: &str, patch: &Patch) -> Result<()> {
        let doc = self
            .kinds
            .get_mut(&kind)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StorageError::NotFound)?;
        patch.apply_to(&mut doc.data)
    }

    fn delete(&mut self, kind: EntityKind, id: &str) {
        if let Some(docs) = self.kinds.get_mut(&kind) {
            docs.remove(id);
        }
    }

    fn apply(&mut self, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::Set {
                kind,
                id,
                fields,
                merge,
            } => self.set(kind, &id, fields, merge),
            WriteOp::Update { kind, id, patch } => self.update(kind, &id, &patch)?,
            WriteOp::Delete { kind, id } => self.delete(kind, &id),
        }
        Ok(())
    }
}

/// Number of writes still allowed before the ledger starts failing them.
/// `usize::MAX` means unlimited.
#[derive(Debug, Clone)]
struct WriteBudget(Arc<AtomicUsize>);

impl WriteBudget {
    fn unlimited() -> Self {
        Self(Arc::new(AtomicUsize::new(usize::MAX)))
    }

    fn reset(&self, remaining: usize) {
        self.0.store(remaining, Ordering::SeqCst);
    }

    fn spend(&self) -> Result<()> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                match remaining {
                    0 => None,
                    usize::MAX => Some(usize::MAX),
                    n => Some(n - 1),
                }
            })
            .map(|_| ())
            .map_err(|_| {
                StorageError::Unavailable("memory ledger is rejecting writes".to_string())
            })
    }
}

/// In-process ledger. Every operation takes the store lock, so single writes
/// and increments are atomic; a transaction keeps the lock until it commits or
/// drops, which makes transactions serializable.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Collections>>,
    budget: WriteBudget,
    batch_limit: usize,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_batch_limit(DEFAULT_BATCH_LIMIT)
    }

    pub fn with_batch_limit(batch_limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Collections::default())),
            budget: WriteBudget::unlimited(),
            batch_limit,
        }
    }

    /// While enabled every write, batch and commit fails with
    /// `StorageError::Unavailable` and leaves the store untouched.
    pub fn fail_writes(&self, enabled: bool) {
        self.budget.reset(if enabled { 0 } else { usize::MAX });
    }

    /// Let the next `writes` writes, batches or commits succeed and fail every
    /// one after that, until `fail_writes(false)`.
    pub fn fail_writes_after(&self, writes: usize) {
        self.budget.reset(writes);
    }

    fn check_writable(&self) -> Result<()> {
        self.budget.spend()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(self.inner.lock().await.all(kind))
    }

    async fn get_one(&self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        Ok(self.inner.lock().await.one(kind, id))
    }

    async fn set_one(
        &self,
        kind: EntityKind,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<()> {
        self.check_writable()?;
        self.inner.lock().await.set(kind, id, fields, merge);
        Ok(())
    }

    async fn increment(&self, kind: EntityKind, id: &str, field: &str, delta: i64) -> Result<()> {
        self.check_writable()?;
        let patch = Patch::new().increment(field, delta);
        self.inner.lock().await.update(kind, id, &patch)
    }

    async fn delete_one(&self, kind: EntityKind, id: &str) -> Result<()> {
        self.check_writable()?;
        self.inner.lock().await.delete(kind, id);
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        check_batch_size(ops.len(), self.batch_limit)?;
        self.check_writable()?;

        let mut guard = self.inner.lock().await;
        let mut working = guard.clone();
        for op in ops {
            working.apply(op)?;
        }
        *guard = working;
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn LedgerTransaction>> {
        let guard = self.inner.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            writes: 0,
            batch_limit: self.batch_limit,
            budget: self.budget.clone(),
        }))
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Collections>,
    working: Collections,
    writes: usize,
    batch_limit: usize,
    budget: WriteBudget,
}

impl MemoryTransaction {
    fn count_write(&mut self) -> Result<()> {
        self.writes += 1;
        check_batch_size(self.writes, self.batch_limit)
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        Ok(self.working.one(kind, id))
    }

    async fn set(
        &mut self,
        kind: EntityKind,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<()> {
        self.count_write()?;
        self.working.set(kind, id, fields, merge);
        Ok(())
    }

    async fn update(&mut self, kind: EntityKind, id: &str, patch: Patch) -> Result<()> {
        self.count_write()?;
        self.working.update(kind, id, &patch)
    }

    async fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        self.count_write()?;
        self.working.delete(kind, id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.budget.spend()?;
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fields;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order() {
        let ledger = MemoryLedger::new();
        for id in ["b", "a", "c"] {
            ledger
                .set_one(EntityKind::Players, id, fields(json!({"name": id})), false)
                .await
                .unwrap();
        }

        let ids: Vec<String> = ledger
            .get_all(EntityKind::Players)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_merge_keeps_untouched_fields() {
        let ledger = MemoryLedger::new();
        ledger
            .set_one(EntityKind::Meta, "day", fields(json!({"a": 1, "b": 2})), false)
            .await
            .unwrap();
        ledger
            .set_one(EntityKind::Meta, "day", fields(json!({"b": 3})), true)
            .await
            .unwrap();

        let record = ledger.get_one(EntityKind::Meta, "day").await.unwrap().unwrap();
        assert_eq!(record.data, fields(json!({"a": 1, "b": 3})));
    }

    #[tokio::test]
    async fn test_batch_with_missing_update_target_writes_nothing() {
        let ledger = MemoryLedger::new();
        let ops = vec![
            WriteOp::Set {
                kind: EntityKind::DayEvents,
                id: "e1".to_string(),
                fields: fields(json!({"count": 1})),
                merge: false,
            },
            WriteOp::Update {
                kind: EntityKind::Players,
                id: "ghost".to_string(),
                patch: Patch::new().increment("score", 5),
            },
        ];

        let result = ledger.batch_write(ops).await;
        assert!(matches!(result, Err(StorageError::NotFound)));
        assert!(ledger.get_all(EntityKind::DayEvents).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_over_limit_is_rejected() {
        let ledger = MemoryLedger::with_batch_limit(2);
        let ops = (0..3)
            .map(|i| WriteOp::Delete {
                kind: EntityKind::DayEvents,
                id: i.to_string(),
            })
            .collect();

        let result = ledger.batch_write(ops).await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let ledger = MemoryLedger::new();
        {
            let mut tx = ledger.begin_transaction().await.unwrap();
            tx.set(EntityKind::Meta, "day", fields(json!({"x": 1})), false)
                .await
                .unwrap();
        }
        assert!(ledger.get_one(EntityKind::Meta, "day").await.unwrap().is_none());

        let mut tx = ledger.begin_transaction().await.unwrap();
        tx.set(EntityKind::Meta, "day", fields(json!({"x": 1})), false)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(ledger.get_one(EntityKind::Meta, "day").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failing_commit_leaves_store_untouched() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.begin_transaction().await.unwrap();
        tx.set(EntityKind::Meta, "day", fields(json!({"x": 1})), false)
            .await
            .unwrap();
        ledger.fail_writes(true);

        assert!(matches!(tx.commit().await, Err(StorageError::Unavailable(_))));
        ledger.fail_writes(false);
        assert!(ledger.get_one(EntityKind::Meta, "day").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_fail_once_the_budget_is_spent() {
        let ledger = MemoryLedger::new();
        ledger.fail_writes_after(2);

        for id in ["a", "b"] {
            ledger
                .set_one(EntityKind::Players, id, fields(json!({"score": 0})), false)
                .await
                .unwrap();
        }
        let third = ledger
            .set_one(EntityKind::Players, "c", fields(json!({"score": 0})), false)
            .await;
        assert!(matches!(third, Err(StorageError::Unavailable(_))));

        ledger.fail_writes(false);
        ledger.delete_one(EntityKind::Players, "a").await.unwrap();
        assert_eq!(ledger.get_all(EntityKind::Players).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overflowing_increment_keeps_the_old_value() {
        let ledger = MemoryLedger::new();
        ledger
            .set_one(EntityKind::Players, "p1", fields(json!({"score": i64::MAX})), false)
            .await
            .unwrap();

        let result = ledger.increment(EntityKind::Players, "p1", "score", 1).await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));

        let record = ledger.get_one(EntityKind::Players, "p1").await.unwrap().unwrap();
        assert_eq!(record.get_i64("score"), i64::MAX);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let ledger = MemoryLedger::new();
        ledger
            .set_one(EntityKind::Players, "p1", fields(json!({"score": 0})), false)
            .await
            .unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .increment(EntityKind::Players, "p1", "score", 2)
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let record = ledger.get_one(EntityKind::Players, "p1").await.unwrap().unwrap();
        assert_eq!(record.get_i64("score"), 100);
    }
}
