//! Document-store abstraction the scoring core persists through.
//!
//! Records are JSON documents addressed by `(EntityKind, id)`. Field names match
//! the persisted shapes of the models (`scoreDay`, `totalPoints`, ...) so any
//! backend stores the same documents.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Result, StorageError};

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

/// Largest number of writes a single batch may carry.
pub const DEFAULT_BATCH_LIMIT: usize = 400;

pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Players,
    Categories,
    DayEvents,
    DaySessions,
    Meta,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Players => "players",
            Self::Categories => "categories",
            Self::DayEvents => "dayEvents",
            Self::DaySessions => "daySessions",
            Self::Meta => "meta",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub data: Document,
}

impl Record {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decode into a model, exposing the document id as its `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }

    pub fn get_i64(&self, field: &str) -> i64 {
        self.data.get(field).and_then(Value::as_i64).unwrap_or(0)
    }
}

/// Serialize a model into document fields; the `id` field is the key, not data.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StorageError::ConstraintViolation(format!(
            "expected an object document, got {other}"
        ))),
    }
}

/// Build document fields from a `serde_json::json!` object literal.
pub fn fields(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Field changes applied to an existing document: plain sets first, then
/// commutative integer increments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub set: Document,
    pub increments: BTreeMap<String, i64>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    /// Zero deltas are dropped; repeated fields accumulate.
    pub fn increment(mut self, field: &str, delta: i64) -> Self {
        if delta != 0 {
            *self.increments.entry(field.to_string()).or_insert(0) += delta;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.increments.is_empty()
    }

    /// Leaves `data` untouched when an increment would overflow.
    pub(crate) fn apply_to(&self, data: &mut Document) -> Result<()> {
        let mut next = data.clone();
        for (field, value) in &self.set {
            next.insert(field.clone(), value.clone());
        }
        for (field, delta) in &self.increments {
            let current = next.get(field).and_then(Value::as_i64).unwrap_or(0);
            let value = current.checked_add(*delta).ok_or_else(|| {
                StorageError::ConstraintViolation(format!("{field} is out of range"))
            })?;
            next.insert(field.clone(), Value::from(value));
        }
        *data = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        kind: EntityKind,
        id: String,
        fields: Document,
        merge: bool,
    },
    /// Fails the whole batch with `NotFound` when the document is absent.
    Update {
        kind: EntityKind,
        id: String,
        patch: Patch,
    },
    Delete {
        kind: EntityKind,
        id: String,
    },
}

/// The persistence collaborator of the scoring core.
///
/// Single-document writes are atomic, `increment` is commutative at the store
/// level, `batch_write` applies all of its operations or none, and a
/// transaction gives read-check-write isolation until `commit`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_all(&self, kind: EntityKind) -> Result<Vec<Record>>;

    async fn get_one(&self, kind: EntityKind, id: &str) -> Result<Option<Record>>;

    /// Records whose fields equal every `(field, value)` filter.
    async fn find_by(&self, kind: EntityKind, filters: &[(&str, Value)]) -> Result<Vec<Record>> {
        let records = self.get_all(kind).await?;
        Ok(records
            .into_iter()
            .filter(|record| {
                filters
                    .iter()
                    .all(|(field, value)| record.data.get(*field) == Some(value))
            })
            .collect())
    }

    async fn set_one(&self, kind: EntityKind, id: &str, fields: Document, merge: bool)
    -> Result<()>;

    async fn increment(&self, kind: EntityKind, id: &str, field: &str, delta: i64) -> Result<()>;

    /// Deleting an absent document is not an error.
    async fn delete_one(&self, kind: EntityKind, id: &str) -> Result<()>;

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<()>;

    async fn begin_transaction(&self) -> Result<Box<dyn LedgerTransaction>>;

    fn batch_limit(&self) -> usize {
        DEFAULT_BATCH_LIMIT
    }
}

/// Read-check-write unit of work. Dropping it without `commit` discards every
/// write made through it.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Reads inside a transaction lock the document until commit or rollback.
    async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Record>>;

    async fn set(&mut self, kind: EntityKind, id: &str, fields: Document, merge: bool)
    -> Result<()>;

    async fn update(&mut self, kind: EntityKind, id: &str, patch: Patch) -> Result<()>;

    async fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

pub(crate) fn check_batch_size(len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(StorageError::ConstraintViolation(format!(
            "batch of {len} writes exceeds the limit of {limit}"
        )));
    }
    Ok(())
}
