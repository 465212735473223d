use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};

use super::{
    DEFAULT_BATCH_LIMIT, Document, EntityKind, LedgerStore, LedgerTransaction, Patch, Record,
    WriteOp, check_batch_size,
};
use crate::error::{Result, StorageError};

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Document>,
}

impl From<DocumentRow> for Record {
    fn from(row: DocumentRow) -> Self {
        Record::new(row.id, row.data.0)
    }
}

/// PostgreSQL-backed ledger keeping every document in `ledger_documents`.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    batch_limit: usize,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }

    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }
}

async fn fetch_one(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: &str,
    for_update: bool,
) -> Result<Option<Record>> {
    let sql = if for_update {
        "SELECT id, data FROM ledger_documents WHERE kind = $1 AND id = $2 FOR UPDATE"
    } else {
        "SELECT id, data FROM ledger_documents WHERE kind = $1 AND id = $2"
    };

    let row = sqlx::query_as::<_, DocumentRow>(sql)
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(Record::from))
}

async fn upsert(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: &str,
    fields: Document,
    merge: bool,
) -> Result<()> {
    let sql = if merge {
        r#"
        INSERT INTO ledger_documents (kind, id, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (kind, id)
        DO UPDATE SET data = ledger_documents.data || EXCLUDED.data, updated_at = now()
        "#
    } else {
        r#"
        INSERT INTO ledger_documents (kind, id, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (kind, id)
        DO UPDATE SET data = EXCLUDED.data, updated_at = now()
        "#
    };

    sqlx::query(sql)
        .bind(kind.as_str())
        .bind(id)
        .bind(Json(fields))
        .execute(conn)
        .await?;

    Ok(())
}

async fn apply_patch(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: &str,
    patch: &Patch,
) -> Result<()> {
    // Also serves as the existence check when the patch only increments.
    let result = sqlx::query(
        r#"
        UPDATE ledger_documents
        SET data = data || $3, updated_at = now()
        WHERE kind = $1 AND id = $2
        "#,
    )
    .bind(kind.as_str())
    .bind(id)
    .bind(Json(patch.set.clone()))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }

    for (field, delta) in &patch.increments {
        increment_field(&mut *conn, kind, id, field, *delta).await?;
    }

    Ok(())
}

async fn increment_field(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: &str,
    field: &str,
    delta: i64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE ledger_documents
        SET data = jsonb_set(data, ARRAY[$3::text], to_jsonb(COALESCE((data ->> $3)::bigint, 0) + $4)),
            updated_at = now()
        WHERE kind = $1 AND id = $2
        "#,
    )
    .bind(kind.as_str())
    .bind(id)
    .bind(field)
    .bind(delta)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }

    Ok(())
}

async fn remove(conn: &mut PgConnection, kind: EntityKind, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM ledger_documents WHERE kind = $1 AND id = $2")
        .bind(kind.as_str())
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

async fn apply_op(conn: &mut PgConnection, op: WriteOp) -> Result<()> {
    match op {
        WriteOp::Set {
            kind,
            id,
            fields,
            merge,
        } => upsert(conn, kind, &id, fields, merge).await,
        WriteOp::Update { kind, id, patch } => apply_patch(conn, kind, &id, &patch).await,
        WriteOp::Delete { kind, id } => remove(conn, kind, &id).await,
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn get_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM ledger_documents WHERE kind = $1 ORDER BY seq",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn get_one(&self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one(&mut conn, kind, id, false).await
    }

    async fn find_by(&self, kind: EntityKind, filters: &[(&str, Value)]) -> Result<Vec<Record>> {
        let filter: Document = filters
            .iter()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect();

        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM ledger_documents WHERE kind = $1 AND data @> $2 ORDER BY seq",
        )
        .bind(kind.as_str())
        .bind(Json(filter))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn set_one(
        &self,
        kind: EntityKind,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, kind, id, fields, merge).await
    }

    async fn increment(&self, kind: EntityKind, id: &str, field: &str, delta: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        increment_field(&mut conn, kind, id, field, delta).await
    }

    async fn delete_one(&self, kind: EntityKind, id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        remove(&mut conn, kind, id).await
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        check_batch_size(ops.len(), self.batch_limit)?;

        let mut tx = self.pool.begin().await?;
        for op in ops {
            apply_op(&mut tx, op).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn LedgerTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTransaction {
            tx,
            writes: 0,
            batch_limit: self.batch_limit,
        }))
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
    writes: usize,
    batch_limit: usize,
}

impl PgLedgerTransaction {
    fn count_write(&mut self) -> Result<()> {
        self.writes += 1;
        check_batch_size(self.writes, self.batch_limit)
    }
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        fetch_one(&mut self.tx, kind, id, true).await
    }

    async fn set(
        &mut self,
        kind: EntityKind,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<()> {
        self.count_write()?;
        upsert(&mut self.tx, kind, id, fields, merge).await
    }

    async fn update(&mut self, kind: EntityKind, id: &str, patch: Patch) -> Result<()> {
        self.count_write()?;
        apply_patch(&mut self.tx, kind, id, &patch).await
    }

    async fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        self.count_write()?;
        remove(&mut self.tx, kind, id).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fields;
    use serde_json::json;

    async fn ledger() -> PgLedger {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = crate::Database::new(&url).await.unwrap();
        db.run_migrations().await.unwrap();
        db.ledger()
    }

    #[tokio::test]
    #[ignore] // Only run against a live PostgreSQL
    async fn test_increment_and_merge_round_trip() {
        let ledger = ledger().await;
        let id = uuid::Uuid::new_v4().to_string();

        ledger
            .set_one(EntityKind::Players, &id, fields(json!({"name": "Ana", "score": 1})), false)
            .await
            .unwrap();
        ledger
            .increment(EntityKind::Players, &id, "score", 4)
            .await
            .unwrap();
        ledger
            .set_one(EntityKind::Players, &id, fields(json!({"scoreDay": 0})), true)
            .await
            .unwrap();

        let record = ledger.get_one(EntityKind::Players, &id).await.unwrap().unwrap();
        assert_eq!(record.get_i64("score"), 5);
        assert_eq!(record.data.get("name"), Some(&json!("Ana")));

        ledger.delete_one(EntityKind::Players, &id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Only run against a live PostgreSQL
    async fn test_batch_rolls_back_on_missing_document() {
        let ledger = ledger().await;
        let event_id = uuid::Uuid::new_v4().to_string();

        let result = ledger
            .batch_write(vec![
                WriteOp::Set {
                    kind: EntityKind::DayEvents,
                    id: event_id.clone(),
                    fields: fields(json!({"count": 1})),
                    merge: false,
                },
                WriteOp::Update {
                    kind: EntityKind::Players,
                    id: uuid::Uuid::new_v4().to_string(),
                    patch: Patch::new().increment("score", 1),
                },
            ])
            .await;

        assert!(matches!(result, Err(StorageError::NotFound)));
        assert!(
            ledger
                .get_one(EntityKind::DayEvents, &event_id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
