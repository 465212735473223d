pub mod dto;
pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod seed;
pub mod services;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use error::{Result, ScoringError, ScoringResult, StorageError};
pub use ledger::{LedgerStore, MemoryLedger, PgLedger};
pub use services::day_session::DaySessionManager;

/// Connection pool to the PostgreSQL database backing the ledger.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Ledger over this pool with the default batch limit.
    pub fn ledger(&self) -> PgLedger {
        PgLedger::new(self.pool.clone())
    }
}
