use anyhow::{Context, Result, ensure};

/// Finalize needs the award updates plus two bookkeeping writes in one batch.
const MIN_LEDGER_BATCH_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub api_keys: String,
    /// Largest atomic batch sent to the ledger; bulk day operations are chunked
    /// to this size.
    pub ledger_batch_size: usize,
    pub seed_default_categories: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            api_keys: std::env::var("API_KEYS").unwrap_or_default(),
            ledger_batch_size: match std::env::var("LEDGER_BATCH_SIZE") {
                Ok(value) => parse_batch_size(&value)?,
                Err(_) => storage::ledger::DEFAULT_BATCH_LIMIT,
            },
            seed_default_categories: std::env::var("SEED_DEFAULT_CATEGORIES")
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn parse_batch_size(value: &str) -> Result<usize> {
    let size: usize = value
        .trim()
        .parse()
        .context("LEDGER_BATCH_SIZE must be a positive number")?;
    ensure!(
        size >= MIN_LEDGER_BATCH_SIZE,
        "LEDGER_BATCH_SIZE must be at least {MIN_LEDGER_BATCH_SIZE}, got {size}"
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_must_fit_a_finalize() {
        assert_eq!(parse_batch_size("400").unwrap(), 400);
        assert_eq!(parse_batch_size("3").unwrap(), 3);

        for value in ["0", "1", "2", "-5", "many"] {
            assert!(parse_batch_size(value).is_err(), "{value} was accepted");
        }
    }
}
