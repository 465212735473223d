use std::sync::Arc;

use storage::LedgerStore;

/// Shared handle every handler extracts.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<dyn LedgerStore>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.ledger.as_ref()
    }
}
