//! File-backed budget key-value store.
//!
//! The monthly budget has to survive process restarts (spec'd as an external
//! key-value collaborator). When `budget.store_path` is configured, the
//! scalar is kept as a small JSON document on disk; a missing file simply
//! means "never set".

use super::{BudgetStore, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
struct BudgetRecord {
    monthly_amount: f64,
}

#[derive(Debug, Clone)]
pub struct FileBudgetStore {
    path: PathBuf,
}

impl FileBudgetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl BudgetStore for FileBudgetStore {
    async fn get(&self) -> Result<Option<f64>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let record: BudgetRecord = serde_json::from_slice(&bytes)?;
                Ok(Some(record.monthly_amount))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, amount: f64) -> Result<()> {
        let record = BudgetRecord {
            monthly_amount: amount,
        };
        let bytes = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}
