//! In-memory store implementations.
//!
//! These back the engine when no external record store is configured, and
//! double as the test fixtures. Runs and events live in `DashMap`s so
//! concurrent evaluation units can write without a global lock; the budget
//! scalar sits behind an `ArcSwapOption`.

use super::{BudgetStore, EvaluationStore, Result, RunFilter, StoreError, UsageStore};
use crate::{evaluator::EvaluationRun, ledger::UsageEvent, types::RunId};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct InMemoryEvaluationStore {
    runs: DashMap<RunId, EvaluationRun>,
}

#[async_trait::async_trait]
impl EvaluationStore for InMemoryEvaluationStore {
    async fn create(&self, run: &EvaluationRun) -> Result<()> {
        self.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn get(&self, id: RunId) -> Result<Option<EvaluationRun>> {
        Ok(self.runs.get(&id).map(|r| r.clone()))
    }

    async fn update(&self, run: &EvaluationRun) -> Result<()> {
        if !self.runs.contains_key(&run.id) {
            return Err(StoreError::NotFound);
        }
        self.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn delete(&self, id: RunId) -> Result<bool> {
        Ok(self.runs.remove(&id).is_some())
    }

    async fn list(&self, filter: &RunFilter) -> Result<Vec<EvaluationRun>> {
        let needle = filter.text.as_ref().map(|t| t.to_lowercase());
        let mut runs: Vec<EvaluationRun> = self
            .runs
            .iter()
            .filter(|r| !filter.favorites_only || r.is_favorite)
            .filter(|r| {
                needle.as_ref().is_none_or(|q| {
                    r.prompt.to_lowercase().contains(q)
                        || r.tags.iter().any(|tag| tag.to_lowercase().contains(q))
                })
            })
            .map(|r| r.clone())
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            runs.truncate(limit);
        }
        Ok(runs)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    events: DashMap<uuid::Uuid, UsageEvent>,
}

#[async_trait::async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn append(&self, event: &UsageEvent) -> Result<()> {
        self.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn query(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        tenant_id: Option<&str>,
    ) -> Result<Vec<UsageEvent>> {
        let mut events: Vec<UsageEvent> = self
            .events
            .iter()
            .filter(|e| start.is_none_or(|s| e.created_at >= s))
            .filter(|e| end.is_none_or(|s| e.created_at <= s))
            .filter(|e| tenant_id.is_none_or(|t| e.tenant_id.as_deref() == Some(t)))
            .map(|e| e.clone())
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBudgetStore {
    amount: ArcSwapOption<f64>,
}

#[async_trait::async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn get(&self) -> Result<Option<f64>> {
        Ok(self.amount.load().as_deref().copied())
    }

    async fn set(&self, amount: f64) -> Result<()> {
        self.amount.store(Some(Arc::new(amount)));
        Ok(())
    }
}
