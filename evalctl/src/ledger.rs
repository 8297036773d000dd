//! The usage ledger: the single source of truth for all cost reporting.
//!
//! Every completed model attempt (success or failure) appends exactly one
//! [`UsageEvent`]. The ledger is append-only by construction: the backing
//! [`UsageStore`] trait exposes no update or delete, so corrections have to be
//! modeled as new compensating events by callers, never by mutating history.
//! All aggregates are derived from events on read and are never stored
//! redundantly.

use crate::{
    store::{self, UsageStore},
    types::{Clock, EventId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;

/// Which product surface incurred the spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Chat,
    Playground,
    Finetuning,
    Assistant,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Chat => write!(f, "chat"),
            Feature::Playground => write!(f, "playground"),
            Feature::Finetuning => write!(f, "finetuning"),
            Feature::Assistant => write!(f, "assistant"),
        }
    }
}

/// One billable model invocation attempt.
///
/// Failed attempts are recorded too (with zero tokens and cost) so that the
/// ledger accounts for every dispatch, not just the ones that produced text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageEvent {
    #[schema(value_type = String, format = "uuid")]
    pub id: EventId,
    /// Tenant the spend is attributed to; `None` means platform-level usage
    pub tenant_id: Option<String>,
    pub model: String,
    pub feature: Feature,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost: f64,
    pub latency_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Event data supplied by callers; ID and timestamp are assigned on record.
#[derive(Debug, Clone)]
pub struct NewUsageEvent {
    pub tenant_id: Option<String>,
    pub model: String,
    pub feature: Feature,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost: f64,
    pub latency_ms: Option<u64>,
}

/// Append/query facade over the durable usage store.
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append one event. Concurrent appends from parallel evaluation units are
    /// fine: each event is independent and order-insensitive.
    pub async fn record(&self, new: NewUsageEvent) -> store::Result<UsageEvent> {
        let event = UsageEvent {
            id: EventId::new_v4(),
            tenant_id: new.tenant_id,
            model: new.model,
            feature: new.feature,
            tokens_in: new.tokens_in,
            tokens_out: new.tokens_out,
            cost: new.cost,
            latency_ms: new.latency_ms,
            created_at: self.clock.now(),
        };
        self.store.append(&event).await?;
        Ok(event)
    }

    /// Events in `[start, end]` (both inclusive; unbounded when omitted),
    /// optionally restricted to one tenant.
    pub async fn query(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        tenant_id: Option<&str>,
    ) -> store::Result<Vec<UsageEvent>> {
        self.store.query(start, end, tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryUsageStore;
    use crate::test_utils::FixedClock;
    use chrono::TimeZone;

    fn fixed_ledger() -> (UsageLedger, DateTime<Utc>) {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let ledger = UsageLedger::new(
            Arc::new(InMemoryUsageStore::default()),
            Arc::new(FixedClock::at(at)),
        );
        (ledger, at)
    }

    fn playground_event(model: &str, cost: f64) -> NewUsageEvent {
        NewUsageEvent {
            tenant_id: None,
            model: model.to_string(),
            feature: Feature::Playground,
            tokens_in: 10,
            tokens_out: 20,
            cost,
            latency_ms: Some(120),
        }
    }

    #[tokio::test]
    async fn test_record_assigns_id_and_timestamp() {
        let (ledger, at) = fixed_ledger();
        let event = ledger.record(playground_event("gpt-4", 0.01)).await.unwrap();
        assert_eq!(event.created_at, at);

        let stored = ledger.query(None, None, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, event.id);
    }

    #[tokio::test]
    async fn test_query_by_tenant() {
        let (ledger, _) = fixed_ledger();
        let mut tenanted = playground_event("gpt-4", 0.01);
        tenanted.tenant_id = Some("acme".to_string());
        ledger.record(tenanted).await.unwrap();
        ledger.record(playground_event("gpt-4", 0.02)).await.unwrap();

        let acme = ledger.query(None, None, Some("acme")).await.unwrap();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].tenant_id.as_deref(), Some("acme"));
    }
}
