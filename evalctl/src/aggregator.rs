//! Read-side cost aggregation over the usage ledger.
//!
//! Nothing here is stored: every summary is computed from ledger events at
//! query time, so the ledger remains the single source of truth and the
//! conservation invariant (breakdowns sum to the totals) holds by
//! construction. Percentages appear only in the per-model breakdown.

use crate::{
    errors::Result,
    ledger::{UsageEvent, UsageLedger},
    pricing::round_currency,
    types::Clock,
};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// Events attributed to no tenant are reported under this key.
pub const PLATFORM_TENANT: &str = "platform";

/// One slice of spend (per feature or per tenant).
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BreakdownEntry {
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
}

/// Per-model slice, additionally carrying its share of total cost.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ModelBreakdownEntry {
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
    /// Share of total cost, 0-100. Zero when the total is zero.
    pub percentage: f64,
}

/// Spend over one time window, broken down three ways.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CostSummary {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_requests: u64,
    pub by_model: HashMap<String, ModelBreakdownEntry>,
    pub by_feature: HashMap<String, BreakdownEntry>,
    pub by_tenant: HashMap<String, BreakdownEntry>,
}

/// One tenant's spend in the ranking.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TenantSpend {
    pub tenant_id: String,
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
}

#[derive(Clone)]
pub struct CostAggregator {
    ledger: UsageLedger,
    clock: Arc<dyn Clock>,
}

/// First instant of the month containing `now`.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

impl CostAggregator {
    pub fn new(ledger: UsageLedger, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Aggregate all events in `[start, end]` (unbounded when omitted).
    pub async fn summary(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CostSummary> {
        let events = self.ledger.query(start, end, None).await?;
        Ok(build_summary(start, end, &events))
    }

    /// Spend from the first of the current month up to now.
    pub async fn current_month_summary(&self) -> Result<CostSummary> {
        let now = self.clock.now();
        self.summary(Some(month_start(now)), Some(now)).await
    }

    /// The `limit` biggest-spending tenants of the current month, highest
    /// first. Untenanted spend is ranked under the `"platform"` key, the
    /// same grouping the summary breakdowns use.
    pub async fn top_tenants(&self, limit: usize) -> Result<Vec<TenantSpend>> {
        let now = self.clock.now();
        let events = self
            .ledger
            .query(Some(month_start(now)), Some(now), None)
            .await?;

        let mut by_tenant: HashMap<String, TenantSpend> = HashMap::new();
        for event in &events {
            let tenant_id = event
                .tenant_id
                .clone()
                .unwrap_or_else(|| PLATFORM_TENANT.to_string());
            let entry = by_tenant
                .entry(tenant_id.clone())
                .or_insert_with(|| TenantSpend {
                    tenant_id,
                    cost: 0.0,
                    tokens: 0,
                    requests: 0,
                });
            entry.cost = round_currency(entry.cost + event.cost);
            entry.tokens += event.tokens_in + event.tokens_out;
            entry.requests += 1;
        }

        let mut ranked: Vec<TenantSpend> = by_tenant.into_values().collect();
        ranked.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        ranked.truncate(limit);
        Ok(ranked)
    }
}

fn build_summary(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    events: &[UsageEvent],
) -> CostSummary {
    let mut summary = CostSummary {
        start,
        end,
        total_cost: 0.0,
        total_tokens: 0,
        total_requests: 0,
        by_model: HashMap::new(),
        by_feature: HashMap::new(),
        by_tenant: HashMap::new(),
    };

    for event in events {
        let tokens = event.tokens_in + event.tokens_out;
        summary.total_cost += event.cost;
        summary.total_tokens += tokens;
        summary.total_requests += 1;

        let model = summary.by_model.entry(event.model.clone()).or_default();
        model.cost = round_currency(model.cost + event.cost);
        model.tokens += tokens;
        model.requests += 1;

        let feature = summary
            .by_feature
            .entry(event.feature.to_string())
            .or_default();
        feature.cost = round_currency(feature.cost + event.cost);
        feature.tokens += tokens;
        feature.requests += 1;

        let tenant_key = event
            .tenant_id
            .clone()
            .unwrap_or_else(|| PLATFORM_TENANT.to_string());
        let tenant = summary.by_tenant.entry(tenant_key).or_default();
        tenant.cost = round_currency(tenant.cost + event.cost);
        tenant.tokens += tokens;
        tenant.requests += 1;
    }

    summary.total_cost = round_currency(summary.total_cost);
    // Unrounded so the shares keep summing to 100 across any number of models
    for entry in summary.by_model.values_mut() {
        entry.percentage = if summary.total_cost > 0.0 {
            entry.cost / summary.total_cost * 100.0
        } else {
            0.0
        };
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Feature, NewUsageEvent};
    use crate::store::memory::InMemoryUsageStore;
    use crate::test_utils::FixedClock;
    use chrono::TimeZone;

    fn aggregator_at(now: DateTime<Utc>) -> (CostAggregator, UsageLedger) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(now));
        let ledger = UsageLedger::new(Arc::new(InMemoryUsageStore::default()), clock.clone());
        (CostAggregator::new(ledger.clone(), clock), ledger)
    }

    fn event(model: &str, feature: Feature, tenant: Option<&str>, cost: f64) -> NewUsageEvent {
        NewUsageEvent {
            tenant_id: tenant.map(|t| t.to_string()),
            model: model.to_string(),
            feature,
            tokens_in: 100,
            tokens_out: 200,
            cost,
            latency_ms: Some(50),
        }
    }

    fn june_10() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_breakdowns_sum_to_totals() {
        let (aggregator, ledger) = aggregator_at(june_10());
        ledger.record(event("gpt-4", Feature::Playground, None, 0.30)).await.unwrap();
        ledger.record(event("gpt-4", Feature::Chat, Some("acme"), 0.20)).await.unwrap();
        ledger.record(event("gemini-pro", Feature::Chat, Some("acme"), 0.05)).await.unwrap();

        let summary = aggregator.summary(None, None).await.unwrap();
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.total_tokens, 900);
        assert!((summary.total_cost - 0.55).abs() < 1e-9);

        for breakdown_cost in [
            summary.by_model.values().map(|e| e.cost).sum::<f64>(),
            summary.by_feature.values().map(|e| e.cost).sum::<f64>(),
            summary.by_tenant.values().map(|e| e.cost).sum::<f64>(),
        ] {
            assert!((breakdown_cost - summary.total_cost).abs() < 1e-6);
        }
        for breakdown_requests in [
            summary.by_model.values().map(|e| e.requests).sum::<u64>(),
            summary.by_feature.values().map(|e| e.requests).sum::<u64>(),
            summary.by_tenant.values().map(|e| e.requests).sum::<u64>(),
        ] {
            assert_eq!(breakdown_requests, summary.total_requests);
        }
    }

    #[tokio::test]
    async fn test_model_percentages_sum_to_100() {
        let (aggregator, ledger) = aggregator_at(june_10());
        ledger.record(event("gpt-4", Feature::Playground, None, 0.37)).await.unwrap();
        ledger.record(event("claude-3-opus", Feature::Playground, None, 0.21)).await.unwrap();
        ledger.record(event("gemini-pro", Feature::Playground, None, 0.003)).await.unwrap();

        let summary = aggregator.summary(None, None).await.unwrap();
        let percent_sum: f64 = summary.by_model.values().map(|e| e.percentage).sum();
        assert!((percent_sum - 100.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_empty_ledger_summary() {
        let (aggregator, _) = aggregator_at(june_10());
        let summary = aggregator.summary(None, None).await.unwrap();
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.total_requests, 0);
        assert!(summary.by_model.is_empty());
    }

    #[tokio::test]
    async fn test_untenanted_spend_lands_under_platform() {
        let (aggregator, ledger) = aggregator_at(june_10());
        ledger.record(event("gpt-4", Feature::Playground, None, 0.10)).await.unwrap();

        let summary = aggregator.summary(None, None).await.unwrap();
        assert!(summary.by_tenant.contains_key(PLATFORM_TENANT));
    }

    #[tokio::test]
    async fn test_current_month_window() {
        // Record through a ledger pinned to May, then aggregate as of June 10
        let may = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
        let store = Arc::new(InMemoryUsageStore::default());
        let may_ledger = UsageLedger::new(store.clone(), Arc::new(FixedClock::at(may)));
        may_ledger.record(event("gpt-4", Feature::Chat, None, 5.0)).await.unwrap();

        let june_clock: Arc<dyn Clock> = Arc::new(FixedClock::at(june_10()));
        let june_ledger = UsageLedger::new(store, june_clock.clone());
        june_ledger.record(event("gpt-4", Feature::Chat, None, 1.0)).await.unwrap();

        let aggregator = CostAggregator::new(june_ledger, june_clock);
        let summary = aggregator.current_month_summary().await.unwrap();
        assert!((summary.total_cost - 1.0).abs() < 1e-9);
        assert_eq!(summary.start, Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_top_tenants_ranked_and_truncated() {
        let (aggregator, ledger) = aggregator_at(june_10());
        ledger.record(event("gpt-4", Feature::Chat, Some("small"), 0.10)).await.unwrap();
        ledger.record(event("gpt-4", Feature::Chat, Some("big"), 0.50)).await.unwrap();
        ledger.record(event("gpt-4", Feature::Chat, Some("mid"), 0.30)).await.unwrap();
        // Untenanted spend ranks under the platform key
        ledger.record(event("gpt-4", Feature::Chat, None, 9.0)).await.unwrap();

        let top = aggregator.top_tenants(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].tenant_id, PLATFORM_TENANT);
        assert_eq!(top[1].tenant_id, "big");
    }

    #[tokio::test]
    async fn test_top_tenants_reports_engine_only_spend() {
        let (aggregator, ledger) = aggregator_at(june_10());
        ledger.record(event("gpt-4", Feature::Playground, None, 1.5)).await.unwrap();

        let top = aggregator.top_tenants(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].tenant_id, PLATFORM_TENANT);
        assert!((top[0].cost - 1.5).abs() < 1e-9);
    }
}
