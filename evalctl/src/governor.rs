//! Monthly budget governance: threshold alerts and month-end forecasting.
//!
//! The budget is one scalar in the [`BudgetStore`]; spend comes from the
//! aggregator's current-month summary. Alerts are a stateless projection of
//! (spend, budget) at read time, recomputed on every request and never
//! persisted, so there is no alert state to migrate or reset at month
//! boundaries.
//!
//! Reads of the budget scalar are fail-open: if the store is unreachable the
//! governor reports against the configured default rather than failing the
//! whole costs surface.

use crate::{
    aggregator::CostAggregator,
    errors::{Error, Result},
    store::BudgetStore,
    types::Clock,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

pub const DEFAULT_MONTHLY_BUDGET: f64 = 2000.0;

/// Alert thresholds as percentages of the monthly budget.
pub const ALERT_THRESHOLDS: [u8; 3] = [80, 90, 100];

/// The budget against this month's spend.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BudgetStatus {
    pub monthly_budget: f64,
    pub current_spend: f64,
    pub remaining: f64,
    /// Spend as a percentage of budget
    pub percent_used: f64,
}

/// One threshold's standing at read time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BudgetAlert {
    /// Threshold as a percentage of the monthly budget
    pub threshold: u8,
    /// Absolute spend at which this threshold trips
    pub amount: f64,
    pub triggered: bool,
    /// Evaluation time when triggered, absent otherwise
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Straight-line projection of this month's spend to month end.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpendForecast {
    pub current_spend: f64,
    pub projected_month_end: f64,
    pub monthly_budget: f64,
    pub projected_over_budget: bool,
}

pub struct BudgetGovernor {
    store: Arc<dyn BudgetStore>,
    aggregator: CostAggregator,
    clock: Arc<dyn Clock>,
    default_monthly: f64,
}

fn days_in_month(now: DateTime<Utc>) -> u32 {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

fn percent_used(spend: f64, budget: f64) -> f64 {
    if budget > 0.0 {
        spend / budget * 100.0
    } else if spend > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

impl BudgetGovernor {
    pub fn new(
        store: Arc<dyn BudgetStore>,
        aggregator: CostAggregator,
        clock: Arc<dyn Clock>,
        default_monthly: f64,
    ) -> Self {
        Self {
            store,
            aggregator,
            clock,
            default_monthly,
        }
    }

    /// The effective monthly budget: the stored value, or the configured
    /// default when unset or unreadable.
    pub async fn monthly_budget(&self) -> f64 {
        match self.store.get().await {
            Ok(Some(amount)) => amount,
            Ok(None) => self.default_monthly,
            Err(e) => {
                warn!(error = %e, "budget store unreadable, using default budget");
                self.default_monthly
            }
        }
    }

    /// Replace the monthly budget. Zero is allowed (a freeze); negative and
    /// non-finite amounts are not.
    pub async fn set_budget(&self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::BadRequest {
                message: format!("monthly budget must be a non-negative number, got {amount}"),
            });
        }
        self.store.set(amount).await?;
        Ok(())
    }

    pub async fn status(&self) -> Result<BudgetStatus> {
        let monthly_budget = self.monthly_budget().await;
        let current_spend = self.aggregator.current_month_summary().await?.total_cost;
        Ok(BudgetStatus {
            monthly_budget,
            current_spend,
            remaining: monthly_budget - current_spend,
            percent_used: percent_used(current_spend, monthly_budget),
        })
    }

    /// All thresholds with their standing against this month's spend.
    pub async fn alerts(&self) -> Result<Vec<BudgetAlert>> {
        let monthly_budget = self.monthly_budget().await;
        let current_spend = self.aggregator.current_month_summary().await?.total_cost;
        let now = self.clock.now();

        let used = percent_used(current_spend, monthly_budget);
        Ok(ALERT_THRESHOLDS
            .iter()
            .map(|&threshold| {
                let triggered = used >= threshold as f64;
                BudgetAlert {
                    threshold,
                    amount: monthly_budget * threshold as f64 / 100.0,
                    triggered,
                    triggered_at: triggered.then_some(now),
                }
            })
            .collect())
    }

    /// Project month-end spend as `spend / days_elapsed * days_in_month`.
    pub async fn forecast(&self) -> Result<SpendForecast> {
        let monthly_budget = self.monthly_budget().await;
        let current_spend = self.aggregator.current_month_summary().await?.total_cost;
        let now = self.clock.now();

        let days_elapsed = now.day().max(1);
        let projected_month_end =
            current_spend / days_elapsed as f64 * days_in_month(now) as f64;

        Ok(SpendForecast {
            current_spend,
            projected_month_end,
            monthly_budget,
            projected_over_budget: projected_month_end > monthly_budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Feature, NewUsageEvent, UsageLedger};
    use crate::store::memory::{InMemoryBudgetStore, InMemoryUsageStore};
    use crate::test_utils::FixedClock;
    use chrono::TimeZone;

    fn june_10() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    async fn governor_with_spend(now: DateTime<Utc>, spend: f64) -> BudgetGovernor {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(now));
        let ledger = UsageLedger::new(Arc::new(InMemoryUsageStore::default()), clock.clone());
        if spend > 0.0 {
            ledger
                .record(NewUsageEvent {
                    tenant_id: None,
                    model: "gpt-4".to_string(),
                    feature: Feature::Playground,
                    tokens_in: 100,
                    tokens_out: 100,
                    cost: spend,
                    latency_ms: None,
                })
                .await
                .unwrap();
        }
        BudgetGovernor::new(
            Arc::new(InMemoryBudgetStore::default()),
            CostAggregator::new(ledger, clock.clone()),
            clock,
            DEFAULT_MONTHLY_BUDGET,
        )
    }

    #[tokio::test]
    async fn test_default_budget_when_unset() {
        let governor = governor_with_spend(june_10(), 0.0).await;
        assert_eq!(governor.monthly_budget().await, DEFAULT_MONTHLY_BUDGET);
    }

    #[tokio::test]
    async fn test_set_budget_roundtrip_and_validation() {
        let governor = governor_with_spend(june_10(), 0.0).await;
        governor.set_budget(1500.0).await.unwrap();
        assert_eq!(governor.monthly_budget().await, 1500.0);

        assert!(matches!(
            governor.set_budget(-1.0).await,
            Err(Error::BadRequest { .. })
        ));
        assert!(matches!(
            governor.set_budget(f64::NAN).await,
            Err(Error::BadRequest { .. })
        ));
        // Zero is a valid freeze
        governor.set_budget(0.0).await.unwrap();
        assert_eq!(governor.monthly_budget().await, 0.0);
    }

    #[tokio::test]
    async fn test_status_reflects_spend() {
        let governor = governor_with_spend(june_10(), 500.0).await;
        governor.set_budget(1000.0).await.unwrap();

        let status = governor.status().await.unwrap();
        assert_eq!(status.monthly_budget, 1000.0);
        assert!((status.current_spend - 500.0).abs() < 1e-9);
        assert!((status.remaining - 500.0).abs() < 1e-9);
        assert!((status.percent_used - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_only_crossed_thresholds_trigger() {
        let governor = governor_with_spend(june_10(), 850.0).await;
        governor.set_budget(1000.0).await.unwrap();

        let alerts = governor.alerts().await.unwrap();
        assert_eq!(alerts.len(), 3);

        let eighty = &alerts[0];
        assert_eq!(eighty.threshold, 80);
        assert!((eighty.amount - 800.0).abs() < 1e-9);
        assert!(eighty.triggered);
        assert_eq!(eighty.triggered_at, Some(june_10()));

        assert!(!alerts[1].triggered);
        assert!(alerts[1].triggered_at.is_none());
        assert!(!alerts[2].triggered);
    }

    #[tokio::test]
    async fn test_alerts_are_recomputed_not_latched() {
        let governor = governor_with_spend(june_10(), 850.0).await;
        governor.set_budget(1000.0).await.unwrap();
        assert!(governor.alerts().await.unwrap()[0].triggered);

        // Raising the budget clears the projection on the next read
        governor.set_budget(10_000.0).await.unwrap();
        assert!(!governor.alerts().await.unwrap()[0].triggered);
    }

    #[tokio::test]
    async fn test_forecast_straight_line() {
        // 100 spent by June 10 projects to 300 over the 30-day month
        let governor = governor_with_spend(june_10(), 100.0).await;
        let forecast = governor.forecast().await.unwrap();
        assert!((forecast.projected_month_end - 300.0).abs() < 1e-9);
        assert!(!forecast.projected_over_budget);
    }

    #[tokio::test]
    async fn test_forecast_flags_projected_overrun() {
        let governor = governor_with_spend(june_10(), 100.0).await;
        governor.set_budget(250.0).await.unwrap();
        let forecast = governor.forecast().await.unwrap();
        assert!(forecast.projected_over_budget);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(june_10()), 30);
        assert_eq!(days_in_month(Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap()), 29);
        assert_eq!(days_in_month(Utc.with_ymd_and_hms(2023, 12, 25, 0, 0, 0).unwrap()), 31);
    }
}
