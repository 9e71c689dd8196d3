//! Dashboard report: monthly weight tiers and recency bucket counts.
//!
//! Both stages read the same order slice and group it themselves; neither depends on the other's
//! output. Emitted key order (months, tiers, scheme keys) is ascending by key and is not part of
//! the report contract.

pub mod grouping;
pub mod recency;
pub mod weights;

use serde::Serialize;
use tracing::debug;

use crate::domain::order::Order;
use crate::errors::DomainError;
use crate::feed::parse_order_feed;
use crate::thresholds::{RecencyScheme, ReportThresholds, WeightTiers};

pub use grouping::{group_by_month, month_of, MonthKey, MonthlyOrders};
pub use recency::{bucket, bucket_all, elapsed_days, latest_per_month, BucketCounts, DaysCounts};
pub use weights::{
    classify, monthly_totals, CountAndTotal, MonthlyTotals, MonthlyWeights,
    WeightedMonthlyDistribution,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub sorted_weights: WeightedMonthlyDistribution,
    pub days_counts: DaysCounts,
}

pub trait WeightEngine: Send + Sync {
    fn distribute(
        &self,
        orders: &[Order],
        tiers: &WeightTiers,
    ) -> Result<WeightedMonthlyDistribution, DomainError>;
}

pub trait RecencyEngine: Send + Sync {
    fn count(
        &self,
        orders: &[Order],
        schemes: &[RecencyScheme],
        base_date_ms: i64,
    ) -> Result<DaysCounts, DomainError>;
}

#[derive(Default)]
pub struct DeterministicWeightEngine;

impl WeightEngine for DeterministicWeightEngine {
    fn distribute(
        &self,
        orders: &[Order],
        tiers: &WeightTiers,
    ) -> Result<WeightedMonthlyDistribution, DomainError> {
        let grouped = group_by_month(orders)?;
        Ok(classify(&monthly_totals(&grouped), tiers))
    }
}

#[derive(Default)]
pub struct DeterministicRecencyEngine;

impl RecencyEngine for DeterministicRecencyEngine {
    fn count(
        &self,
        orders: &[Order],
        schemes: &[RecencyScheme],
        base_date_ms: i64,
    ) -> Result<DaysCounts, DomainError> {
        let grouped = group_by_month(orders)?;
        Ok(bucket_all(&latest_per_month(&grouped), schemes, base_date_ms))
    }
}

pub trait DashboardRuntime: Send + Sync {
    fn build_report(
        &self,
        orders: &[Order],
        thresholds: &ReportThresholds,
    ) -> Result<DashboardReport, DomainError>;
}

pub struct DeterministicDashboardRuntime<W, R> {
    weight_engine: W,
    recency_engine: R,
}

impl<W, R> DeterministicDashboardRuntime<W, R> {
    pub fn new(weight_engine: W, recency_engine: R) -> Self {
        Self { weight_engine, recency_engine }
    }
}

impl Default
    for DeterministicDashboardRuntime<DeterministicWeightEngine, DeterministicRecencyEngine>
{
    fn default() -> Self {
        Self::new(DeterministicWeightEngine, DeterministicRecencyEngine)
    }
}

impl<W, R> DashboardRuntime for DeterministicDashboardRuntime<W, R>
where
    W: WeightEngine,
    R: RecencyEngine,
{
    fn build_report(
        &self,
        orders: &[Order],
        thresholds: &ReportThresholds,
    ) -> Result<DashboardReport, DomainError> {
        let sorted_weights = self.weight_engine.distribute(orders, thresholds.weight_tiers())?;
        let days_counts = self.recency_engine.count(
            orders,
            thresholds.recency_schemes(),
            thresholds.base_date_ms(),
        )?;

        debug!(
            event_name = "report.build.completed",
            order_count = orders.len(),
            month_count = sorted_weights.len(),
            scheme_count = days_counts.len(),
            "dashboard report built"
        );

        Ok(DashboardReport { sorted_weights, days_counts })
    }
}

pub fn build_report(
    orders: &[Order],
    thresholds: &ReportThresholds,
) -> Result<DashboardReport, DomainError> {
    DeterministicDashboardRuntime::default().build_report(orders, thresholds)
}

/// Validates a raw feed document and builds the report from it.
pub fn build_report_from_feed(
    json: &str,
    thresholds: &ReportThresholds,
) -> Result<DashboardReport, DomainError> {
    let feed = parse_order_feed(json)?;
    build_report(&feed.to_orders(), thresholds)
}
