use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::domain::customer::CustomerId;
use crate::domain::order::Order;
use crate::report::grouping::{MonthKey, MonthlyOrders};
use crate::thresholds::{RecencyScheme, BUCKET_COUNT};

pub const MILLIS_PER_DAY: u128 = 86_400_000;

/// Each customer's latest order within each month they ordered in.
pub type PerMonthLatestOrder<'a> = BTreeMap<MonthKey, BTreeMap<&'a CustomerId, &'a Order>>;

/// Scheme key (`7week`) to its bucket counts.
pub type DaysCounts = BTreeMap<String, BucketCounts>;

/// Counts for the five buckets of one scheme, serialized as `{"1": n, .., "5": n}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketCounts([u64; BUCKET_COUNT]);

impl BucketCounts {
    pub fn from_counts(counts: [u64; BUCKET_COUNT]) -> Self {
        Self(counts)
    }

    /// Count for a 1-based bucket; out-of-range buckets read as zero.
    pub fn get(&self, bucket: usize) -> u64 {
        bucket.checked_sub(1).and_then(|index| self.0.get(index)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    fn increment(&mut self, bucket: usize) {
        if let Some(slot) = bucket.checked_sub(1).and_then(|index| self.0.get_mut(index)) {
            *slot += 1;
        }
    }
}

impl Serialize for BucketCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BUCKET_COUNT))?;
        for (index, count) in self.0.iter().enumerate() {
            map.serialize_entry(&(index + 1).to_string(), count)?;
        }
        map.end()
    }
}

/// Keeps the order with the greatest `order_at` per (month, customer). On equal timestamps the
/// later order in input order wins.
pub fn latest_per_month<'a>(grouped: &MonthlyOrders<'a>) -> PerMonthLatestOrder<'a> {
    grouped
        .iter()
        .map(|(month, orders)| {
            let mut latest: BTreeMap<&'a CustomerId, &'a Order> = BTreeMap::new();
            for order in orders.iter().copied() {
                let slot = latest.entry(&order.customer_id).or_insert(order);
                if order.order_at >= slot.order_at {
                    *slot = order;
                }
            }
            (month.clone(), latest)
        })
        .collect()
}

/// Whole days between the base date and an order, rounded up. Orders after the base date count
/// the same as orders the same distance before it.
pub fn elapsed_days(base_date_ms: i64, order_at: i64) -> u64 {
    let distance = (i128::from(base_date_ms) - i128::from(order_at)).unsigned_abs();
    let days = distance.div_ceil(MILLIS_PER_DAY);
    u64::try_from(days).unwrap_or(u64::MAX)
}

pub fn bucket(
    latest: &PerMonthLatestOrder<'_>,
    scheme: &RecencyScheme,
    base_date_ms: i64,
) -> BucketCounts {
    let mut counts = BucketCounts::default();
    for order in latest.values().flat_map(|per_customer| per_customer.values()) {
        counts.increment(scheme.bucket(elapsed_days(base_date_ms, order.order_at)));
    }
    counts
}

pub fn bucket_all(
    latest: &PerMonthLatestOrder<'_>,
    schemes: &[RecencyScheme],
    base_date_ms: i64,
) -> DaysCounts {
    schemes.iter().map(|scheme| (scheme.key(), bucket(latest, scheme, base_date_ms))).collect()
}
