use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::report::grouping::{MonthKey, MonthlyOrders};
use crate::thresholds::WeightTiers;

/// Summed spend per customer, per month.
pub type MonthlyTotals = BTreeMap<MonthKey, BTreeMap<CustomerId, u64>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountAndTotal {
    pub count: u64,
    pub total: u64,
}

/// Tier name to members for one month. Tiers nobody fell into are absent.
pub type MonthlyWeights = BTreeMap<String, CountAndTotal>;

pub type WeightedMonthlyDistribution = BTreeMap<MonthKey, MonthlyWeights>;

/// Duplicate order ids are summed again; deduplication happens upstream of the report.
pub fn monthly_totals(grouped: &MonthlyOrders<'_>) -> MonthlyTotals {
    grouped
        .iter()
        .map(|(month, orders)| {
            let mut per_customer = BTreeMap::new();
            for order in orders {
                let total: &mut u64 = per_customer.entry(order.customer_id.clone()).or_default();
                *total = total.saturating_add(order.item_price);
            }
            (month.clone(), per_customer)
        })
        .collect()
}

/// Classifies each customer once per month on their monthly total.
pub fn classify(totals: &MonthlyTotals, tiers: &WeightTiers) -> WeightedMonthlyDistribution {
    totals
        .iter()
        .map(|(month, per_customer)| {
            let mut weights = MonthlyWeights::new();
            for amount in per_customer.values() {
                let entry = weights.entry(tiers.classify(*amount).name.clone()).or_default();
                entry.count += 1;
                entry.total = entry.total.saturating_add(*amount);
            }
            (month.clone(), weights)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::domain::order::Order;
    use crate::report::grouping::group_by_month;
    use crate::report::weights::{classify, monthly_totals, CountAndTotal};
    use crate::thresholds::{WeightTier, WeightTiers};

    const JAN: i64 = 1_704_067_200_000;
    const FEB: i64 = 1_706_745_600_000;

    fn weights_for<'a>(
        distribution: &'a super::WeightedMonthlyDistribution,
        month: &str,
    ) -> Option<&'a super::MonthlyWeights> {
        distribution.iter().find(|(key, _)| key.as_str() == month).map(|(_, weights)| weights)
    }

    #[test]
    fn customer_is_classified_on_monthly_total_not_per_order() {
        let orders =
            vec![Order::new("o-1", JAN, "A", 2100), Order::new("o-2", JAN + 1000, "A", 100)];
        let grouped = group_by_month(&orders).expect("valid");

        let distribution = classify(&monthly_totals(&grouped), &WeightTiers::default());
        let january = weights_for(&distribution, "2024-01").expect("january present");

        assert_eq!(january.len(), 1);
        assert_eq!(january.get("super_heavy"), Some(&CountAndTotal { count: 1, total: 2200 }));
    }

    #[test]
    fn small_orders_add_up_across_a_month() {
        let orders = vec![
            Order::new("o-1", JAN, "A", 600),
            Order::new("o-2", JAN, "A", 600),
            Order::new("o-3", FEB, "A", 600),
        ];
        let grouped = group_by_month(&orders).expect("valid");

        let distribution = classify(&monthly_totals(&grouped), &WeightTiers::default());

        assert_eq!(
            weights_for(&distribution, "2024-01").and_then(|weights| weights.get("heavy")),
            Some(&CountAndTotal { count: 1, total: 1200 })
        );
        assert_eq!(
            weights_for(&distribution, "2024-02").and_then(|weights| weights.get("light")),
            Some(&CountAndTotal { count: 1, total: 600 })
        );
    }

    #[test]
    fn tier_counts_sum_to_distinct_customers_and_empty_tiers_are_absent() {
        let orders = vec![
            Order::new("o-1", JAN, "A", 2000),
            Order::new("o-2", JAN, "B", 2500),
            Order::new("o-3", JAN, "C", 1500),
            Order::new("o-4", JAN, "D", 10),
            Order::new("o-5", JAN, "B", 1),
        ];
        let grouped = group_by_month(&orders).expect("valid");

        let distribution = classify(&monthly_totals(&grouped), &WeightTiers::default());
        let january = weights_for(&distribution, "2024-01").expect("january present");

        assert_eq!(january.get("super_heavy"), Some(&CountAndTotal { count: 1, total: 2501 }));
        assert_eq!(january.get("heavy"), Some(&CountAndTotal { count: 2, total: 3500 }));
        assert_eq!(january.get("super_light"), Some(&CountAndTotal { count: 1, total: 10 }));
        assert!(!january.contains_key("light"));
        assert_eq!(january.values().map(|entry| entry.count).sum::<u64>(), 4);
        assert!(january.values().all(|entry| entry.count >= 1));
    }

    #[test]
    fn duplicate_order_ids_are_counted_again() {
        let orders = vec![Order::new("dup", JAN, "A", 400), Order::new("dup", JAN, "A", 400)];
        let grouped = group_by_month(&orders).expect("valid");

        let totals = monthly_totals(&grouped);
        let january = totals.values().next().expect("one month");
        assert_eq!(january.values().copied().collect::<Vec<_>>(), vec![800]);
    }

    #[test]
    fn custom_tier_tables_drive_classification() {
        let tiers =
            WeightTiers::new(vec![WeightTier::new("whale", 10_000), WeightTier::new("rest", 0)])
                .expect("valid tiers");
        let orders = vec![Order::new("o-1", JAN, "A", 9_000), Order::new("o-2", JAN, "B", 12_000)];
        let grouped = group_by_month(&orders).expect("valid");

        let distribution = classify(&monthly_totals(&grouped), &tiers);
        let january = weights_for(&distribution, "2024-01").expect("january present");

        assert_eq!(january.get("whale"), Some(&CountAndTotal { count: 1, total: 12_000 }));
        assert_eq!(january.get("rest"), Some(&CountAndTotal { count: 1, total: 9_000 }));
    }
}
