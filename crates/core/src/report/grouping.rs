use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::domain::order::Order;
use crate::errors::DomainError;

/// UTC calendar month of an order, formatted `YYYY-MM`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey(String);

impl MonthKey {
    pub fn from_epoch_millis(epoch_millis: i64) -> Option<Self> {
        chrono::DateTime::from_timestamp_millis(epoch_millis)
            .map(|instant| Self(instant.format("%Y-%m").to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MonthKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Orders partitioned by month, each group in input order.
pub type MonthlyOrders<'a> = BTreeMap<MonthKey, Vec<&'a Order>>;

pub fn month_of(order: &Order) -> Result<MonthKey, DomainError> {
    MonthKey::from_epoch_millis(order.order_at).ok_or_else(|| {
        DomainError::malformed(format!(
            "order `{}` has timestamp {} which is not a valid instant",
            order.id.0, order.order_at
        ))
    })
}

pub fn group_by_month(orders: &[Order]) -> Result<MonthlyOrders<'_>, DomainError> {
    let mut grouped = MonthlyOrders::new();
    for order in orders {
        grouped.entry(month_of(order)?).or_default().push(order);
    }
    Ok(grouped)
}
