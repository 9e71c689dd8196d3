use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Normalized order record consumed by the report stages.
///
/// `order_at` is kept as epoch milliseconds exactly as the upstream feed delivers it; whether it
/// names a representable instant is checked when the order is grouped, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Order {
    pub id: OrderId,
    pub order_at: i64,
    pub customer_id: CustomerId,
    pub item_price: u64,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        order_at: i64,
        customer_id: impl Into<String>,
        item_price: u64,
    ) -> Self {
        Self {
            id: OrderId(id.into()),
            order_at,
            customer_id: CustomerId(customer_id.into()),
            item_price,
        }
    }

    pub fn ordered_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.order_at)
    }
}
