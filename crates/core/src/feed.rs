//! Upstream order feed boundary.
//!
//! The feed is the JSON document the order API (or its file export) delivers: a `meta` block and
//! an `orders` array of nested records. Everything is checked here against a strict shape before
//! any of it reaches the report stages; a single bad record rejects the whole document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::order::Order;
use crate::errors::DomainError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMeta {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub is_success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCustomer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedApp {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price: u64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// One order as the feed carries it, with its customer, app, and item embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedOrder {
    pub id: String,
    pub order_at: i64,
    #[serde(default)]
    pub status: Option<String>,
    pub customer: FeedCustomer,
    #[serde(default)]
    pub app: Option<FeedApp>,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub item: FeedItem,
}

impl FeedOrder {
    pub fn to_order(&self) -> Order {
        Order::new(self.id.clone(), self.order_at, self.customer.id.clone(), self.item.price)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderFeed {
    pub meta: FeedMeta,
    pub orders: Vec<FeedOrder>,
}

impl OrderFeed {
    pub fn to_orders(&self) -> Vec<Order> {
        self.orders.iter().map(FeedOrder::to_order).collect()
    }
}

pub fn parse_order_feed(json: &str) -> Result<OrderFeed, DomainError> {
    let document: Value = serde_json::from_str(json)
        .map_err(|error| DomainError::malformed(format!("feed is not valid JSON: {error}")))?;

    let Some(object) = document.as_object() else {
        return Err(DomainError::malformed("invalid raw data format: feed must be a JSON object"));
    };

    let meta = match object.get("meta") {
        None | Some(Value::Null) => FeedMeta::default(),
        Some(meta) => serde_json::from_value(meta.clone())
            .map_err(|error| DomainError::malformed(format!("feed meta is invalid: {error}")))?,
    };

    let Some(Value::Array(raw_orders)) = object.get("orders") else {
        return Err(DomainError::malformed("invalid raw data format: `orders` must be an array"));
    };

    let orders = raw_orders
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_feed_order(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OrderFeed { meta, orders })
}

fn parse_feed_order(index: usize, raw: &Value) -> Result<FeedOrder, DomainError> {
    let order: FeedOrder = serde_json::from_value(raw.clone())
        .map_err(|error| DomainError::malformed(format!("order #{index}: {error}")))?;

    let blank = [
        ("id", order.id.as_str()),
        ("customer.id", order.customer.id.as_str()),
        ("item.id", order.item.id.as_str()),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());
    if let Some((field, _)) = blank {
        return Err(DomainError::malformed(format!("order #{index}: `{field}` must not be empty")));
    }
    ensure_valid_instant(index, order.order_at)?;

    Ok(order)
}

fn ensure_valid_instant(index: usize, order_at: i64) -> Result<(), DomainError> {
    match chrono::DateTime::from_timestamp_millis(order_at) {
        Some(_) => Ok(()),
        None => Err(DomainError::malformed(format!(
            "order #{index}: `orderAt` {order_at} is not a valid instant"
        ))),
    }
}

/// Parses a flat JSON array of normalized records (`id`, `orderAt`, `customerId`, `itemPrice`).
pub fn parse_order_records(json: &str) -> Result<Vec<Order>, DomainError> {
    let document: Value = serde_json::from_str(json)
        .map_err(|error| DomainError::malformed(format!("records are not valid JSON: {error}")))?;

    let Value::Array(raw_orders) = document else {
        return Err(DomainError::malformed("invalid raw data format: records must be an array"));
    };

    raw_orders
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let order = serde_json::from_value::<Order>(raw)
                .map_err(|error| DomainError::malformed(format!("order #{index}: {error}")))?;
            ensure_valid_instant(index, order.order_at)?;
            Ok(order)
        })
        .collect()
}
