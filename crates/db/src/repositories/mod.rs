use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use orderlens_core::domain::order::Order;
use orderlens_core::feed::FeedOrder;

pub mod memory;
pub mod order;

pub use memory::InMemoryOrderRepository;
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Distinct entities touched by one import batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub customers: usize,
    pub apps: usize,
    pub items: usize,
    pub orders: usize,
}

impl ImportSummary {
    pub fn from_batch(orders: &[FeedOrder]) -> Self {
        let mut customers = HashSet::new();
        let mut apps = HashSet::new();
        let mut items = HashSet::new();
        let mut order_ids = HashSet::new();

        for order in orders {
            customers.insert(order.customer.id.as_str());
            if let Some(app) = &order.app {
                apps.insert(app.id.as_str());
            }
            items.insert(order.item.id.as_str());
            order_ids.insert(order.id.as_str());
        }

        Self {
            customers: customers.len(),
            apps: apps.len(),
            items: items.len(),
            orders: order_ids.len(),
        }
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Upserts every entity in the batch by id; either the whole batch lands or none of it does.
    async fn import(&self, orders: &[FeedOrder]) -> Result<ImportSummary, RepositoryError>;

    /// All stored orders, ascending by `order_at` then id.
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use orderlens_core::feed::parse_order_feed;

    use super::ImportSummary;

    #[test]
    fn summary_counts_distinct_ids_per_entity() {
        let feed = parse_order_feed(
            r#"{"orders":[
                {"id":"o-1","orderAt":1,"customer":{"id":"c-1"},"app":{"id":"a-1"},
                 "item":{"id":"i-1","price":100}},
                {"id":"o-2","orderAt":2,"customer":{"id":"c-1"},"item":{"id":"i-2","price":200}},
                {"id":"o-2","orderAt":3,"customer":{"id":"c-2"},"app":{"id":"a-1"},
                 "item":{"id":"i-1","price":100}}
            ]}"#,
        )
        .expect("feed");

        assert_eq!(ImportSummary::from_batch(&feed.orders), ImportSummary {
            customers: 2,
            apps: 1,
            items: 2,
            orders: 2,
        });
    }
}
