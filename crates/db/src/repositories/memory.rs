use std::collections::HashMap;

use tokio::sync::RwLock;

use orderlens_core::domain::order::Order;
use orderlens_core::feed::{FeedApp, FeedCustomer, FeedItem, FeedOrder};

use super::{ImportSummary, OrderRepository, RepositoryError};

#[derive(Default)]
struct OrderStore {
    customers: HashMap<String, FeedCustomer>,
    apps: HashMap<String, FeedApp>,
    items: HashMap<String, FeedItem>,
    orders: HashMap<String, FeedOrder>,
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    store: RwLock<OrderStore>,
}

#[cfg(test)]
impl InMemoryOrderRepository {
    pub async fn customer_count(&self) -> usize {
        self.store.read().await.customers.len()
    }

    pub async fn app_count(&self) -> usize {
        self.store.read().await.apps.len()
    }

    pub async fn item_count(&self) -> usize {
        self.store.read().await.items.len()
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn import(&self, orders: &[FeedOrder]) -> Result<ImportSummary, RepositoryError> {
        let mut store = self.store.write().await;
        for order in orders {
            store.customers.insert(order.customer.id.clone(), order.customer.clone());
            if let Some(app) = &order.app {
                store.apps.insert(app.id.clone(), app.clone());
            }
            store.items.insert(order.item.id.clone(), order.item.clone());
            store.orders.insert(order.id.clone(), order.clone());
        }
        Ok(ImportSummary::from_batch(orders))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let store = self.store.read().await;
        let mut orders: Vec<Order> = store.orders.values().map(FeedOrder::to_order).collect();
        orders.sort_by(|left, right| {
            left.order_at.cmp(&right.order_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use orderlens_core::domain::order::Order;
    use orderlens_core::feed::parse_order_feed;

    use super::InMemoryOrderRepository;
    use crate::repositories::{ImportSummary, OrderRepository};

    #[tokio::test]
    async fn in_memory_repo_upserts_and_lists_in_time_order() {
        let repo = InMemoryOrderRepository::default();
        let feed = parse_order_feed(
            r#"{"orders":[
                {"id":"o-2","orderAt":20,"customer":{"id":"c-1"},"app":{"id":"a-1"},
                 "item":{"id":"i-1","price":100}},
                {"id":"o-1","orderAt":10,"customer":{"id":"c-2"},"item":{"id":"i-1","price":100}}
            ]}"#,
        )
        .expect("feed");

        let summary = repo.import(&feed.orders).await.expect("import");
        assert_eq!(summary, ImportSummary { customers: 2, apps: 1, items: 1, orders: 2 });

        repo.import(&feed.orders).await.expect("reimport");

        assert_eq!(repo.customer_count().await, 2);
        assert_eq!(repo.app_count().await, 1);
        assert_eq!(repo.item_count().await, 1);
        assert_eq!(repo.list_orders().await.expect("list"), vec![
            Order::new("o-1", 10, "c-2", 100),
            Order::new("o-2", 20, "c-1", 100),
        ]);
    }
}
