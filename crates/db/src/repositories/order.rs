use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use orderlens_core::domain::order::Order;
use orderlens_core::feed::{FeedApp, FeedCustomer, FeedOrder};

use super::{ImportSummary, OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn import(&self, orders: &[FeedOrder]) -> Result<ImportSummary, RepositoryError> {
        let imported_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for order in orders {
            upsert_customer(&mut *tx, &order.customer).await?;
            if let Some(app) = &order.app {
                upsert_app(&mut *tx, app).await?;
            }
            upsert_item(&mut *tx, order).await?;
            upsert_order(&mut *tx, order, &imported_at).await?;
        }

        tx.commit().await?;
        Ok(ImportSummary::from_batch(orders))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, order_at, customer_id, item_price
             FROM customer_order
             ORDER BY order_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(order_from_row).collect()
    }
}

async fn upsert_customer(
    conn: &mut SqliteConnection,
    customer: &FeedCustomer,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO customer (id, name, email) VALUES (?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email",
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.email)
    .execute(conn)
    .await?;
    Ok(())
}

async fn upsert_app(conn: &mut SqliteConnection, app: &FeedApp) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO app (id, name) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
    )
    .bind(&app.id)
    .bind(&app.name)
    .execute(conn)
    .await?;
    Ok(())
}

async fn upsert_item(
    conn: &mut SqliteConnection,
    order: &FeedOrder,
) -> Result<(), RepositoryError> {
    let item = &order.item;
    sqlx::query(
        "INSERT INTO item (id, app_id, name, price, currency, category)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            app_id = COALESCE(excluded.app_id, item.app_id),
            name = excluded.name,
            price = excluded.price,
            currency = excluded.currency,
            category = excluded.category",
    )
    .bind(&item.id)
    .bind(order.app.as_ref().map(|app| app.id.as_str()))
    .bind(&item.name)
    .bind(to_sql_integer("item.price", item.price)?)
    .bind(&item.currency)
    .bind(&item.category)
    .execute(conn)
    .await?;
    Ok(())
}

async fn upsert_order(
    conn: &mut SqliteConnection,
    order: &FeedOrder,
    imported_at: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO customer_order (
            id,
            order_at,
            status,
            payment_method,
            customer_id,
            app_id,
            item_id,
            item_price,
            imported_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            order_at = excluded.order_at,
            status = excluded.status,
            payment_method = excluded.payment_method,
            customer_id = excluded.customer_id,
            app_id = excluded.app_id,
            item_id = excluded.item_id,
            item_price = excluded.item_price,
            imported_at = excluded.imported_at",
    )
    .bind(&order.id)
    .bind(order.order_at)
    .bind(&order.status)
    .bind(&order.payment_method)
    .bind(&order.customer.id)
    .bind(order.app.as_ref().map(|app| app.id.as_str()))
    .bind(&order.item.id)
    .bind(to_sql_integer("customer_order.item_price", order.item.price)?)
    .bind(imported_at)
    .execute(conn)
    .await?;
    Ok(())
}

fn order_from_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    let id: String = row.try_get("id")?;
    let customer_id: String = row.try_get("customer_id")?;
    let item_price = parse_u64("item_price", row.try_get("item_price")?)?;

    Ok(Order::new(id, row.try_get("order_at")?, customer_id, item_price))
}

fn to_sql_integer(column: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| {
        RepositoryError::Encode(format!(
            "value for `{column}` exceeds the SQLite integer range: {value}"
        ))
    })
}

fn parse_u64(column: &str, value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative integer): {value}"
        ))
    })
}
