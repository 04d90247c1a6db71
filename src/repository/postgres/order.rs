use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::decode_text;
use crate::domain::aggregates::{Order, OrderItem, OrderStatus};
use crate::domain::value_objects::ShippingAddress;
use crate::repository::{OrderQuery, OrderRepository, Page, RepoResult};

const ORDER_COLUMNS: &str =
    "id, user_id, status, total_amount, shipping_address, payment_method, created_at, updated_at";
const ORDER_FILTER: &str = "($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)";

#[derive(Clone, Debug)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn attach_items(&self, orders: &mut [Order]) -> RepoResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, quantity, price, created_at FROM order_items \
             WHERE order_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in orders.iter_mut() {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            status: decode_text(row, "status")?,
            total_amount: row.try_get("total_amount")?,
            shipping_address: row.try_get::<Json<ShippingAddress>, _>("shipping_address")?.0,
            payment_method: decode_text(row, "payment_method")?,
            items: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: &Order) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, user_id, status, total_amount, shipping_address, payment_method, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, price, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(order) = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let mut orders = [order];
        self.attach_items(&mut orders).await?;
        let [order] = orders;
        Ok(Some(order))
    }

    async fn list(&self, query: &OrderQuery) -> RepoResult<Page<Order>> {
        let status = query.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {ORDER_FILTER}"))
            .bind(query.user_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {ORDER_FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let mut orders = sqlx::query_as::<_, Order>(&sql)
            .bind(query.user_id)
            .bind(status)
            .bind(query.page.limit)
            .bind(query.page.offset)
            .fetch_all(&self.pool)
            .await?;
        self.attach_items(&mut orders).await?;

        Ok(Page { items: orders, total })
    }

    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
