use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{CartItem, CartItemWithProduct};
use crate::domain::value_objects::Quantity;
use crate::repository::{CartRepository, RepoResult};

const CART_ITEM_COLUMNS: &str = "id, user_id, product_id, quantity, created_at";

#[derive(Clone, Debug)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> RepoResult<CartItem> {
        let sql = format!(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, created_at) VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             RETURNING {CART_ITEM_COLUMNS}"
        );
        let item = sqlx::query_as::<_, CartItem>(&sql)
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(product_id)
            .bind(quantity.get())
            .fetch_one(&self.pool)
            .await?;
        Ok(item)
    }

    async fn get_item(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<Option<CartItem>> {
        let sql = format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE user_id = $1 AND product_id = $2");
        let item = sqlx::query_as::<_, CartItem>(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn get_item_by_id(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<Option<CartItem>> {
        let sql = format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1 AND user_id = $2");
        let item = sqlx::query_as::<_, CartItem>(&sql)
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn update_item(&self, item: &CartItem) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE cart_items SET product_id = $3, quantity = $4 WHERE id = $1 AND user_id = $2")
            .bind(item.id)
            .bind(item.user_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn remove_checked_out(&self, user_id: Uuid, items: &[CartItem]) -> RepoResult<u64> {
        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let quantities: Vec<i32> = items.iter().map(|item| item.quantity).collect();
        let mut tx = self.pool.begin().await?;

        // delete first so the decrement below only sees rows that keep a positive quantity
        let removed = sqlx::query(
            "DELETE FROM cart_items c USING UNNEST($2::uuid[], $3::int4[]) AS o(id, quantity) \
             WHERE c.id = o.id AND c.user_id = $1 AND c.quantity <= o.quantity",
        )
        .bind(user_id)
        .bind(&ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "UPDATE cart_items c SET quantity = c.quantity - o.quantity \
             FROM UNNEST($2::uuid[], $3::int4[]) AS o(id, quantity) \
             WHERE c.id = o.id AND c.user_id = $1",
        )
        .bind(user_id)
        .bind(&ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn list_with_products(&self, user_id: Uuid) -> RepoResult<Vec<CartItemWithProduct>> {
        let rows = sqlx::query_as::<_, CartItemWithProduct>(
            "SELECT ci.id, ci.user_id, ci.product_id, ci.quantity, ci.created_at, \
                    p.name AS product_name, p.price AS product_price, p.stock AS product_stock \
             FROM cart_items ci JOIN products p ON p.id = ci.product_id \
             WHERE ci.user_id = $1 ORDER BY ci.created_at, ci.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
