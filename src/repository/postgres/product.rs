use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::like_pattern;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Quantity;
use crate::repository::{Page, ProductPatch, ProductQuery, ProductRepository, RepoResult};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, category_id, image_url, created_at, updated_at";
const PRODUCT_FILTER: &str = "($1::uuid IS NULL OR category_id = $1) \
     AND ($2::numeric IS NULL OR price >= $2) \
     AND ($3::numeric IS NULL OR price <= $3) \
     AND ($4::text IS NULL OR name ILIKE $4 OR description ILIKE $4) \
     AND ($5::bool IS NULL OR (stock > 0) = $5)";

#[derive(Clone, Debug)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, stock, category_id, image_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(&product.image_url)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(product)
    }

    async fn list(&self, query: &ProductQuery) -> RepoResult<Page<Product>> {
        let search = query.search.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {PRODUCT_FILTER}"))
            .bind(query.category_id)
            .bind(query.min_price)
            .bind(query.max_price)
            .bind(&search)
            .bind(query.in_stock)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {PRODUCT_FILTER} ORDER BY {} LIMIT $6 OFFSET $7",
            query.sort.order_clause()
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(query.category_id)
            .bind(query.min_price)
            .bind(query.max_price)
            .bind(&search)
            .bind(query.in_stock)
            .bind(query.page.limit)
            .bind(query.page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { items: products, total })
    }

    async fn update(&self, id: Uuid, patch: &ProductPatch) -> RepoResult<Option<Product>> {
        let sql = format!(
            "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
             price = COALESCE($4, price), stock = COALESCE($5, stock), category_id = COALESCE($6, category_id), \
             image_url = COALESCE($7, image_url), updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.description)
            .bind(patch.price)
            .bind(patch.stock)
            .bind(patch.category_id)
            .bind(&patch.image_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reserve_stock(&self, id: Uuid, quantity: Quantity) -> RepoResult<Option<i32>> {
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2 RETURNING stock",
        )
        .bind(id)
        .bind(quantity.get())
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining)
    }

    async fn release_stock(&self, id: Uuid, quantity: Quantity) -> RepoResult<Option<i32>> {
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1 RETURNING stock",
        )
        .bind(id)
        .bind(quantity.get())
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining)
    }
}
