//! Catalog and stock

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{search_term, Paginated};
use crate::domain::aggregates::Product;
use crate::domain::events::ProductEvent;
use crate::domain::value_objects::{Money, Pagination, Quantity};
use crate::publisher::EventPublisher;
use crate::repository::{ProductPatch, ProductQuery, ProductRepository, ProductSort, RepositoryError};
use crate::{Result, ShopError};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<Uuid>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
    pub order_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StockRequest {
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub stock: i32,
}

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    events: Arc<dyn EventPublisher>,
}

/// Prices are stored as NUMERIC(12, 2).
const PRICE_SCALE: u32 = 2;
const PRICE_DIGITS: i64 = 999_999_999_999;

/// Positive, at most two decimals and within the column range, so every
/// backend stores exactly the amount that was sent.
fn valid_price(price: Decimal) -> Result<Money> {
    let max = Decimal::new(PRICE_DIGITS, PRICE_SCALE);
    if price <= Decimal::ZERO || price > max || price.normalize().scale() > PRICE_SCALE {
        return Err(ShopError::InvalidPrice);
    }
    Ok(Money::new(price))
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self { products, events }
    }

    pub async fn create_product(&self, req: CreateProductRequest) -> Result<Product> {
        req.validate()?;
        let price = valid_price(req.price)?;

        let mut product = Product::create(req.name.trim(), price, req.stock);
        product.description = req.description.unwrap_or_default();
        product.category_id = req.category_id;
        product.image_url = req.image_url;

        self.products.create(&product).await?;
        info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product> {
        if id.is_nil() {
            return Err(ShopError::ProductIdRequired);
        }
        self.products.get_by_id(id).await?.ok_or(ShopError::ProductNotFound)
    }

    pub async fn list_products(&self, filter: ProductFilter) -> Result<Paginated<Product>> {
        if filter.min_price.is_some_and(|p| p.is_sign_negative()) || filter.max_price.is_some_and(|p| p.is_sign_negative()) {
            return Err(ShopError::InvalidPrice);
        }
        let sort = match filter.order_by.as_deref().map(str::trim) {
            None | Some("") => ProductSort::default(),
            Some(raw) => raw.parse()?,
        };
        let page = Pagination::from_optional(filter.limit, filter.offset);
        let query = ProductQuery {
            category_id: filter.category_id,
            min_price: filter.min_price.map(Money::new),
            max_price: filter.max_price.map(Money::new),
            search: search_term(filter.search),
            in_stock: filter.in_stock,
            sort,
            page,
        };

        let result = self.products.list(&query).await?;
        Ok(Paginated::new(result, page))
    }

    pub async fn update_product(&self, id: Uuid, req: UpdateProductRequest) -> Result<Product> {
        if id.is_nil() {
            return Err(ShopError::ProductIdRequired);
        }
        req.validate()?;
        let patch = ProductPatch {
            name: req.name.map(|name| name.trim().to_string()),
            description: req.description,
            price: req.price.map(valid_price).transpose()?,
            stock: req.stock,
            category_id: req.category_id,
            image_url: req.image_url,
        };
        if patch.is_empty() {
            return Err(ShopError::NoFieldsToUpdate);
        }

        let product = self.products.update(id, &patch).await?.ok_or(ShopError::ProductNotFound)?;
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        if id.is_nil() {
            return Err(ShopError::ProductIdRequired);
        }
        let deleted = self.products.delete(id).await.map_err(|e| match e {
            RepositoryError::InvalidReference(_) => ShopError::ProductInUse,
            other => ShopError::Storage(other),
        })?;
        if !deleted {
            return Err(ShopError::ProductNotFound);
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn check_availability(&self, id: Uuid, quantity: i32) -> Result<bool> {
        let quantity = Quantity::new(quantity)?;
        let product = self.get_product(id).await?;
        Ok(product.has_stock_for(quantity))
    }

    /// Takes `quantity` off the shelf, or nothing at all when short.
    pub async fn reserve_stock(&self, id: Uuid, quantity: i32) -> Result<StockLevel> {
        if id.is_nil() {
            return Err(ShopError::ProductIdRequired);
        }
        let qty = Quantity::new(quantity)?;

        let Some(remaining) = self.products.reserve_stock(id, qty).await? else {
            return match self.products.get_by_id(id).await? {
                Some(_) => Err(ShopError::InsufficientStock),
                None => Err(ShopError::ProductNotFound),
            };
        };

        info!(product_id = %id, quantity, remaining, "stock reserved");
        self.events
            .publish(ProductEvent::StockReserved { product_id: id, quantity, remaining }.into())
            .await;
        Ok(StockLevel { product_id: id, stock: remaining })
    }

    pub async fn release_stock(&self, id: Uuid, quantity: i32) -> Result<StockLevel> {
        if id.is_nil() {
            return Err(ShopError::ProductIdRequired);
        }
        let qty = Quantity::new(quantity)?;

        let remaining = self
            .products
            .release_stock(id, qty)
            .await
            .map_err(|e| match e {
                RepositoryError::OutOfRange => ShopError::InvalidQuantity,
                other => ShopError::Storage(other),
            })?
            .ok_or(ShopError::ProductNotFound)?;

        info!(product_id = %id, quantity, remaining, "stock released");
        self.events
            .publish(ProductEvent::StockReleased { product_id: id, quantity, remaining }.into())
            .await;
        Ok(StockLevel { product_id: id, stock: remaining })
    }
}
