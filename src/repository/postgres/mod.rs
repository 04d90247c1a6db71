//! Postgres backend

mod cart;
mod order;
mod product;
mod user;

use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::ShopError;

pub use cart::PgCartRepository;
pub use order::PgOrderRepository;
pub use product::PgProductRepository;
pub use user::PgUserRepository;

/// Reads a TEXT column into one of the domain's string-backed enums.
fn decode_text<T>(row: &PgRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr<Err = ShopError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|source: ShopError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    })
}

/// `%term%` for ILIKE with the wildcard characters of `term` escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}
