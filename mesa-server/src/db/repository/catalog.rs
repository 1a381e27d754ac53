//! Catalog Repository (products + menu packages)
//!
//! Catalog CRUD lives outside the engine; these are the lookups the cart
//! needs for price/name snapshots, plus the `image_url` scan feeding the
//! orphan-file sweep. Seed helpers for products and menus exist so tests
//! and fixtures can populate the catalog.

use super::{RepoError, RepoResult};
use shared::models::{Menu, Product};
use sqlx::{Sqlite, SqlitePool};

pub async fn find_product<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(
        "SELECT id, name, price, is_available, image_url, created_at, updated_at FROM product WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn find_menu<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Menu>> {
    let row = sqlx::query_as::<_, Menu>(
        "SELECT id, name, price, is_available, image_url, created_at, updated_at FROM menu WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn create_product(
    pool: &SqlitePool,
    name: &str,
    price: f64,
    image_url: Option<&str>,
) -> RepoResult<Product> {
    if price < 0.0 {
        return Err(RepoError::Validation("Price cannot be negative".into()));
    }
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO product (id, name, price, is_available, image_url, created_at, updated_at) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
    )
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(image_url)
    .bind(now)
    .execute(pool)
    .await?;
    find_product(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn create_menu(
    pool: &SqlitePool,
    name: &str,
    price: f64,
    image_url: Option<&str>,
) -> RepoResult<Menu> {
    if price < 0.0 {
        return Err(RepoError::Validation("Price cannot be negative".into()));
    }
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO menu (id, name, price, is_available, image_url, created_at, updated_at) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
    )
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(image_url)
    .bind(now)
    .execute(pool)
    .await?;
    find_menu(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create menu".into()))
}

pub async fn set_product_availability(
    pool: &SqlitePool,
    id: i64,
    available: bool,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE product SET is_available = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(available)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Every image filename referenced by any catalog/menu entity.
///
/// The orphan-file sweep diffs the uploads directory against this set;
/// only unreferenced files may be deleted.
pub async fn referenced_image_urls(pool: &SqlitePool) -> RepoResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT image_url FROM product WHERE image_url IS NOT NULL UNION SELECT image_url FROM menu WHERE image_url IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(url,)| url).collect())
}
