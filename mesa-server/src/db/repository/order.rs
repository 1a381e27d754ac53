//! Order Repository
//!
//! The "order" table doubles as the mutable cart; terminal rows are frozen.
//! Cascade deletes (items before orders) are driven by the retention sweep
//! inside a single transaction.

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderItem};
use sqlx::Sqlite;

const ORDER_SELECT: &str = "SELECT id, table_id, status, ordered_at, subtotal, tax_amount, service_charge, discount_amount, total_amount, created_at, updated_at FROM \"order\"";

const ITEM_SELECT: &str = "SELECT id, order_id, product_id, menu_id, item_name, unit_price, quantity, line_total FROM order_item";

/// Statuses after which an order is immutable
const TERMINAL: &str = "('COMPLETED', 'CANCELLED', 'CLOSED')";

pub async fn find_by_id<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ?", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// The table's active order — at most one non-terminal order may exist per
/// table; callers enforce the invariant by running lookup + create in one
/// transaction.
pub async fn find_active_for_table<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
) -> RepoResult<Option<Order>> {
    let sql = format!(
        "{} WHERE table_id = ? AND status NOT IN {} ORDER BY ordered_at LIMIT 1",
        ORDER_SELECT, TERMINAL
    );
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(table_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn create_empty<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO \"order\" (id, table_id, status, ordered_at, subtotal, tax_amount, service_charge, discount_amount, total_amount, created_at, updated_at) VALUES (?1, ?2, 'PENDING', ?3, 0, 0, 0, 0, 0, ?3, ?3)",
    )
    .bind(id)
    .bind(table_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn items_for_order<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    order_id: i64,
) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{} WHERE order_id = ? ORDER BY id", ITEM_SELECT);
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

pub async fn find_item_by_id<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    line_id: i64,
) -> RepoResult<Option<OrderItem>> {
    let sql = format!("{} WHERE id = ?", ITEM_SELECT);
    let row = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(line_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Merge lookup: the line with the same (product_id, menu_id) identity.
/// `IS` instead of `=` gives null-safe comparison for the unset side.
pub async fn find_matching_line<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    order_id: i64,
    product_id: Option<i64>,
    menu_id: Option<i64>,
) -> RepoResult<Option<OrderItem>> {
    let sql = format!(
        "{} WHERE order_id = ?1 AND product_id IS ?2 AND menu_id IS ?3 LIMIT 1",
        ITEM_SELECT
    );
    let row = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .bind(product_id)
        .bind(menu_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_line<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    order_id: i64,
    product_id: Option<i64>,
    menu_id: Option<i64>,
    item_name: &str,
    unit_price: f64,
    quantity: i32,
    line_total: f64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO order_item (id, order_id, product_id, menu_id, item_name, unit_price, quantity, line_total) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(id)
    .bind(order_id)
    .bind(product_id)
    .bind(menu_id)
    .bind(item_name)
    .bind(unit_price)
    .bind(quantity)
    .bind(line_total)
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn set_line_quantity<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    line_id: i64,
    quantity: i32,
    line_total: f64,
) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE order_item SET quantity = ?1, line_total = ?2 WHERE id = ?3")
        .bind(quantity)
        .bind(line_total)
        .bind(line_id)
        .execute(executor)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order line {line_id} not found")));
    }
    Ok(())
}

pub async fn delete_line<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    line_id: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM order_item WHERE id = ?")
        .bind(line_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn set_subtotal<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    order_id: i64,
    subtotal: f64,
    now: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE \"order\" SET subtotal = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(subtotal)
        .bind(now)
        .bind(order_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Freeze the order: non-terminal → CLOSED with final totals.
///
/// Returns false when the order was already terminal.
pub async fn close_with_totals<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    order_id: i64,
    tax_amount: f64,
    service_charge: f64,
    discount_amount: f64,
    total_amount: f64,
    now: i64,
) -> RepoResult<bool> {
    let sql = format!(
        "UPDATE \"order\" SET status = 'CLOSED', tax_amount = ?1, service_charge = ?2, discount_amount = ?3, total_amount = ?4, updated_at = ?5 WHERE id = ?6 AND status NOT IN {}",
        TERMINAL
    );
    let rows = sqlx::query(&sql)
        .bind(tax_amount)
        .bind(service_charge)
        .bind(discount_amount)
        .bind(total_amount)
        .bind(now)
        .bind(order_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Cancel the active order when its table is cleared.
pub async fn cancel_active_for_table<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let sql = format!(
        "UPDATE \"order\" SET status = 'CANCELLED', updated_at = ?1 WHERE table_id = ?2 AND status NOT IN {}",
        TERMINAL
    );
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(table_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}

// ========== Retention cascade (children before parents) ==========

/// Delete the lines of terminal orders older than the cutoff.
pub async fn delete_items_of_stale_orders<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    cutoff_millis: i64,
) -> RepoResult<u64> {
    let sql = format!(
        "DELETE FROM order_item WHERE order_id IN (SELECT id FROM \"order\" WHERE status IN {} AND ordered_at < ?)",
        TERMINAL
    );
    let rows = sqlx::query(&sql).bind(cutoff_millis).execute(executor).await?;
    Ok(rows.rows_affected())
}

/// Delete terminal orders older than the cutoff (after their items).
pub async fn delete_stale_orders<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    cutoff_millis: i64,
) -> RepoResult<u64> {
    let sql = format!(
        "DELETE FROM \"order\" WHERE status IN {} AND ordered_at < ?",
        TERMINAL
    );
    let rows = sqlx::query(&sql).bind(cutoff_millis).execute(executor).await?;
    Ok(rows.rows_affected())
}
