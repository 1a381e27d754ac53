//! Bill Repository

use super::RepoResult;
use shared::models::{Bill, BillProduct};
use sqlx::{Sqlite, SqlitePool};

const BILL_SELECT: &str = "SELECT id, bill_number, order_id, customer_name, subtotal, tax_amount, service_charge, discount_amount, total_amount, payment_status, bill_status, created_at FROM bill";

const LINE_SELECT: &str =
    "SELECT id, bill_id, item_name, unit_price, quantity, line_total FROM bill_product";

pub async fn find_by_id<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Bill>> {
    let sql = format!("{} WHERE id = ?", BILL_SELECT);
    let row = sqlx::query_as::<_, Bill>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn find_by_order<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    order_id: i64,
) -> RepoResult<Option<Bill>> {
    let sql = format!("{} WHERE order_id = ? LIMIT 1", BILL_SELECT);
    let row = sqlx::query_as::<_, Bill>(&sql)
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn lines_for_bill(pool: &SqlitePool, bill_id: i64) -> RepoResult<Vec<BillProduct>> {
    let sql = format!("{} WHERE bill_id = ? ORDER BY id", LINE_SELECT);
    let rows = sqlx::query_as::<_, BillProduct>(&sql)
        .bind(bill_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Insert a frozen bill row. All numbers are computed by the caller and
/// never re-derived afterwards.
pub async fn insert<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    bill: &Bill,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO bill (id, bill_number, order_id, customer_name, subtotal, tax_amount, service_charge, discount_amount, total_amount, payment_status, bill_status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(bill.id)
    .bind(&bill.bill_number)
    .bind(bill.order_id)
    .bind(&bill.customer_name)
    .bind(bill.subtotal)
    .bind(bill.tax_amount)
    .bind(bill.service_charge)
    .bind(bill.discount_amount)
    .bind(bill.total_amount)
    .bind(bill.payment_status)
    .bind(bill.bill_status)
    .bind(bill.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_line<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    bill_id: i64,
    item_name: &str,
    unit_price: f64,
    quantity: i32,
    line_total: f64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO bill_product (id, bill_id, item_name, unit_price, quantity, line_total) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(id)
    .bind(bill_id)
    .bind(item_name)
    .bind(unit_price)
    .bind(quantity)
    .bind(line_total)
    .execute(executor)
    .await?;
    Ok(id)
}

// ========== Retention cascade (children before parents) ==========

pub async fn delete_lines_of_stale_bills<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    cutoff_millis: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "DELETE FROM bill_product WHERE bill_id IN (SELECT id FROM bill WHERE created_at < ?)",
    )
    .bind(cutoff_millis)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn delete_stale_bills<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    cutoff_millis: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM bill WHERE created_at < ?")
        .bind(cutoff_millis)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}

/// Orphan-row audit used by retention tests and the health check: child
/// rows whose parent bill no longer exists.
pub async fn count_orphan_lines(pool: &SqlitePool) -> RepoResult<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM bill_product bp WHERE NOT EXISTS (SELECT 1 FROM bill b WHERE b.id = bp.bill_id)",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
