//! Dining Table Repository

use super::{RepoError, RepoResult};
use shared::models::{DiningTable, DiningTableCreate, TableStatus};
use sqlx::{Sqlite, SqlitePool};

const TABLE_SELECT: &str = "SELECT id, name, section, table_number, capacity, is_occupied, table_status, current_reservation_id, customer_name, party_size, occupied_at, is_active, created_at, updated_at FROM dining_table";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<DiningTable>> {
    let sql = format!(
        "{} WHERE is_active = 1 ORDER BY section, table_number",
        TABLE_SELECT
    );
    let rows = sqlx::query_as::<_, DiningTable>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_section(pool: &SqlitePool, section: &str) -> RepoResult<Vec<DiningTable>> {
    let sql = format!(
        "{} WHERE is_active = 1 AND section = ? ORDER BY table_number",
        TABLE_SELECT
    );
    let rows = sqlx::query_as::<_, DiningTable>(&sql)
        .bind(section)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<DiningTable>> {
    let sql = format!("{} WHERE id = ?", TABLE_SELECT);
    let row = sqlx::query_as::<_, DiningTable>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: DiningTableCreate) -> RepoResult<DiningTable> {
    let section = data.section.trim().to_uppercase();
    if section.len() != 1 || !section.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(RepoError::Validation(format!(
            "Section must be a single letter, got '{}'",
            data.section
        )));
    }
    if data.table_number <= 0 {
        return Err(RepoError::Validation("Table number must be positive".into()));
    }

    let name = DiningTable::format_name(&section, data.table_number);
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();

    let result = sqlx::query(
        "INSERT INTO dining_table (id, name, section, table_number, capacity, is_occupied, table_status, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 0, 'AVAILABLE', 1, ?6, ?6)",
    )
    .bind(id)
    .bind(&name)
    .bind(&section)
    .bind(data.table_number)
    .bind(data.capacity.unwrap_or(4))
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(RepoError::Duplicate(format!("Table '{}' already exists", name)));
        }
        Err(e) => return Err(e.into()),
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create dining table".into()))
}

/// Atomically mark a table occupied — the check and the mutation are one
/// guarded statement, so two racing seat requests cannot both succeed.
/// Stale customer fields from any previous occupancy are overwritten here.
///
/// Returns false when the table was already occupied.
pub async fn occupy_if_free<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
    reservation_id: Option<i64>,
    customer_name: Option<&str>,
    party_size: Option<i32>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dining_table SET is_occupied = 1, table_status = 'OCCUPIED', current_reservation_id = ?1, customer_name = ?2, party_size = ?3, occupied_at = ?4, updated_at = ?4 WHERE id = ?5 AND is_active = 1 AND is_occupied = 0",
    )
    .bind(reservation_id)
    .bind(customer_name)
    .bind(party_size)
    .bind(now)
    .bind(table_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Release a table back to AVAILABLE, wiping all occupancy fields.
///
/// Returns false when the table was already clear.
pub async fn clear_occupancy<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dining_table SET is_occupied = 0, table_status = 'AVAILABLE', current_reservation_id = NULL, customer_name = NULL, party_size = NULL, occupied_at = NULL, updated_at = ?1 WHERE id = ?2 AND (is_occupied = 1 OR table_status <> 'AVAILABLE')",
    )
    .bind(now)
    .bind(table_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// available → reserved for a confirmed reservation against this table.
/// Guarded: an occupied table keeps its state.
pub async fn mark_reserved<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
    reservation_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dining_table SET table_status = 'RESERVED', current_reservation_id = ?1, updated_at = ?2 WHERE id = ?3 AND is_active = 1 AND is_occupied = 0",
    )
    .bind(reservation_id)
    .bind(now)
    .bind(table_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Wipe the reservation pointer and any occupancy tied to it. Used when a
/// reservation is deleted; a table held by a *different* reservation (or a
/// walk-in) is untouched because of the pointer guard.
pub async fn release_for_reservation<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_id: i64,
    reservation_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dining_table SET is_occupied = 0, table_status = 'AVAILABLE', current_reservation_id = NULL, customer_name = NULL, party_size = NULL, occupied_at = NULL, updated_at = ?1 WHERE id = ?2 AND current_reservation_id = ?3",
    )
    .bind(now)
    .bind(table_id)
    .bind(reservation_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Staff-set transient status (e.g. CLEANING). Occupied tables are refused.
pub async fn set_status(pool: &SqlitePool, table_id: i64, status: TableStatus) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dining_table SET table_status = ?1, updated_at = ?2 WHERE id = ?3 AND is_occupied = 0",
    )
    .bind(status)
    .bind(shared::util::now_millis())
    .bind(table_id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// (total active tables, occupied tables) — input for occupancy statistics
pub async fn occupancy_counts(pool: &SqlitePool) -> RepoResult<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(is_occupied), 0) FROM dining_table WHERE is_active = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}
