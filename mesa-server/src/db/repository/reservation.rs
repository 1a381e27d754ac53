//! Reservation Repository

use super::{RepoError, RepoResult};
use shared::models::{Reservation, ReservationCreate, ReservationUpdate};
use sqlx::{Sqlite, SqlitePool};

const RESERVATION_SELECT: &str = "SELECT id, table_id, customer_name, customer_phone, party_size, scheduled_at, duration_minutes, status, notes, created_at, updated_at FROM reservation";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Reservation>> {
    let sql = format!("{} ORDER BY scheduled_at DESC", RESERVATION_SELECT);
    let rows = sqlx::query_as::<_, Reservation>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Reservation>> {
    let sql = format!("{} WHERE id = ?", RESERVATION_SELECT);
    let row = sqlx::query_as::<_, Reservation>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// All reservations the overdue sweep must re-examine
pub async fn find_confirmed(pool: &SqlitePool) -> RepoResult<Vec<Reservation>> {
    let sql = format!("{} WHERE status = 'CONFIRMED' ORDER BY scheduled_at", RESERVATION_SELECT);
    let rows = sqlx::query_as::<_, Reservation>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: ReservationCreate) -> RepoResult<Reservation> {
    if data.party_size <= 0 {
        return Err(RepoError::Validation("Party size must be positive".into()));
    }
    if data.scheduled_at <= 0 {
        return Err(RepoError::Validation("Scheduled time is malformed".into()));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO reservation (id, table_id, customer_name, customer_phone, party_size, scheduled_at, duration_minutes, status, notes, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING', ?8, ?9, ?9)",
    )
    .bind(id)
    .bind(data.table_id)
    .bind(&data.customer_name)
    .bind(&data.customer_phone)
    .bind(data.party_size)
    .bind(data.scheduled_at)
    .bind(data.duration_minutes.unwrap_or(90))
    .bind(&data.notes)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create reservation".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: ReservationUpdate) -> RepoResult<Reservation> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE reservation SET customer_name = COALESCE(?1, customer_name), customer_phone = COALESCE(?2, customer_phone), party_size = COALESCE(?3, party_size), scheduled_at = COALESCE(?4, scheduled_at), duration_minutes = COALESCE(?5, duration_minutes), status = COALESCE(?6, status), notes = COALESCE(?7, notes), updated_at = ?8 WHERE id = ?9",
    )
    .bind(&data.customer_name)
    .bind(&data.customer_phone)
    .bind(data.party_size)
    .bind(data.scheduled_at)
    .bind(data.duration_minutes)
    .bind(data.status)
    .bind(&data.notes)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Reservation {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Reservation {id} not found")))
}

/// confirmed → overdue, sweep-owned.
///
/// Guarded on the stored status so a racing seat request that already
/// completed the reservation turns this into a no-op, and the transition
/// is monotone — an overdue reservation is never flipped back here.
pub async fn mark_overdue<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE reservation SET status = 'OVERDUE', updated_at = ?1 WHERE id = ?2 AND status = 'CONFIRMED' AND scheduled_at < ?1",
    )
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// confirmed/overdue → completed when the party is seated.
///
/// Returns false when the reservation was no longer seatable (already
/// completed, cancelled, or never confirmed).
pub async fn complete_for_seating<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE reservation SET status = 'COMPLETED', updated_at = ?1 WHERE id = ?2 AND status IN ('CONFIRMED', 'OVERDUE')",
    )
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    id: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM reservation WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Retention: delete reservations created before the cutoff.
pub async fn delete_created_before<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    cutoff_millis: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM reservation WHERE created_at < ?")
        .bind(cutoff_millis)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}
