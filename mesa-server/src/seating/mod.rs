//! 座位状态机 (Table State Machine)
//!
//! Owns every dining-table occupancy transition. All multi-step
//! transitions run in a single transaction with guarded single-statement
//! updates underneath, so a lost race surfaces as a domain conflict and
//! never as half-applied state.
//!
//! Transitions:
//! - available/reserved → occupied: [`seat_customer`]
//! - occupied → available: [`clear_table`] (also on order close)
//! - available → reserved: [`confirm_reservation`]
//! - any → available: [`delete_reservation`] for the pointed-at table

pub mod clock;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use shared::models::{
    DiningTable, Reservation, ReservationStatus, ReservationUpdate, SeatCustomer,
};

use crate::db::repository::{dining_table, order, reservation};
use crate::utils::{AppError, AppResult};

/// Seat a party at a table.
///
/// With a reservation: the reservation must belong to this table and be
/// seatable per the reservation clock; seating completes it. Without one
/// this is a walk-in and the table is simply occupied.
///
/// The occupancy flip is a guarded update — of two racing seat requests
/// exactly one wins, the other gets a `Conflict`.
pub async fn seat_customer(
    pool: &SqlitePool,
    table_id: i64,
    req: SeatCustomer,
) -> AppResult<DiningTable> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let table = dining_table::find_by_id(&mut *tx, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id} not found")))?;
    if !table.is_active {
        return Err(AppError::validation(format!(
            "Table {} is deactivated",
            table.name
        )));
    }

    // Resolve who is being seated before touching the table
    let (reservation, customer_name, party_size) = match req.reservation_id {
        Some(res_id) => {
            let res = reservation::find_by_id(&mut *tx, res_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Reservation {res_id} not found")))?;
            if res.table_id != table_id {
                return Err(AppError::validation(format!(
                    "Reservation {} belongs to a different table",
                    res_id
                )));
            }
            if res.status == ReservationStatus::Completed {
                return Err(AppError::conflict(format!(
                    "Reservation {} is already completed",
                    res_id
                )));
            }
            if !clock::can_seat(&res, now) {
                return Err(AppError::not_seatable(format!(
                    "Reservation {} is outside the seating window",
                    res_id
                )));
            }
            let name = res.customer_name.clone();
            let size = res.party_size;
            (Some(res), name, Some(size))
        }
        None => (None, req.customer_name.clone(), req.party_size),
    };

    let occupied = dining_table::occupy_if_free(
        &mut *tx,
        table_id,
        req.reservation_id,
        customer_name.as_deref(),
        party_size,
        now,
    )
    .await?;
    if !occupied {
        return Err(AppError::conflict(format!(
            "Table {} is already occupied",
            table.name
        )));
    }

    if let Some(res) = &reservation {
        let completed = reservation::complete_for_seating(&mut *tx, res.id, now).await?;
        if !completed {
            // can_seat passed inside this same transaction, so the guard
            // can only miss if the row changed underneath us. Roll back
            // rather than leave the table occupied against a reservation
            // that was never completed.
            tx.rollback().await?;
            return Err(AppError::inconsistent(format!(
                "Table {} occupied but reservation {} could not be completed",
                table.name, res.id
            )));
        }
    }

    tx.commit().await?;
    info!(
        table = %table.name,
        reservation_id = ?req.reservation_id,
        "Customer seated"
    );

    dining_table::find_by_id(pool, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id} not found")))
}

/// Clear a table back to available. Any still-active order on the table is
/// cancelled in the same transaction. Idempotent: clearing a clear table
/// is a no-op.
pub async fn clear_table(pool: &SqlitePool, table_id: i64) -> AppResult<DiningTable> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let table = dining_table::find_by_id(&mut *tx, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id} not found")))?;

    let cancelled = order::cancel_active_for_table(&mut *tx, table_id, now).await?;
    let cleared = dining_table::clear_occupancy(&mut *tx, table_id, now).await?;
    tx.commit().await?;

    if cancelled > 0 {
        warn!(table = %table.name, cancelled, "Active orders cancelled on table clear");
    }
    if cleared {
        info!(table = %table.name, "Table cleared");
    }

    dining_table::find_by_id(pool, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id} not found")))
}

/// pending → confirmed, and mark the table reserved if it is free.
///
/// The table flip is best-effort: an occupied table keeps its state (the
/// current party still has to leave first) and the confirmation stands.
pub async fn confirm_reservation(pool: &SqlitePool, reservation_id: i64) -> AppResult<Reservation> {
    let res = reservation::find_by_id(pool, reservation_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Reservation {reservation_id} not found")))?;
    if res.status.is_terminal() {
        return Err(AppError::conflict(format!(
            "Reservation {} is already {:?}",
            reservation_id, res.status
        )));
    }

    let updated = reservation::update(
        pool,
        reservation_id,
        ReservationUpdate {
            status: Some(ReservationStatus::Confirmed),
            ..Default::default()
        },
    )
    .await?;

    let reserved =
        dining_table::mark_reserved(pool, res.table_id, reservation_id, shared::util::now_millis())
            .await?;
    if !reserved {
        info!(
            reservation_id,
            table_id = res.table_id,
            "Reservation confirmed but table not flagged (occupied or inactive)"
        );
    }

    Ok(updated)
}

/// Delete a reservation and release whatever table state points at it —
/// both in one transaction, so a failed release never strands an occupied
/// table against a reservation that no longer exists.
pub async fn delete_reservation(pool: &SqlitePool, reservation_id: i64) -> AppResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let res = reservation::find_by_id(&mut *tx, reservation_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Reservation {reservation_id} not found")))?;

    reservation::delete(&mut *tx, reservation_id).await?;
    let released =
        dining_table::release_for_reservation(&mut *tx, res.table_id, reservation_id, now).await?;
    tx.commit().await?;

    info!(reservation_id, table_id = res.table_id, released, "Reservation deleted");
    Ok(())
}

// ========== Occupancy statistics ==========

/// Coarse occupancy bands for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl OccupancyLevel {
    /// Band for an occupancy rate in percent
    pub fn for_rate(rate: f64) -> Self {
        if rate <= 25.0 {
            Self::Low
        } else if rate <= 50.0 {
            Self::Moderate
        } else if rate <= 80.0 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancySummary {
    pub total_tables: i64,
    pub occupied_tables: i64,
    /// Percent, 0.0 when there are no active tables
    pub occupancy_rate: f64,
    pub level: OccupancyLevel,
}

pub async fn occupancy_summary(pool: &SqlitePool) -> AppResult<OccupancySummary> {
    let (total, occupied) = dining_table::occupancy_counts(pool).await?;
    let rate = if total > 0 {
        occupied as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    Ok(OccupancySummary {
        total_tables: total,
        occupied_tables: occupied,
        occupancy_rate: rate,
        level: OccupancyLevel::for_rate(rate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::{DiningTableCreate, ReservationCreate};

    #[test]
    fn occupancy_bands() {
        assert_eq!(OccupancyLevel::for_rate(0.0), OccupancyLevel::Low);
        assert_eq!(OccupancyLevel::for_rate(25.0), OccupancyLevel::Low);
        assert_eq!(OccupancyLevel::for_rate(25.1), OccupancyLevel::Moderate);
        assert_eq!(OccupancyLevel::for_rate(50.0), OccupancyLevel::Moderate);
        assert_eq!(OccupancyLevel::for_rate(80.0), OccupancyLevel::High);
        assert_eq!(OccupancyLevel::for_rate(80.1), OccupancyLevel::Critical);
        assert_eq!(OccupancyLevel::for_rate(100.0), OccupancyLevel::Critical);
    }

    async fn setup() -> SqlitePool {
        DbService::new_in_memory().await.unwrap().pool
    }

    async fn make_table(pool: &SqlitePool) -> DiningTable {
        dining_table::create(
            pool,
            DiningTableCreate {
                section: "A".into(),
                table_number: 1,
                capacity: Some(4),
            },
        )
        .await
        .unwrap()
    }

    async fn make_confirmed_reservation(
        pool: &SqlitePool,
        table_id: i64,
        scheduled_at: i64,
    ) -> Reservation {
        let res = reservation::create(
            pool,
            ReservationCreate {
                table_id,
                customer_name: Some("Ana".into()),
                customer_phone: None,
                party_size: 2,
                scheduled_at,
                duration_minutes: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        reservation::update(
            pool,
            res.id,
            ReservationUpdate {
                status: Some(ReservationStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn walk_in_occupies_table() {
        let pool = setup().await;
        let table = make_table(&pool).await;

        let seated = seat_customer(
            &pool,
            table.id,
            SeatCustomer {
                reservation_id: None,
                customer_name: Some("Walk-in".into()),
                party_size: Some(3),
            },
        )
        .await
        .unwrap();

        assert!(seated.is_occupied);
        assert_eq!(seated.table_status, shared::models::TableStatus::Occupied);
        assert_eq!(seated.customer_name.as_deref(), Some("Walk-in"));
        assert_eq!(seated.party_size, Some(3));
    }

    #[tokio::test]
    async fn second_seat_request_conflicts() {
        let pool = setup().await;
        let table = make_table(&pool).await;

        seat_customer(&pool, table.id, SeatCustomer::default())
            .await
            .unwrap();
        let err = seat_customer(&pool, table.id, SeatCustomer::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn seating_completes_reservation() {
        let pool = setup().await;
        let table = make_table(&pool).await;
        let res =
            make_confirmed_reservation(&pool, table.id, shared::util::now_millis()).await;

        let seated = seat_customer(
            &pool,
            table.id,
            SeatCustomer {
                reservation_id: Some(res.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(seated.is_occupied);
        assert_eq!(seated.current_reservation_id, Some(res.id));
        // 姓名与人数取自预订
        assert_eq!(seated.customer_name.as_deref(), Some("Ana"));
        assert_eq!(seated.party_size, Some(2));

        let res = reservation::find_by_id(&pool, res.id).await.unwrap().unwrap();
        assert_eq!(res.status, ReservationStatus::Completed);
    }

    #[tokio::test]
    async fn seating_outside_window_is_refused() {
        let pool = setup().await;
        let table = make_table(&pool).await;
        // Scheduled 16 minutes ago, not yet swept overdue
        let scheduled = shared::util::now_millis() - 16 * 60 * 1000;
        let res = make_confirmed_reservation(&pool, table.id, scheduled).await;

        let err = seat_customer(
            &pool,
            table.id,
            SeatCustomer {
                reservation_id: Some(res.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotSeatable(_)));

        // Nothing half-applied
        let table = dining_table::find_by_id(&pool, table.id).await.unwrap().unwrap();
        assert!(!table.is_occupied);
        let res = reservation::find_by_id(&pool, res.id).await.unwrap().unwrap();
        assert_eq!(res.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn completed_reservation_cannot_be_reseated() {
        let pool = setup().await;
        let table = make_table(&pool).await;
        let res =
            make_confirmed_reservation(&pool, table.id, shared::util::now_millis()).await;

        seat_customer(
            &pool,
            table.id,
            SeatCustomer {
                reservation_id: Some(res.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        clear_table(&pool, table.id).await.unwrap();

        let err = seat_customer(
            &pool,
            table.id,
            SeatCustomer {
                reservation_id: Some(res.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn reservation_for_other_table_is_rejected() {
        let pool = setup().await;
        let table_a = make_table(&pool).await;
        let table_b = dining_table::create(
            &pool,
            DiningTableCreate {
                section: "B".into(),
                table_number: 2,
                capacity: None,
            },
        )
        .await
        .unwrap();
        let res =
            make_confirmed_reservation(&pool, table_a.id, shared::util::now_millis()).await;

        let err = seat_customer(
            &pool,
            table_b.id,
            SeatCustomer {
                reservation_id: Some(res.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn clear_table_cancels_active_order() {
        let pool = setup().await;
        let table = make_table(&pool).await;
        seat_customer(&pool, table.id, SeatCustomer::default())
            .await
            .unwrap();
        let order_id = order::create_empty(&pool, table.id).await.unwrap();

        let cleared = clear_table(&pool, table.id).await.unwrap();
        assert!(!cleared.is_occupied);
        assert!(cleared.customer_name.is_none());
        assert!(cleared.occupied_at.is_none());

        let o = order::find_by_id(&pool, order_id).await.unwrap().unwrap();
        assert_eq!(o.status, shared::models::OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn confirm_marks_table_reserved() {
        let pool = setup().await;
        let table = make_table(&pool).await;
        let res = reservation::create(
            &pool,
            ReservationCreate {
                table_id: table.id,
                customer_name: Some("Ben".into()),
                customer_phone: None,
                party_size: 4,
                scheduled_at: shared::util::now_millis() + 60 * 60 * 1000,
                duration_minutes: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        let confirmed = confirm_reservation(&pool, res.id).await.unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);

        let table = dining_table::find_by_id(&pool, table.id).await.unwrap().unwrap();
        assert_eq!(table.table_status, shared::models::TableStatus::Reserved);
        assert_eq!(table.current_reservation_id, Some(res.id));
        assert!(!table.is_occupied);
    }

    #[tokio::test]
    async fn delete_reservation_releases_table() {
        let pool = setup().await;
        let table = make_table(&pool).await;
        let res =
            make_confirmed_reservation(&pool, table.id, shared::util::now_millis()).await;
        seat_customer(
            &pool,
            table.id,
            SeatCustomer {
                reservation_id: Some(res.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        delete_reservation(&pool, res.id).await.unwrap();

        let table = dining_table::find_by_id(&pool, table.id).await.unwrap().unwrap();
        assert!(!table.is_occupied);
        assert!(table.current_reservation_id.is_none());
        assert!(reservation::find_by_id(&pool, res.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn summary_counts_and_band() {
        let pool = setup().await;
        for n in 1..=4 {
            dining_table::create(
                &pool,
                DiningTableCreate {
                    section: "A".into(),
                    table_number: n,
                    capacity: None,
                },
            )
            .await
            .unwrap();
        }
        let tables = dining_table::find_all(&pool).await.unwrap();
        seat_customer(&pool, tables[0].id, SeatCustomer::default())
            .await
            .unwrap();

        let summary = occupancy_summary(&pool).await.unwrap();
        assert_eq!(summary.total_tables, 4);
        assert_eq!(summary.occupied_tables, 1);
        assert_eq!(summary.level, OccupancyLevel::Low);
    }
}
