//! 数据保留清理 (Retention Sweeper)
//!
//! Periodic sweeps that keep the edge database bounded:
//! - 逾期预订重检 (every 5 minutes)
//! - 孤儿上传文件清理 (daily 01:00, business timezone)
//! - 订单/账单级联删除 (weekly, Sunday 02:00)
//! - 已过期吊销令牌清理 (weekly, Sunday 02:30)
//! - 历史预订清理 (monthly, 1st 03:00)
//!
//! Every sweep is also exposed as a run-once entry point for the manual
//! trigger API and for tests. A failed sweep logs and waits for the next
//! fire; there is no inline retry.

pub mod schedule;

use std::path::PathBuf;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::config::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::repository::{bill, order, reservation, revoked_token};
use crate::db::repository::catalog;
use crate::seating::clock;
use crate::utils::{AppError, AppResult};
use self::schedule::Schedule;

const DAY_MILLIS: i64 = 24 * 3_600_000;

/// Files younger than this are never swept, even when unreferenced — an
/// upload may not have its catalog row yet.
const ORPHAN_FILE_MIN_AGE_MILLIS: i64 = DAY_MILLIS;

/// What a cascade run deleted, for the manual-trigger response and logs
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RetentionReport {
    pub order_items_deleted: u64,
    pub orders_deleted: u64,
    pub bill_lines_deleted: u64,
    pub bills_deleted: u64,
}

/// 清理服务 — owns the pool plus the retention windows
#[derive(Clone)]
pub struct RetentionSweeper {
    pool: SqlitePool,
    uploads_dir: PathBuf,
    tz: Tz,
    order_retention_days: i64,
    reservation_retention_days: i64,
}

impl RetentionSweeper {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            uploads_dir: config.uploads_dir(),
            tz: config.business_tz,
            order_retention_days: config.order_retention_days,
            reservation_retention_days: config.reservation_retention_days,
        }
    }

    // ========== Run-once entry points ==========

    /// Persist `CONFIRMED → OVERDUE` for every reservation whose scheduled
    /// moment has passed. Returns how many flipped.
    ///
    /// The guarded update makes the sweep monotone: a reservation that a
    /// racing seat request just completed is skipped, never reverted.
    pub async fn run_overdue_recheck(&self) -> AppResult<u64> {
        let now = shared::util::now_millis();
        let confirmed = reservation::find_confirmed(&self.pool).await?;

        let mut flipped = 0u64;
        for res in &confirmed {
            if clock::classify(res, now) == shared::models::ReservationStatus::Overdue
                && reservation::mark_overdue(&self.pool, res.id, now).await?
            {
                flipped += 1;
            }
        }
        if flipped > 0 {
            info!(count = flipped, "Reservations marked overdue");
        }
        Ok(flipped)
    }

    /// Cascade-delete terminal orders and bills older than the retention
    /// window, children before parents, in one transaction. Either the
    /// whole cascade lands or none of it does — no orphaned child rows.
    pub async fn run_order_bill_retention(&self, days: i64) -> AppResult<RetentionReport> {
        let cutoff = shared::util::now_millis() - days.max(0) * DAY_MILLIS;

        let mut tx = self.pool.begin().await.map_err(cascade_err)?;
        let report = RetentionReport {
            order_items_deleted: order::delete_items_of_stale_orders(&mut *tx, cutoff)
                .await
                .map_err(cascade_err)?,
            bill_lines_deleted: bill::delete_lines_of_stale_bills(&mut *tx, cutoff)
                .await
                .map_err(cascade_err)?,
            orders_deleted: order::delete_stale_orders(&mut *tx, cutoff)
                .await
                .map_err(cascade_err)?,
            bills_deleted: bill::delete_stale_bills(&mut *tx, cutoff)
                .await
                .map_err(cascade_err)?,
        };
        tx.commit().await.map_err(cascade_err)?;

        if report.orders_deleted > 0 || report.bills_deleted > 0 {
            info!(
                orders = report.orders_deleted,
                order_items = report.order_items_deleted,
                bills = report.bills_deleted,
                bill_lines = report.bill_lines_deleted,
                "Order/bill retention cascade completed"
            );
        }
        Ok(report)
    }

    /// Delete reservations older than the retention window.
    pub async fn run_reservation_retention(&self, days: i64) -> AppResult<u64> {
        let cutoff = shared::util::now_millis() - days.max(0) * DAY_MILLIS;
        let deleted = reservation::delete_created_before(&self.pool, cutoff).await?;
        if deleted > 0 {
            info!(count = deleted, "Stale reservations deleted");
        }
        Ok(deleted)
    }

    /// Purge revoked-token entries whose tokens expired on their own.
    pub async fn run_token_cleanup(&self) -> AppResult<u64> {
        let deleted =
            revoked_token::purge_expired(&self.pool, shared::util::now_millis()).await?;
        if deleted > 0 {
            info!(count = deleted, "Expired revoked tokens purged");
        }
        Ok(deleted)
    }

    /// Delete uploaded files no catalog row references any more.
    ///
    /// Only files older than 24h are candidates; a file whose metadata
    /// cannot be read is skipped, never deleted.
    pub async fn run_orphan_file_sweep(&self) -> AppResult<usize> {
        let referenced = catalog::referenced_image_urls(&self.pool).await?;
        let now = shared::util::now_millis();

        let mut entries = match tokio::fs::read_dir(&self.uploads_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::internal(format!("Cannot scan uploads dir: {e}"))),
        };

        let mut deleted = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if referenced.iter().any(|url| url.ends_with(file_name)) {
                continue;
            }

            let age_ok = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| now - d.as_millis() as i64 >= ORPHAN_FILE_MIN_AGE_MILLIS)
                .unwrap_or(false);
            if !age_ok {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Failed to delete orphan file");
                }
            }
        }

        if deleted > 0 {
            info!(count = deleted, "Orphan upload files cleaned up");
        }
        Ok(deleted)
    }

    // ========== Periodic registration ==========

    /// Register every sweep loop on the task manager.
    pub fn start(self, tasks: &mut BackgroundTasks) {
        let token = tasks.shutdown_token();

        let sweeper = self.clone();
        let shutdown = token.clone();
        tasks.spawn("overdue_recheck", TaskKind::Periodic, async move {
            sweeper
                .run_loop(Schedule::Every { minutes: 5 }, shutdown, |s| async move {
                    s.run_overdue_recheck().await.map(|_| ())
                })
                .await;
        });

        let sweeper = self.clone();
        let shutdown = token.clone();
        tasks.spawn("orphan_file_sweep", TaskKind::Periodic, async move {
            let at = NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN);
            sweeper
                .run_loop(Schedule::Daily { at }, shutdown, |s| async move {
                    s.run_orphan_file_sweep().await.map(|_| ())
                })
                .await;
        });

        let sweeper = self.clone();
        let shutdown = token.clone();
        tasks.spawn("order_bill_retention", TaskKind::Periodic, async move {
            let at = NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN);
            let schedule = Schedule::Weekly { weekday: Weekday::Sun, at };
            sweeper
                .run_loop(schedule, shutdown, |s| async move {
                    let days = s.order_retention_days;
                    s.run_order_bill_retention(days).await.map(|_| ())
                })
                .await;
        });

        let sweeper = self.clone();
        let shutdown = token.clone();
        tasks.spawn("token_cleanup", TaskKind::Periodic, async move {
            let at = NaiveTime::from_hms_opt(2, 30, 0).unwrap_or(NaiveTime::MIN);
            let schedule = Schedule::Weekly { weekday: Weekday::Sun, at };
            sweeper
                .run_loop(schedule, shutdown, |s| async move {
                    s.run_token_cleanup().await.map(|_| ())
                })
                .await;
        });

        let sweeper = self;
        tasks.spawn("reservation_retention", TaskKind::Periodic, async move {
            let at = NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN);
            let schedule = Schedule::Monthly { day: 1, at };
            sweeper
                .run_loop(schedule, token, |s| async move {
                    let days = s.reservation_retention_days;
                    s.run_reservation_retention(days).await.map(|_| ())
                })
                .await;
        });
    }

    /// Sleep → run → repeat, until shutdown. Failures log and wait for the
    /// next fire.
    async fn run_loop<F, Fut>(self, schedule: Schedule, shutdown: CancellationToken, job: F)
    where
        F: Fn(RetentionSweeper) -> Fut,
        Fut: std::future::Future<Output = AppResult<()>>,
    {
        loop {
            let now = shared::util::now_millis();
            let sleep = schedule.sleep_until_next(now, self.tz);

            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = shutdown.cancelled() => return,
            }

            if let Err(e) = job(self.clone()).await {
                error!(error = %e, "Retention sweep failed, waiting for next fire");
            }
        }
    }
}

fn cascade_err(e: impl std::fmt::Display) -> AppError {
    AppError::RetentionCascadeFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{self, BillingConfig};
    use crate::db::DbService;
    use crate::db::repository::dining_table;
    use shared::models::{BillCreate, DiningTableCreate, ReservationCreate, ReservationStatus};

    fn sweeper(pool: SqlitePool) -> RetentionSweeper {
        RetentionSweeper {
            pool,
            uploads_dir: PathBuf::from("/nonexistent/uploads"),
            tz: chrono_tz::UTC,
            order_retention_days: 7,
            reservation_retention_days: 30,
        }
    }

    async fn confirmed_reservation(pool: &SqlitePool, table_id: i64, scheduled_at: i64) -> i64 {
        let res = reservation::create(
            pool,
            ReservationCreate {
                table_id,
                customer_name: None,
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
            shared::models::ReservationUpdate {
                status: Some(ReservationStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        res.id
    }

    #[tokio::test]
    async fn overdue_recheck_flips_only_past_confirmed() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let table = dining_table::create(
            &pool,
            DiningTableCreate { section: "A".into(), table_number: 1, capacity: None },
        )
        .await
        .unwrap();

        let now = shared::util::now_millis();
        let past = confirmed_reservation(&pool, table.id, now - 20 * 60_000).await;
        let future = confirmed_reservation(&pool, table.id, now + 60 * 60_000).await;

        let flipped = sweeper(pool.clone()).run_overdue_recheck().await.unwrap();
        assert_eq!(flipped, 1);

        let past = reservation::find_by_id(&pool, past).await.unwrap().unwrap();
        assert_eq!(past.status, ReservationStatus::Overdue);
        let future = reservation::find_by_id(&pool, future).await.unwrap().unwrap();
        assert_eq!(future.status, ReservationStatus::Confirmed);

        // Second run is a no-op: the transition is monotone
        let flipped = sweeper(pool).run_overdue_recheck().await.unwrap();
        assert_eq!(flipped, 0);
    }

    #[tokio::test]
    async fn cascade_deletes_children_with_parents() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let table = dining_table::create(
            &pool,
            DiningTableCreate { section: "A".into(), table_number: 1, capacity: None },
        )
        .await
        .unwrap();

        // A closed order with a line and its bill
        let order_id = order::create_empty(&pool, table.id).await.unwrap();
        order::insert_line(&pool, order_id, Some(1), None, "Tea", 3.0, 2, 6.0)
            .await
            .unwrap();
        order::set_subtotal(&pool, order_id, 6.0, shared::util::now_millis())
            .await
            .unwrap();
        order::close_with_totals(&pool, order_id, 0.6, 0.3, 0.0, 6.9, shared::util::now_millis())
            .await
            .unwrap();
        billing::generate_bill(
            &pool,
            &BillingConfig::default(),
            chrono_tz::UTC,
            BillCreate { order_id, discount_amount: None, customer_name: None },
        )
        .await
        .unwrap();

        // Retention window of 0 days: everything is stale
        let report = sweeper(pool.clone())
            .run_order_bill_retention(0)
            .await
            .unwrap();
        assert_eq!(report.orders_deleted, 1);
        assert_eq!(report.order_items_deleted, 1);
        assert_eq!(report.bills_deleted, 1);
        assert_eq!(report.bill_lines_deleted, 1);

        assert!(order::find_by_id(&pool, order_id).await.unwrap().is_none());
        assert_eq!(bill::count_orphan_lines(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cascade_spares_active_and_recent_orders() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let table = dining_table::create(
            &pool,
            DiningTableCreate { section: "A".into(), table_number: 1, capacity: None },
        )
        .await
        .unwrap();

        // Active (non-terminal) order must survive even a 0-day window
        let active_id = order::create_empty(&pool, table.id).await.unwrap();
        // Closed order inside the window must survive a 7-day sweep
        let recent_id = order::create_empty(&pool, table.id).await.unwrap();
        order::close_with_totals(&pool, recent_id, 0.0, 0.0, 0.0, 0.0, shared::util::now_millis())
            .await
            .unwrap();

        let report = sweeper(pool.clone())
            .run_order_bill_retention(7)
            .await
            .unwrap();
        assert_eq!(report.orders_deleted, 0);

        let report = sweeper(pool.clone())
            .run_order_bill_retention(0)
            .await
            .unwrap();
        assert_eq!(report.orders_deleted, 1);
        assert!(order::find_by_id(&pool, active_id).await.unwrap().is_some());
        assert!(order::find_by_id(&pool, recent_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reservation_retention_respects_window() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let table = dining_table::create(
            &pool,
            DiningTableCreate { section: "A".into(), table_number: 1, capacity: None },
        )
        .await
        .unwrap();
        confirmed_reservation(&pool, table.id, shared::util::now_millis()).await;

        // 30-day window: just-created reservation survives
        let deleted = sweeper(pool.clone()).run_reservation_retention(30).await.unwrap();
        assert_eq!(deleted, 0);

        let deleted = sweeper(pool).run_reservation_retention(0).await.unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn token_cleanup_only_removes_expired() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let now = shared::util::now_millis();
        revoked_token::revoke(&pool, "hash-live", now + DAY_MILLIS).await.unwrap();
        revoked_token::revoke(&pool, "hash-dead", now - 1_000).await.unwrap();

        let purged = sweeper(pool.clone()).run_token_cleanup().await.unwrap();
        assert_eq!(purged, 1);
        assert!(revoked_token::is_revoked(&pool, "hash-live").await.unwrap());
        assert!(!revoked_token::is_revoked(&pool, "hash-dead").await.unwrap());
    }

    #[tokio::test]
    async fn missing_uploads_dir_is_not_an_error() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let deleted = sweeper(pool).run_orphan_file_sweep().await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn orphan_file_sweep_spares_referenced_and_young_files() {
        let pool = DbService::new_in_memory().await.unwrap().pool;
        let dir = tempfile::tempdir().unwrap();

        // Two files past the 24h grace period, one of them referenced
        let aged = std::time::SystemTime::now()
            - std::time::Duration::from_millis((ORPHAN_FILE_MIN_AGE_MILLIS + 3_600_000) as u64);
        for name in ["tea.png", "orphan.png"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"img").unwrap();
            std::fs::OpenOptions::new()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(aged)
                .unwrap();
        }
        // Freshly uploaded, unreferenced: its catalog row may not exist yet
        std::fs::write(dir.path().join("fresh.png"), b"img").unwrap();

        catalog::create_product(&pool, "Tea", 3.0, Some("/uploads/tea.png"))
            .await
            .unwrap();

        let sweep = RetentionSweeper {
            uploads_dir: dir.path().to_path_buf(),
            ..sweeper(pool)
        };
        let deleted = sweep.run_orphan_file_sweep().await.unwrap();
        assert_eq!(deleted, 1);

        assert!(dir.path().join("tea.png").exists());
        assert!(dir.path().join("fresh.png").exists());
        assert!(!dir.path().join("orphan.png").exists());
    }
}
