//! Retention API Handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::retention::{RetentionReport, RetentionSweeper};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// 覆盖订单/账单保留天数 (默认取配置)
    pub order_days: Option<i64>,
    /// 覆盖预订保留天数 (默认取配置)
    pub reservation_days: Option<i64>,
}

#[derive(Serialize)]
pub struct RunResponse {
    #[serde(flatten)]
    pub cascade: RetentionReport,
    pub reservations_deleted: u64,
    pub tokens_purged: u64,
    pub orphan_files_deleted: usize,
}

/// POST /api/retention/run - 立即执行全部清理任务
pub async fn run(
    State(state): State<ServerState>,
    payload: Option<Json<RunRequest>>,
) -> AppResult<Json<RunResponse>> {
    let req = payload.map(|Json(r)| r).unwrap_or_default();
    let order_days = req.order_days.unwrap_or(state.config.order_retention_days);
    let reservation_days = req
        .reservation_days
        .unwrap_or(state.config.reservation_retention_days);
    if order_days < 0 || reservation_days < 0 {
        return Err(AppError::validation("Retention days cannot be negative"));
    }

    let sweeper = RetentionSweeper::new(state.pool().clone(), &state.config);
    let cascade = sweeper.run_order_bill_retention(order_days).await?;
    let reservations_deleted = sweeper.run_reservation_retention(reservation_days).await?;
    let tokens_purged = sweeper.run_token_cleanup().await?;
    let orphan_files_deleted = sweeper.run_orphan_file_sweep().await?;

    Ok(Json(RunResponse {
        cascade,
        reservations_deleted,
        tokens_purged,
        orphan_files_deleted,
    }))
}
