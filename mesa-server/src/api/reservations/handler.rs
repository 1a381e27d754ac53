//! Reservation API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use shared::models::{Reservation, ReservationCreate, ReservationStatus, ReservationUpdate};

use crate::core::ServerState;
use crate::db::repository::reservation;
use crate::retention::RetentionSweeper;
use crate::seating;
use crate::utils::{AppError, AppResult};

/// GET /api/reservations - 获取所有预订
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = reservation::find_all(state.pool()).await?;
    Ok(Json(reservations))
}

/// GET /api/reservations/:id - 获取单个预订
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Reservation>> {
    let res = reservation::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Reservation {} not found", id)))?;
    Ok(Json(res))
}

/// POST /api/reservations - 创建预订 (初始状态 PENDING)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<Json<Reservation>> {
    let res = reservation::create(state.pool(), payload).await?;
    Ok(Json(res))
}

/// PUT /api/reservations/:id - 更新预订
///
/// `OVERDUE` 由清理任务持有，客户端不能直接设置。
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReservationUpdate>,
) -> AppResult<Json<Reservation>> {
    if payload.status == Some(ReservationStatus::Overdue) {
        return Err(AppError::validation(
            "OVERDUE is derived from the clock and cannot be set directly",
        ));
    }
    if let Some(size) = payload.party_size
        && size <= 0
    {
        return Err(AppError::validation("Party size must be positive"));
    }
    if let Some(at) = payload.scheduled_at
        && at <= 0
    {
        return Err(AppError::validation("Scheduled time is malformed"));
    }
    let res = reservation::update(state.pool(), id, payload).await?;
    Ok(Json(res))
}

/// POST /api/reservations/:id/confirm - 确认预订并标记桌台 RESERVED
pub async fn confirm(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Reservation>> {
    let res = seating::confirm_reservation(state.pool(), id).await?;
    Ok(Json(res))
}

/// DELETE /api/reservations/:id - 删除预订并释放关联桌台
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    seating::delete_reservation(state.pool(), id).await?;
    Ok(Json(true))
}

#[derive(Serialize)]
pub struct OverdueCheckResponse {
    pub flipped: u64,
}

/// POST /api/reservations/overdue-check - 手动触发逾期重检
pub async fn overdue_check(
    State(state): State<ServerState>,
) -> AppResult<Json<OverdueCheckResponse>> {
    let sweeper = RetentionSweeper::new(state.pool().clone(), &state.config);
    let flipped = sweeper.run_overdue_recheck().await?;
    Ok(Json(OverdueCheckResponse { flipped }))
}
