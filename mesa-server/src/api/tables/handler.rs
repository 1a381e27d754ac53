//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use shared::models::{DiningTable, DiningTableCreate, SeatCustomer, TableStatus};

use crate::core::ServerState;
use crate::db::repository::dining_table;
use crate::seating::{self, OccupancySummary};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 按分区过滤 ("A", "B", ...)
    pub section: Option<String>,
}

/// GET /api/tables - 获取所有桌台 (可按分区过滤)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<DiningTable>>> {
    let tables = match query.section {
        Some(section) => dining_table::find_by_section(state.pool(), &section).await?,
        None => dining_table::find_all(state.pool()).await?,
    };
    Ok(Json(tables))
}

/// GET /api/tables/:id - 获取单个桌台
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DiningTable>> {
    let table = dining_table::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {} not found", id)))?;
    Ok(Json(table))
}

/// POST /api/tables - 创建桌台
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DiningTableCreate>,
) -> AppResult<Json<DiningTable>> {
    let table = dining_table::create(state.pool(), payload).await?;
    Ok(Json(table))
}

/// GET /api/tables/occupancy - 占用率统计
pub async fn occupancy(State(state): State<ServerState>) -> AppResult<Json<OccupancySummary>> {
    let summary = seating::occupancy_summary(state.pool()).await?;
    Ok(Json(summary))
}

/// POST /api/tables/:id/seat - 入座 (预订或散客)
pub async fn seat(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<SeatCustomer>,
) -> AppResult<Json<DiningTable>> {
    let table = seating::seat_customer(state.pool(), id, payload).await?;
    Ok(Json(table))
}

/// POST /api/tables/:id/clear - 清台
pub async fn clear(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DiningTable>> {
    let table = seating::clear_table(state.pool(), id).await?;
    Ok(Json(table))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: TableStatus,
}

/// PUT /api/tables/:id/status - 设置桌台状态 (如 CLEANING)
///
/// 占用中的桌台与 OCCUPIED 目标都会被拒绝 — 占用状态只能由入座/清台
/// 状态机改变。
pub async fn set_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<DiningTable>> {
    if payload.status == TableStatus::Occupied {
        return Err(AppError::validation(
            "OCCUPIED is owned by the seating state machine",
        ));
    }
    let updated = dining_table::set_status(state.pool(), id, payload.status).await?;
    if !updated {
        return Err(AppError::conflict(format!(
            "Table {} is occupied or does not exist",
            id
        )));
    }
    let table = dining_table::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {} not found", id)))?;
    Ok(Json(table))
}
