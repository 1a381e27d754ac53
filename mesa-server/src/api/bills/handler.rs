//! Bill API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::{BillCreate, BillDetail};

use crate::billing;
use crate::core::ServerState;
use crate::utils::AppResult;

/// POST /api/bills - 从已关闭订单生成账单 (每订单至多一张)
pub async fn generate(
    State(state): State<ServerState>,
    Json(payload): Json<BillCreate>,
) -> AppResult<Json<BillDetail>> {
    let detail = billing::generate_bill(
        state.pool(),
        &state.config.billing,
        state.config.business_tz,
        payload,
    )
    .await?;
    Ok(Json(detail))
}

/// GET /api/bills/:id - 获取账单详情
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BillDetail>> {
    let detail = billing::get_bill(state.pool(), id).await?;
    Ok(Json(detail))
}
