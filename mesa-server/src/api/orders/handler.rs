//! Order Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::{OrderAddLine, OrderDetail, OrderLineUpdate};

use crate::core::ServerState;
use crate::orders;
use crate::utils::{AppError, AppResult};

/// POST /api/orders - 向桌台购物车加入商品 (无活动订单时自动创建)
pub async fn add_line(
    State(state): State<ServerState>,
    Json(payload): Json<OrderAddLine>,
) -> AppResult<Json<OrderDetail>> {
    let detail = orders::add_line(state.pool(), payload).await?;
    Ok(Json(detail))
}

/// PUT /api/orders/items/:line_id - 修改行数量 (0 = 删除)
pub async fn update_line(
    State(state): State<ServerState>,
    Path(line_id): Path<i64>,
    Json(payload): Json<OrderLineUpdate>,
) -> AppResult<Json<OrderDetail>> {
    let detail = orders::update_line(state.pool(), line_id, payload).await?;
    Ok(Json(detail))
}

/// GET /api/orders/:id - 获取订单详情
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = orders::get_order(state.pool(), id).await?;
    Ok(Json(detail))
}

/// GET /api/orders/table/:table_id - 桌台当前活动订单
pub async fn active_for_table(
    State(state): State<ServerState>,
    Path(table_id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    orders::active_order_for_table(state.pool(), table_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Table {} has no active order", table_id)))
}

/// PUT /api/orders/:id/close - 关闭订单，冻结金额并释放桌台
pub async fn close(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = orders::close_order(state.pool(), &state.config.billing, id).await?;
    Ok(Json(detail))
}
