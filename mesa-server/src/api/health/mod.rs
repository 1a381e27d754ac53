//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 简单健康检查 |
//! | /health/detailed | GET | 数据库与后台状态 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::repository::bill;
use crate::seating::{self, OccupancySummary};
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | error)
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
    occupancy: OccupancySummary,
    /// 级联删除遗留的孤儿账单行数 — 应恒为 0
    orphan_bill_lines: i64,
}

pub async fn detailed_health(
    State(state): State<ServerState>,
) -> AppResult<Json<DetailedHealthResponse>> {
    let database = match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => "ok",
        Err(_) => "error",
    };
    let occupancy = seating::occupancy_summary(state.pool()).await?;
    let orphan_bill_lines = bill::count_orphan_lines(state.pool()).await?;

    Ok(Json(DetailedHealthResponse {
        status: if database == "ok" { "ok" } else { "error" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        occupancy,
        orphan_bill_lines,
    }))
}
