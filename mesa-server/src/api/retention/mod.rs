//! Retention API 模块 — 清理任务手动触发

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/retention/run", post(handler::run))
}
