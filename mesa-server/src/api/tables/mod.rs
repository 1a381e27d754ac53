//! Dining Table API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/occupancy", get(handler::occupancy))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/seat", post(handler::seat))
        .route("/{id}/clear", post(handler::clear))
        .route("/{id}/status", put(handler::set_status))
}
