//! Order Cart API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::add_line))
        .route("/items/{line_id}", put(handler::update_line))
        .route("/table/{table_id}", get(handler::active_for_table))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/close", put(handler::close))
}
