//! Shared types for the Mesa table-service server.
//!
//! Row/payload models live in [`models`]; ID and timestamp helpers in
//! [`util`]. DB row types derive `sqlx::FromRow` behind the `db` feature so
//! frontends can depend on this crate without pulling in sqlx.

pub mod models;
pub mod util;
