//! Data models
//!
//! Shared between mesa-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all instants Unix millis.

pub mod bill;
pub mod dining_table;
pub mod menu;
pub mod order;
pub mod product;
pub mod reservation;
pub mod revoked_token;

// Re-exports
pub use bill::*;
pub use dining_table::*;
pub use menu::*;
pub use order::*;
pub use product::*;
pub use reservation::*;
pub use revoked_token::*;
