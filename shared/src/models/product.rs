//! Product Model (catalog item)
//!
//! Catalog CRUD is handled elsewhere; the engine only reads price/name
//! snapshots and `image_url` references for the orphan-file sweep.

use serde::{Deserialize, Serialize};

/// Catalog product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
