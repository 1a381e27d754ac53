//! Menu Package Model
//!
//! A fixed-price bundle of products sold as a single order line.

use serde::{Deserialize, Serialize};

/// Menu package entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Menu {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
