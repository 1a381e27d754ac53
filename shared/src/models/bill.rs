//! Bill Model

use serde::{Deserialize, Serialize};

/// Payment status of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

/// Lifecycle status of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum BillStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Bill entity
///
/// Produced from a closed order. Numeric fields are frozen at generation
/// time and never re-derived when tax configuration changes later. A bill
/// references its source order but does not own it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: i64,
    /// Sortable, globally unique: "B<yyyymmdd>-<snowflake>"
    pub bill_number: String,
    pub order_id: Option<i64>,
    pub customer_name: Option<String>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub service_charge: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub bill_status: BillStatus,
    pub created_at: i64,
}

/// Bill line — owned by the bill (cascade-deleted with it)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BillProduct {
    pub id: i64,
    pub bill_id: i64,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

/// Bill with its lines (API response shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub lines: Vec<BillProduct>,
}

/// Generate bill payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillCreate {
    /// Must reference a closed order
    pub order_id: i64,
    #[serde(default)]
    pub discount_amount: Option<f64>,
    pub customer_name: Option<String>,
}
