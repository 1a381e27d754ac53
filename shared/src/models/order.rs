//! Order Model

use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
    Closed,
}

impl OrderStatus {
    /// Terminal orders are immutable; only non-terminal orders act as the
    /// table's active cart.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Closed)
    }
}

/// Order entity — the mutable cart while non-terminal, frozen once closed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub table_id: i64,
    pub status: OrderStatus,
    /// When the order was opened (Unix millis)
    pub ordered_at: i64,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub service_charge: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line — exactly one of `product_id` / `menu_id` is set.
///
/// `unit_price` and `item_name` are snapshots taken at add time; later
/// catalog price changes never rewrite existing lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub menu_id: Option<i64>,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

/// Order with its lines (API response shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Add-to-order payload — exactly one of `product_id` / `menu_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAddLine {
    pub table_id: i64,
    pub product_id: Option<i64>,
    pub menu_id: Option<i64>,
    pub quantity: i32,
}

/// Update-line payload — quantity 0 removes the line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineUpdate {
    pub quantity: i32,
}
