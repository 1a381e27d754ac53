//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Table occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    Cleaning,
}

impl Default for TableStatus {
    fn default() -> Self {
        Self::Available
    }
}

/// Dining table entity (桌台)
///
/// `name` is derived from section + zero-padded number, e.g. "A-01".
/// Occupancy fields (`current_reservation_id`, `customer_name`,
/// `party_size`, `occupied_at`) are owned by the seating state machine and
/// cleared on every transition back to `AVAILABLE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    /// Section letter ("A", "B", ...)
    pub section: String,
    pub table_number: i32,
    pub capacity: i32,
    pub is_occupied: bool,
    pub table_status: TableStatus,
    /// Reservation currently assigned to this table, if any
    pub current_reservation_id: Option<i64>,
    pub customer_name: Option<String>,
    pub party_size: Option<i32>,
    /// When the current party was seated (Unix millis)
    pub occupied_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DiningTable {
    /// Canonical display name: section letter + zero-padded number
    pub fn format_name(section: &str, number: i32) -> String {
        format!("{}-{:02}", section, number)
    }
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub section: String,
    pub table_number: i32,
    pub capacity: Option<i32>,
}

/// Seat customer payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SeatCustomer {
    /// Reservation to seat; None for a walk-in
    pub reservation_id: Option<i64>,
    /// Walk-in customer name (ignored when a reservation is given)
    pub customer_name: Option<String>,
    pub party_size: Option<i32>,
}
