//! Reservation Model

use serde::{Deserialize, Serialize};

/// Reservation status
///
/// `OVERDUE` is derived from wall-clock time by the reservation clock and
/// persisted by the sweep so reads stay cheap; clients can never set it
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
    Overdue,
}

impl ReservationStatus {
    /// Terminal statuses never change again without explicit staff action
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::NoShow)
    }
}

/// Reservation entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: i64,
    pub table_id: i64,
    /// Optional — walk-ins have no stored customer
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub party_size: i32,
    /// Scheduled moment (Unix millis)
    pub scheduled_at: i64,
    /// Expected duration hint in minutes
    pub duration_minutes: i32,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreate {
    pub table_id: i64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub party_size: i32,
    pub scheduled_at: i64,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

/// Update reservation payload
///
/// Setting `status = OVERDUE` here is rejected by the handler; the flag is
/// sweep-owned.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReservationUpdate {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub party_size: Option<i32>,
    pub scheduled_at: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub status: Option<ReservationStatus>,
    pub notes: Option<String>,
}
