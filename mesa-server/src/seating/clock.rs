//! Reservation clock
//!
//! Derives a reservation's effective status from wall-clock time and
//! decides seating eligibility. Pure functions: the sweep persists the
//! `OVERDUE` transition, but read paths that cannot tolerate staleness
//! call [`classify`] directly instead of trusting the stored flag.

use shared::models::{Reservation, ReservationStatus};

/// Seating is permitted this far on either side of the scheduled moment,
/// boundary inclusive.
pub const SEATING_WINDOW_MILLIS: i64 = 15 * 60 * 1000;

/// Effective status at `now_millis`.
///
/// Terminal statuses are returned unchanged; a confirmed reservation whose
/// scheduled moment has passed is `OVERDUE`; anything else keeps its stored
/// status.
pub fn classify(reservation: &Reservation, now_millis: i64) -> ReservationStatus {
    if reservation.status.is_terminal() {
        return reservation.status;
    }
    if reservation.status == ReservationStatus::Confirmed
        && reservation.scheduled_at > 0
        && now_millis > reservation.scheduled_at
    {
        return ReservationStatus::Overdue;
    }
    reservation.status
}

/// Whether the party may be seated at `now_millis`.
///
/// True when the stored status is overdue (they are late, seat them), or
/// confirmed and within ±[`SEATING_WINDOW_MILLIS`] of the scheduled moment
/// (slightly early and slightly late are both fine, inclusive).
///
/// Deliberately reads the stored status, not [`classify`]: a confirmed
/// reservation 16 minutes late is outside the window until the sweep or an
/// operator marks it overdue.
///
/// Malformed scheduled-time data fails closed: "not yet" is always safer
/// than an accidental double seating.
pub fn can_seat(reservation: &Reservation, now_millis: i64) -> bool {
    if reservation.scheduled_at <= 0 {
        return false;
    }
    match reservation.status {
        ReservationStatus::Overdue => true,
        ReservationStatus::Confirmed => {
            (now_millis - reservation.scheduled_at).abs() <= SEATING_WINDOW_MILLIS
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60 * 1000;

    fn reservation(status: ReservationStatus, scheduled_at: i64) -> Reservation {
        Reservation {
            id: 1,
            table_id: 10,
            customer_name: Some("Ana".into()),
            customer_phone: None,
            party_size: 2,
            scheduled_at,
            duration_minutes: 90,
            status,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn terminal_statuses_are_unchanged() {
        let t = 1_000_000_000;
        for status in [
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
            ReservationStatus::NoShow,
        ] {
            let r = reservation(status, t);
            // Even long past the scheduled moment
            assert_eq!(classify(&r, t + 100 * MINUTE), status);
        }
    }

    #[test]
    fn confirmed_past_schedule_is_overdue() {
        let t = 1_000_000_000;
        let r = reservation(ReservationStatus::Confirmed, t);
        assert_eq!(classify(&r, t + 1), ReservationStatus::Overdue);
        // Exactly at the scheduled moment is still confirmed
        assert_eq!(classify(&r, t), ReservationStatus::Confirmed);
        assert_eq!(classify(&r, t - 1), ReservationStatus::Confirmed);
    }

    #[test]
    fn pending_never_becomes_overdue() {
        let t = 1_000_000_000;
        let r = reservation(ReservationStatus::Pending, t);
        assert_eq!(classify(&r, t + 100 * MINUTE), ReservationStatus::Pending);
    }

    #[test]
    fn seating_window_boundary_is_inclusive() {
        let t = 1_000_000_000;
        let r = reservation(ReservationStatus::Confirmed, t);
        assert!(can_seat(&r, t - 15 * MINUTE));
        assert!(can_seat(&r, t + 15 * MINUTE));
        // One minute outside, on either side, is refused until the sweep
        // (or an operator) marks the reservation overdue.
        assert!(!can_seat(&r, t - 16 * MINUTE));
        assert!(!can_seat(&r, t + 16 * MINUTE));
    }

    #[test]
    fn overdue_is_always_seatable() {
        let t = 1_000_000_000;
        let r = reservation(ReservationStatus::Overdue, t);
        assert!(can_seat(&r, t + 100 * MINUTE));
    }

    #[test]
    fn pending_and_terminal_are_not_seatable() {
        let t = 1_000_000_000;
        assert!(!can_seat(&reservation(ReservationStatus::Pending, t), t));
        assert!(!can_seat(&reservation(ReservationStatus::Cancelled, t), t));
        assert!(!can_seat(&reservation(ReservationStatus::Completed, t), t));
        assert!(!can_seat(&reservation(ReservationStatus::NoShow, t), t));
    }

    #[test]
    fn malformed_schedule_fails_closed() {
        let r = reservation(ReservationStatus::Confirmed, 0);
        assert!(!can_seat(&r, 1_000_000_000));
        let r = reservation(ReservationStatus::Overdue, -5);
        assert!(!can_seat(&r, 1_000_000_000));
    }
}
