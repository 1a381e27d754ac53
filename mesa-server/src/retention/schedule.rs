//! 清理任务调度 — 纯函数计算下一次触发时刻
//!
//! The sweep loops sleep until the next fire time instead of ticking on a
//! fixed interval, so daily/weekly/monthly jobs land on wall-clock moments
//! in the business timezone. `next_fire` is pure: it takes "now" as input
//! and is fully testable without a runtime.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::utils::time::date_time_to_millis;

/// When a sweep job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval in minutes
    Every { minutes: i64 },
    /// Every day at a wall-clock time in the business timezone
    Daily { at: NaiveTime },
    /// Once a week
    Weekly { weekday: Weekday, at: NaiveTime },
    /// Once a month, on a day of month (clamped to the month's length)
    Monthly { day: u32, at: NaiveTime },
}

impl Schedule {
    /// Next fire time strictly after `now_millis`, as Unix millis.
    ///
    /// DST gaps resolve via the latest valid local time (and fall back to
    /// UTC), matching the conversion in `utils::time`.
    pub fn next_fire(&self, now_millis: i64, tz: Tz) -> i64 {
        match *self {
            Schedule::Every { minutes } => now_millis + minutes.max(1) * 60_000,
            Schedule::Daily { at } => {
                let today = local_date(now_millis, tz);
                let candidate = date_time_to_millis(today, at, tz);
                if candidate > now_millis {
                    candidate
                } else {
                    date_time_to_millis(today + Duration::days(1), at, tz)
                }
            }
            Schedule::Weekly { weekday, at } => {
                let today = local_date(now_millis, tz);
                let mut date = today;
                for _ in 0..8 {
                    if date.weekday() == weekday {
                        let candidate = date_time_to_millis(date, at, tz);
                        if candidate > now_millis {
                            return candidate;
                        }
                    }
                    date += Duration::days(1);
                }
                // Unreachable: 8 consecutive days cover every weekday twice
                now_millis + 7 * 24 * 3_600_000
            }
            Schedule::Monthly { day, at } => {
                let today = local_date(now_millis, tz);
                let candidate = date_time_to_millis(clamp_to_month(today.year(), today.month(), day), at, tz);
                if candidate > now_millis {
                    candidate
                } else {
                    let (year, month) = if today.month() == 12 {
                        (today.year() + 1, 1)
                    } else {
                        (today.year(), today.month() + 1)
                    };
                    date_time_to_millis(clamp_to_month(year, month, day), at, tz)
                }
            }
        }
    }

    /// Sleep duration until the next fire
    pub fn sleep_until_next(&self, now_millis: i64, tz: Tz) -> std::time::Duration {
        let next = self.next_fire(now_millis, tz);
        let millis = (next - now_millis).max(1_000);
        std::time::Duration::from_millis(millis as u64)
    }
}

fn local_date(millis: i64, tz: Tz) -> NaiveDate {
    match tz.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        chrono::LocalResult::None => chrono::DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.date_naive())
            .unwrap_or_default(),
    }
}

/// Day-of-month clamped to the month's actual length (31 → Feb 28/29)
fn clamp_to_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let mut d = day.clamp(1, 31);
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, d) {
            return date;
        }
        d -= 1;
    }
}
