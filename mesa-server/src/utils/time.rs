//! 时间工具函数 — 业务时区转换
//!
//! 所有持久化时刻统一为 `i64` Unix millis；日期→时间戳转换在这里完成。

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 解析时区字符串，失败返回 UTC
pub fn parse_tz(tz: &str) -> Tz {
    tz.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone '{}', falling back to UTC", tz);
        chrono_tz::UTC
    })
}

/// 解析 HH:MM 时间字符串，失败返回 00:00
pub fn parse_hhmm(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").unwrap_or_else(|e| {
        tracing::warn!("Failed to parse time '{}': {}, falling back to 00:00", value, e);
        NaiveTime::MIN
    })
}

/// 日期 + 时刻 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_time_to_millis(date: NaiveDate, time: NaiveTime, tz: Tz) -> i64 {
    let naive = date.and_time(time);
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// Unix millis → 业务时区日期
pub fn millis_to_local_date(millis: i64, tz: Tz) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&tz).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_roundtrip() {
        let d = parse_date("2026-03-01").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(parse_date("01/03/2026").is_err());
    }

    #[test]
    fn hhmm_fallback_is_midnight() {
        assert_eq!(parse_hhmm("02:30"), NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(parse_hhmm("bogus"), NaiveTime::MIN);
    }

    #[test]
    fn date_conversion_is_tz_aware() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let utc = date_time_to_millis(date, NaiveTime::MIN, chrono_tz::UTC);
        let madrid = date_time_to_millis(date, NaiveTime::MIN, chrono_tz::Europe::Madrid);
        // Madrid midnight is one hour before UTC midnight in January
        assert_eq!(utc - madrid, 3_600_000);
    }
}
