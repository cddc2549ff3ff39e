use chrono::{DateTime, Months};

/// One day in milliseconds
pub const DAY_MS: i64 = 86_400_000;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Add whole calendar months to a millisecond timestamp.
///
/// Day-of-month is clamped the way chrono does (Jan 31 + 1 month = Feb 28/29).
/// Returns `None` when the result is out of chrono's range.
pub fn add_months(ts_millis: i64, months: u32) -> Option<i64> {
    DateTime::from_timestamp_millis(ts_millis)?
        .checked_add_months(Months::new(months))
        .map(|dt| dt.timestamp_millis())
}
