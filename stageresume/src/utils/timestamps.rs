//! Epoch-millisecond timestamp helpers.
//!
//! Execution records store times as Unix epoch milliseconds.

use chrono::{Duration, Utc};

/// Returns the current time as Unix epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns true if `created_at_millis` lies more than `days` days before `now`.
///
/// # Examples
///
/// ```
/// use stageresume::utils::is_older_than_days;
///
/// let day = 24 * 60 * 60 * 1000;
/// assert!(is_older_than_days(0, 31 * day, 30));
/// assert!(!is_older_than_days(0, 29 * day, 30));
/// ```
#[must_use]
pub fn is_older_than_days(created_at_millis: i64, now_millis: i64, days: u32) -> bool {
    let max_age = Duration::days(i64::from(days)).num_milliseconds();
    now_millis.saturating_sub(created_at_millis) > max_age
}
