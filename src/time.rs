//! Display helpers for snapshot timestamps

use chrono::{DateTime, TimeDelta, Utc};

/// Format a UTC instant as local wall-clock time.
///
/// `offset_minutes` follows the browser convention (UTC minus local), so
/// Tokyo is `-540` and Los Angeles `480`. A missing instant, or an offset
/// that moves it out of the representable range, renders as `""`.
pub fn format_local(time: Option<DateTime<Utc>>, offset_minutes: Option<i64>) -> String {
    time.zip(TimeDelta::try_minutes(offset_minutes.unwrap_or(0)))
        .and_then(|(time, offset)| time.checked_sub_signed(offset))
        .map(|local| local.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default()
}
