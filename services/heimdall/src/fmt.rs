//! Display formatting for timestamps and request durations

use chrono::{Local, TimeZone};

/// Format an epoch-seconds timestamp as `YYYY/M/D - H:MM:SS`
pub fn fmt_timestamp(epoch_secs: i64) -> String {
    match Local.timestamp_opt(epoch_secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y/%-m/%-d - %-H:%M:%S").to_string(),
        _ => "---".to_string(),
    }
}

/// Format how long ago an event happened.
///
/// A zero timestamp is the "never happened" sentinel.
pub fn fmt_timeago(epoch_secs: i64, now_secs: i64) -> String {
    if epoch_secs == 0 {
        return "---".to_string();
    }
    format!("{}s ago", now_secs.saturating_sub(epoch_secs))
}

/// Average request duration in milliseconds.
///
/// Zero requests means there is nothing to average; falls back to the
/// sentinel instead of dividing.
pub fn fmt_avg_time(total_time_ms: i64, count: i64) -> String {
    if count == 0 || total_time_ms == 0 {
        return "0ms".to_string();
    }
    format!("{}ms", total_time_ms / count)
}

/// Format the wall-clock duration of a deploy run
pub fn fmt_duration(begin_secs: i64, finish_secs: i64) -> String {
    if finish_secs <= begin_secs {
        return "---".to_string();
    }
    let total = finish_secs - begin_secs;
    let (mins, secs) = (total / 60, total % 60);
    if mins == 0 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", mins, secs)
    }
}
