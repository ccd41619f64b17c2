//! Utility functions for unit and text conversion

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::api::k8s::TimeOfDay;

const GIB: i64 = 1 << 30;

/// Bytes to gibibytes, keeping fractions (e.g., 1.5 GiB of memory)
pub fn to_gigabytes_f64(bytes: i64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Bytes to whole gibibytes
pub fn to_gigabytes(bytes: i64) -> i64 {
    bytes / GIB
}

/// Timestamp as RFC 3339 with second precision (e.g., "2024-03-01T10:00:00Z")
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Time of day as "HH:MM" (seconds are kept only when set)
pub fn format_time_of_day(t: &TimeOfDay) -> String {
    if t.seconds == 0 {
        format!("{:02}:{:02}", t.hours, t.minutes)
    } else {
        format!("{:02}:{:02}:{:02}", t.hours, t.minutes, t.seconds)
    }
}

/// Duration in compact hour/minute/second form (e.g., "3h", "1h30m", "45s")
pub fn format_hms(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    if total == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{}h", h));
    }
    if m > 0 {
        out.push_str(&format!("{}m", m));
    }
    if s > 0 {
        out.push_str(&format!("{}s", s));
    }
    out
}

/// Quote a value for an API list filter (e.g., `name="workers"`)
pub fn filter_eq(field: &str, value: &str) -> String {
    format!(
        "{}=\"{}\"",
        field,
        value.replace('\\', "\\\\").replace('"', "\\\"")
    )
}
