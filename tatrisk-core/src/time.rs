//! Time utilities: task age and audit timestamps.

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Parse a timestamp from an extract, trying the formats the ticketing exports use.
/// Naive values are interpreted in `tz`.
pub fn parse_flexible(raw: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty date string");
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    let Some(naive) = naive else {
        bail!("unable to parse date: {raw}");
    };

    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("invalid local time (DST gap?): {raw} {tz}"))?;

    Ok(local.with_timezone(&Utc))
}

/// Days between creation and `reference`, rounded to one decimal. Never negative.
pub fn days_open(created: DateTime<Utc>, reference: DateTime<Utc>) -> f64 {
    let secs = (reference - created).num_seconds().max(0) as f64;
    (secs / 86_400.0 * 10.0).round() / 10.0
}

/// `YYYY-MM-DD HH:MM` in the given zone, as used in audit comments.
pub fn audit_stamp(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}
