//! Time zone handling shared by the decoder and result typing.
//!
//! Neo4j's `Date`, `LocalTime` and `LocalDateTime` carry no zone. They are
//! interpreted in a configured IANA time zone (default `UTC`). Time-of-day
//! values are anchored on 0000-01-01.

use crate::error::{Error, Result};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA time zone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    Tz::from_str(name).map_err(|_| Error::InvalidTimezone(name.to_string()))
}

/// Resolve a wall-clock datetime in `tz` to a UTC instant.
///
/// A time repeated by a DST fold resolves to its earlier instant. A time
/// skipped by a DST gap has no instant and is an error.
pub fn localize(naive: NaiveDateTime, tz: &Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::AmbiguousDateTime {
            timezone: tz.name().to_string(),
            datetime: naive.to_string(),
        })
}

/// Date used to anchor time-of-day values.
pub fn time_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(0, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// The UTC instant of a temporal value, `None` for non-temporal values.
///
/// Durations are not instants and yield `None` as well.
pub fn to_instant(value: &Value, tz: &Tz) -> Option<Result<DateTime<Utc>>> {
    let instant = match value {
        Value::DateTime(dt) => Ok(dt.with_timezone(&Utc)),
        Value::LocalDateTime(naive) => localize(*naive, tz),
        Value::Date(date) => localize(date.and_time(NaiveTime::MIN), tz),
        Value::Time(time) => time
            .offset
            .from_local_datetime(&time_anchor().and_time(time.time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| Error::AmbiguousDateTime {
                timezone: time.offset.to_string(),
                datetime: time.time.to_string(),
            }),
        Value::LocalTime(time) => localize(time_anchor().and_time(*time), tz),
        _ => return None,
    };
    Some(instant)
}
