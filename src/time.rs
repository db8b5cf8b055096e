//! Fixed-zone time utilities. Every wall-clock decision in the engine —
//! weekday, day boundaries, "now" — goes through [`ZONE`], regardless of
//! the machine's local zone.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The one named zone all scheduling happens in.
pub const ZONE: Tz = chrono_tz::Europe::Stockholm;

/// Current instant, zone-qualified.
pub fn now() -> DateTime<Tz> {
    Utc::now().with_timezone(&ZONE)
}

/// Resolve a wall-clock time on a calendar day to an instant in [`ZONE`].
///
/// Ambiguous local times (DST fall-back) resolve to the earliest mapping.
/// Nonexistent local times (spring-forward gap) yield `None`.
pub fn at_wall_clock(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    ZONE.from_local_datetime(&date.and_time(time)).earliest()
}

/// ISO weekday of a calendar day: 1 = Monday … 7 = Sunday.
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Inclusive iteration over calendar days.
pub fn days_inclusive(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

pub fn minutes(m: u32) -> Duration {
    Duration::minutes(m as i64)
}

/// Add calendar days in [`ZONE`], preserving the wall-clock time across DST
/// transitions. Falls back to absolute 24-hour days if the target wall-clock
/// time does not exist.
pub fn plus_calendar_days(t: DateTime<Tz>, days: u32) -> DateTime<Tz> {
    t.checked_add_days(Days::new(days as u64))
        .unwrap_or_else(|| t + Duration::days(days as i64))
}

/// Serde codec for `"HH:MM"` wall-clock strings.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(de)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Source of "now" for engine operations. Read exactly once per operation
/// so a single response sees one stable window.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// The wall clock in [`ZONE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Tz>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.0
    }
}
