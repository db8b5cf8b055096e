use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::time;

/// One recurring availability window: a weekday plus wall-clock open/close
/// times in the engine's fixed zone. A weekday may carry any number of
/// windows, including none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    /// ISO weekday: 1 = Monday … 7 = Sunday.
    pub weekday: u8,
    #[serde(with = "time::hhmm")]
    pub start: NaiveTime,
    #[serde(with = "time::hhmm")]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub max_people: u32,
}

/// Per-option scheduling rules. All values are minutes except
/// `max_advance_days`, which counts calendar days in the fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRules {
    pub slot_increment_minutes: u32,
    pub min_advance_minutes: u32,
    pub max_advance_days: u32,
    pub cancellation_cutoff_minutes: u32,
    pub buffer_before_minutes: u32,
    pub buffer_after_minutes: u32,
}

/// A bookable resource definition with recurring weekly availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingOption {
    pub id: Ulid,
    pub location_id: Ulid,
    pub mode: String,
    pub label: String,
    pub description: String,
    pub duration_minutes: u32,
    pub capacity: Capacity,
    pub rules: BookingRules,
    pub weekly_hours: Vec<WeeklyHours>,
    /// Inactive options are viewable but not bookable.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingOption {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }

    /// Windows whose weekday matches, in declaration order.
    pub fn windows_for(&self, weekday: u8) -> impl Iterator<Item = &WeeklyHours> {
        self.weekly_hours.iter().filter(move |wh| wh.weekday == weekday)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booker {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A reservation against exactly one booking option. Never deleted; the
/// only state transition is cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub option_id: Ulid,
    /// Denormalized from the option at creation time, never recomputed.
    pub location_id: Ulid,
    pub mode: String,
    pub start_time: DateTime<Utc>,
    /// `start_time + duration_minutes` of the option at creation time.
    pub end_time: DateTime<Utc>,
    pub booker: Booker,
    pub num_people: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub state: BookingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether this booking blocks other reservations. Cancelled bookings
    /// never block.
    pub fn occupies(&self) -> bool {
        matches!(self.state, BookingState::Pending | BookingState::Confirmed)
    }
}

/// A candidate reservable interval, derived on demand from an option's
/// weekly hours. Has no identity beyond its start time within one option
/// and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub available: bool,
}

/// The journal record format — flat, last-write-wins on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    OptionPut(BookingOption),
    OptionDeleted(Ulid),
    BookingPut(Booking),
}
