use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Booking, TimeSlot};
use crate::observability;
use crate::store::BookingFilter;

use super::{availability, conflict, Engine, EngineError};

impl Engine {
    /// Availability for one option over an inclusive calendar-date range:
    /// generate → advance-window filter → conflict annotation, ordered by
    /// start time. Read-only and unserialized — a slightly stale view is
    /// acceptable because Create re-validates under the option lock before
    /// committing. Inactive options still answer (viewable, not bookable).
    pub fn available_slots(
        &self,
        option_id: Ulid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        let started = std::time::Instant::now();
        let option = self.load_option(&option_id)?;
        let now = self.clock.now();

        let raw = availability::generate(&option, from, to)?;
        let mut slots = availability::advance_window(raw, &option.rules, now);
        let bookings = self.occupying_bookings(option_id)?;
        conflict::annotate(&mut slots, &bookings, &option.rules);
        slots.sort_by_key(|s| s.start_time);

        metrics::counter!(observability::SLOT_QUERIES_TOTAL).increment(1);
        metrics::histogram!(observability::SLOT_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(slots)
    }

    /// Booking listing for the admin surface — a filtered passthrough to
    /// the record store.
    pub fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, EngineError> {
        Ok(self.store.list_bookings(filter)?)
    }
}
