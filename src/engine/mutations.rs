use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};
use ulid::Ulid;

use crate::model::{Booker, Booking, BookingOption, BookingState};
use crate::observability;
use crate::time;

use super::{availability, conflict, Engine, EngineError};

/// Input for a booking creation. `start_time` must be an exact generated
/// slot start for the option.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub option_id: Ulid,
    pub start_time: DateTime<Utc>,
    pub booker: Booker,
    pub num_people: u32,
    pub notes: Option<String>,
}

impl Engine {
    /// Create a booking: validate, then re-validate and commit under the
    /// option's exclusive lock. Either exactly one new `Confirmed` booking
    /// is persisted, or nothing is.
    pub async fn create_booking(&self, request: CreateBooking) -> Result<Booking, EngineError> {
        let result = self.create_booking_inner(request).await;
        match &result {
            Ok(booking) => {
                metrics::counter!(observability::BOOKINGS_CREATED_TOTAL).increment(1);
                info!(
                    booking = %booking.id,
                    option = %booking.option_id,
                    start = %booking.start_time,
                    "booking confirmed"
                );
            }
            Err(e) => {
                metrics::counter!(
                    observability::BOOKING_REJECTIONS_TOTAL,
                    "op" => "create",
                    "code" => e.code(),
                )
                .increment(1);
            }
        }
        result
    }

    async fn create_booking_inner(&self, request: CreateBooking) -> Result<Booking, EngineError> {
        // Optimistic pass without the lock: cheap rejection of requests
        // that cannot succeed no matter how the race resolves.
        let option = self.load_option(&request.option_id)?;
        self.validate_request(&option, &request, self.clock.now())?;

        let lock = self.option_lock(request.option_id);
        let _guard = lock.lock().await;

        // Re-read and re-validate against the latest committed state. The
        // re-check and the write happen under the same guard, so no other
        // Create on this option can observe-and-commit in between.
        let option = self.load_option(&request.option_id)?;
        self.validate_request(&option, &request, self.clock.now())?;

        let now = self.clock.now().with_timezone(&Utc);
        let booking = Booking {
            id: Ulid::new(),
            option_id: option.id,
            location_id: option.location_id,
            mode: option.mode.clone(),
            start_time: request.start_time,
            end_time: request.start_time + option.duration(),
            booker: request.booker,
            num_people: request.num_people,
            notes: request.notes,
            state: BookingState::Confirmed,
            created_at: now,
            updated_at: now,
        };
        self.store.put_booking(booking.clone())?;
        Ok(booking)
    }

    /// One full validation pass: activity, capacity, slot alignment,
    /// advance window, conflicts — against a fresh bookings snapshot.
    fn validate_request(
        &self,
        option: &BookingOption,
        request: &CreateBooking,
        now: DateTime<Tz>,
    ) -> Result<(), EngineError> {
        if !option.is_active {
            return Err(EngineError::Unavailable);
        }
        if request.num_people > option.capacity.max_people {
            return Err(EngineError::CapacityExceeded {
                max_people: option.capacity.max_people,
            });
        }

        // Single-day lattice for the requested start's calendar day.
        let day = request.start_time.with_timezone(&time::ZONE).date_naive();
        let raw = availability::generate(option, day, day)?;
        let slot = raw
            .iter()
            .find(|s| s.start_time == request.start_time)
            .copied()
            .ok_or(EngineError::InvalidSlot)?;

        // Aligned but outside the advance window or conflicting — both are
        // the same outcome for the caller, including a lost race on the
        // locked re-check.
        if availability::advance_window(vec![slot], &option.rules, now).is_empty() {
            debug!(option = %option.id, start = %request.start_time, "slot outside advance window");
            return Err(EngineError::SlotUnavailable);
        }

        let bookings = self.occupying_bookings(option.id)?;
        let mut candidate = [slot];
        conflict::annotate(&mut candidate, &bookings, &option.rules);
        if !candidate[0].available {
            debug!(option = %option.id, start = %request.start_time, "slot conflicts with existing booking");
            return Err(EngineError::SlotUnavailable);
        }

        Ok(())
    }

    /// Cancel a booking. The cutoff check is skipped when the owning option
    /// no longer exists (orphaned bookings stay cancellable). `updated_at`
    /// changes only on the successful transition.
    pub async fn cancel_booking(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        let result = self.cancel_booking_inner(booking_id).await;
        match &result {
            Ok(booking) => {
                metrics::counter!(observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
                info!(booking = %booking.id, option = %booking.option_id, "booking cancelled");
            }
            Err(e) => {
                metrics::counter!(
                    observability::BOOKING_REJECTIONS_TOTAL,
                    "op" => "cancel",
                    "code" => e.code(),
                )
                .increment(1);
            }
        }
        result
    }

    async fn cancel_booking_inner(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        let booking = self
            .store
            .get_booking(&booking_id)?
            .ok_or(EngineError::NotFound)?;

        // Same critical section as Create: the one record's read-modify-
        // write never interleaves another operation on this option.
        let lock = self.option_lock(booking.option_id);
        let _guard = lock.lock().await;

        let mut booking = self
            .store
            .get_booking(&booking_id)?
            .ok_or(EngineError::NotFound)?;
        if booking.state == BookingState::Cancelled {
            return Err(EngineError::AlreadyCancelled);
        }

        let now = self.clock.now().with_timezone(&Utc);
        if let Some(option) = self.store.get_option(&booking.option_id)? {
            let cutoff_minutes = option.rules.cancellation_cutoff_minutes;
            let cutoff = booking.start_time - time::minutes(cutoff_minutes);
            if now > cutoff {
                return Err(EngineError::CutoffPassed { cutoff_minutes });
            }
        }

        booking.state = BookingState::Cancelled;
        booking.updated_at = now;
        self.store.put_booking(booking.clone())?;
        Ok(booking)
    }
}
