use chrono::{DateTime, Utc};

use crate::model::{Booking, BookingRules, TimeSlot};
use crate::time;

/// Buffered interval of a booking:
/// `[start − buffer_before_minutes, end + buffer_after_minutes]`.
pub fn buffered_interval(
    booking: &Booking,
    rules: &BookingRules,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        booking.start_time - time::minutes(rules.buffer_before_minutes),
        booking.end_time + time::minutes(rules.buffer_after_minutes),
    )
}

/// Half-open overlap test between `[a_start, a_end)` and `[b_start, b_end)`.
/// Touching endpoints do not overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Mark each candidate slot unavailable iff it overlaps the buffered
/// interval of any occupying booking. `bookings` must already be scoped to
/// the slot's option; cancelled bookings never block. O(slots × bookings)
/// scan — no index needed at this data scale.
pub fn annotate(slots: &mut [TimeSlot], bookings: &[Booking], rules: &BookingRules) {
    for slot in slots.iter_mut() {
        for booking in bookings {
            if !booking.occupies() {
                continue;
            }
            let (blocked_start, blocked_end) = buffered_interval(booking, rules);
            if overlaps(slot.start_time, slot.end_time, blocked_start, blocked_end) {
                slot.available = false;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use ulid::Ulid;

    use crate::model::{Booker, BookingState};

    fn instant(h: u32, m: u32) -> DateTime<Utc> {
        // Arbitrary fixed day; only relative positions matter here.
        let day = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        crate::time::at_wall_clock(day, NaiveTime::from_hms_opt(h, m, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    }

    fn rules_with_buffers(before: u32, after: u32) -> BookingRules {
        BookingRules {
            slot_increment_minutes: 60,
            min_advance_minutes: 0,
            max_advance_days: 30,
            cancellation_cutoff_minutes: 0,
            buffer_before_minutes: before,
            buffer_after_minutes: after,
        }
    }

    fn booking(start: DateTime<Utc>, end: DateTime<Utc>, state: BookingState) -> Booking {
        let now = Utc::now();
        Booking {
            id: Ulid::new(),
            option_id: Ulid::new(),
            location_id: Ulid::new(),
            mode: "rum".into(),
            start_time: start,
            end_time: end,
            booker: Booker {
                name: "Test".into(),
                email: Some("test@example.com".into()),
                phone: None,
            },
            num_people: 1,
            notes: None,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    fn slot(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeSlot {
        TimeSlot {
            start_time: start,
            end_time: end,
            available: true,
        }
    }

    #[test]
    fn buffered_interval_extends_both_sides() {
        let b = booking(instant(13, 0), instant(14, 0), BookingState::Confirmed);
        let (start, end) = buffered_interval(&b, &rules_with_buffers(10, 10));
        assert_eq!(start, instant(12, 50));
        assert_eq!(end, instant(14, 10));
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        assert!(!overlaps(instant(11, 0), instant(12, 0), instant(12, 0), instant(13, 0)));
        assert!(!overlaps(instant(12, 0), instant(13, 0), instant(11, 0), instant(12, 0)));
        assert!(overlaps(instant(11, 0), instant(12, 1), instant(12, 0), instant(13, 0)));
    }

    #[test]
    fn slot_overlapping_buffer_is_marked_unavailable() {
        // Booking 13:00–14:00 with 10-minute buffers blocks 12:50–14:10.
        let bookings = vec![booking(instant(13, 0), instant(14, 0), BookingState::Confirmed)];
        let rules = rules_with_buffers(10, 10);

        let mut slots = vec![
            slot(instant(11, 0), instant(12, 0)), // clear of the buffer
            slot(instant(12, 0), instant(13, 0)), // overlaps 12:50–13:00
            slot(instant(14, 0), instant(15, 0)), // overlaps 14:00–14:10
        ];
        annotate(&mut slots, &bookings, &rules);

        assert!(slots[0].available);
        assert!(!slots[1].available);
        assert!(!slots[2].available);
    }

    #[test]
    fn buffer_boundary_is_exclusive() {
        // Slot ending exactly at start − buffer_before touches, not overlaps.
        let bookings = vec![booking(instant(13, 0), instant(14, 0), BookingState::Confirmed)];
        let rules = rules_with_buffers(10, 0);

        let mut slots = vec![
            slot(instant(11, 50), instant(12, 50)),
            slot(instant(11, 51), instant(12, 51)),
        ];
        annotate(&mut slots, &bookings, &rules);

        assert!(slots[0].available);
        assert!(!slots[1].available);
    }

    #[test]
    fn zero_buffers_allow_adjacent_slots() {
        let bookings = vec![booking(instant(13, 0), instant(14, 0), BookingState::Confirmed)];
        let rules = rules_with_buffers(0, 0);

        let mut slots = vec![
            slot(instant(12, 0), instant(13, 0)),
            slot(instant(13, 0), instant(14, 0)),
            slot(instant(14, 0), instant(15, 0)),
        ];
        annotate(&mut slots, &bookings, &rules);

        assert!(slots[0].available);
        assert!(!slots[1].available);
        assert!(slots[2].available);
    }

    #[test]
    fn cancelled_bookings_never_block() {
        let bookings = vec![booking(instant(13, 0), instant(14, 0), BookingState::Cancelled)];
        let mut slots = vec![slot(instant(13, 0), instant(14, 0))];
        annotate(&mut slots, &bookings, &rules_with_buffers(10, 10));
        assert!(slots[0].available);
    }

    #[test]
    fn pending_bookings_block_like_confirmed() {
        let bookings = vec![booking(instant(13, 0), instant(14, 0), BookingState::Pending)];
        let mut slots = vec![slot(instant(13, 0), instant(14, 0))];
        annotate(&mut slots, &bookings, &rules_with_buffers(0, 0));
        assert!(!slots[0].available);
    }
}
