use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::model::{BookingOption, BookingRules, TimeSlot};
use crate::time;

use super::EngineError;

// ── Slot lattice ──────────────────────────────────────────

/// Generate the raw candidate slots for `option` over an inclusive
/// calendar-day range. Day boundaries and weekdays are taken in the fixed
/// zone. Within each matching weekly window the cursor steps by
/// `slot_increment_minutes`; a slot is emitted only if it fits entirely
/// inside the window (trailing partial slots are discarded, not truncated).
/// Windows on the same weekday are processed independently — no dedup.
pub fn generate(
    option: &BookingOption,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<TimeSlot>, EngineError> {
    // A zero increment would never advance the cursor.
    if option.rules.slot_increment_minutes == 0 {
        return Err(EngineError::InvalidConfiguration(
            "slot_increment_minutes must be positive",
        ));
    }

    let duration = option.duration();
    let increment = time::minutes(option.rules.slot_increment_minutes);
    let mut slots = Vec::new();

    for day in time::days_inclusive(from, to) {
        let weekday = time::weekday_number(day);
        for window in option.windows_for(weekday) {
            // A window whose boundary falls in a DST gap has no usable
            // wall-clock anchor on this day.
            let Some(start) = time::at_wall_clock(day, window.start) else {
                continue;
            };
            let Some(end) = time::at_wall_clock(day, window.end) else {
                continue;
            };

            let mut cursor = start;
            while cursor + duration <= end {
                slots.push(TimeSlot {
                    start_time: cursor.with_timezone(&Utc),
                    end_time: (cursor + duration).with_timezone(&Utc),
                    available: true,
                });
                cursor += increment;
            }
        }
    }

    Ok(slots)
}

// ── Advance-window filter ─────────────────────────────────

/// Keep only slots bookable at `now`: a slot passes iff
/// `now + min_advance_minutes <= start <= now + max_advance_days`, both
/// bounds inclusive, days counted as calendar days in the fixed zone.
/// `now` is the caller's single read for the whole call — the window stays
/// stable across one response. Order-preserving.
pub fn advance_window(
    slots: Vec<TimeSlot>,
    rules: &BookingRules,
    now: DateTime<Tz>,
) -> Vec<TimeSlot> {
    let min_start = (now + time::minutes(rules.min_advance_minutes)).with_timezone(&Utc);
    let max_start = time::plus_calendar_days(now, rules.max_advance_days).with_timezone(&Utc);

    slots
        .into_iter()
        .filter(|slot| min_start <= slot.start_time && slot.start_time <= max_start)
        .collect()
}
