//! tidbok — a scheduling engine for bookable time slots.
//!
//! Booking options define recurring weekly availability windows; the engine
//! derives candidate slots on demand, filters them by advance-window rules,
//! annotates conflicts against buffered existing bookings, and commits
//! reservations under per-option serialization so the no-overlap invariant
//! holds under concurrent requests. Persistence is an injected
//! [`store::RecordStore`]; the HTTP and auth layers are callers, not part
//! of this crate.

pub mod engine;
pub mod model;
pub mod observability;
pub mod store;
pub mod time;
pub mod wal;
