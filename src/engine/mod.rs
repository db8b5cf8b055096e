mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use error::EngineError;
pub use mutations::CreateBooking;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::model::{Booking, BookingOption};
use crate::store::{BookingFilter, RecordStore};
use crate::time::{Clock, SystemClock};

/// The availability & booking scheduling engine. Stateless between calls:
/// options and bookings live in the injected record store and are re-read
/// by every operation, so no view outlives a single call.
pub struct Engine {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    /// One lazily-created lock per option id. Creates (and cancels) on the
    /// same option serialize; different options proceed fully in parallel.
    /// Queries never take these.
    option_locks: DashMap<Ulid, Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            option_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// The exclusive critical section scoped to one option id.
    fn option_lock(&self, option_id: Ulid) -> Arc<Mutex<()>> {
        self.option_locks
            .entry(option_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load_option(&self, id: &Ulid) -> Result<BookingOption, EngineError> {
        self.store.get_option(id)?.ok_or(EngineError::NotFound)
    }

    /// Freshly-read pending/confirmed bookings for one option. Cancelled
    /// bookings are dropped here and never reach the conflict scan.
    fn occupying_bookings(&self, option_id: Ulid) -> Result<Vec<Booking>, EngineError> {
        let bookings = self
            .store
            .list_bookings(&BookingFilter::for_option(option_id))?;
        Ok(bookings.into_iter().filter(Booking::occupies).collect())
    }
}
