use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use ulid::Ulid;

use crate::model::{Booking, BookingOption, BookingState, Record};
use crate::wal::Journal;

/// Store-layer failures are the only unexpected failure class in the
/// engine: I/O or corruption, never a business outcome.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store I/O error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Predicate for booking listings. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub option_id: Option<Ulid>,
    pub location_id: Option<Ulid>,
    pub mode: Option<String>,
    pub state: Option<BookingState>,
    pub starts_on_or_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
}

impl BookingFilter {
    pub fn for_option(option_id: Ulid) -> Self {
        Self {
            option_id: Some(option_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(id) = self.option_id
            && booking.option_id != id {
                return false;
            }
        if let Some(id) = self.location_id
            && booking.location_id != id {
                return false;
            }
        if let Some(ref mode) = self.mode
            && booking.mode != *mode {
                return false;
            }
        if let Some(state) = self.state
            && booking.state != state {
                return false;
            }
        if let Some(t) = self.starts_on_or_after
            && booking.start_time < t {
                return false;
            }
        if let Some(t) = self.starts_before
            && booking.start_time >= t {
                return false;
            }
        true
    }
}

/// Keyed storage for options and bookings — the engine's only dependency.
/// The engine never caches results across calls; every operation reads
/// current state through this trait.
pub trait RecordStore: Send + Sync {
    fn get_option(&self, id: &Ulid) -> Result<Option<BookingOption>, StoreError>;
    /// Insert or overwrite by id. Used by the external CRUD layer.
    fn put_option(&self, option: BookingOption) -> Result<(), StoreError>;
    fn delete_option(&self, id: &Ulid) -> Result<Option<BookingOption>, StoreError>;
    fn list_options(&self) -> Result<Vec<BookingOption>, StoreError>;
    fn get_booking(&self, id: &Ulid) -> Result<Option<Booking>, StoreError>;
    /// Insert or overwrite by id.
    fn put_booking(&self, booking: Booking) -> Result<(), StoreError>;
    fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;
}

// ── In-memory store ──────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    options: DashMap<Ulid, BookingOption>,
    bookings: DashMap<Ulid, Booking>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get_option(&self, id: &Ulid) -> Result<Option<BookingOption>, StoreError> {
        Ok(self.options.get(id).map(|e| e.value().clone()))
    }

    fn put_option(&self, option: BookingOption) -> Result<(), StoreError> {
        self.options.insert(option.id, option);
        Ok(())
    }

    fn delete_option(&self, id: &Ulid) -> Result<Option<BookingOption>, StoreError> {
        Ok(self.options.remove(id).map(|(_, v)| v))
    }

    fn list_options(&self) -> Result<Vec<BookingOption>, StoreError> {
        Ok(self.options.iter().map(|e| e.value().clone()).collect())
    }

    fn get_booking(&self, id: &Ulid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(id).map(|e| e.value().clone()))
    }

    fn put_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect())
    }
}

// ── Journal-backed store ─────────────────────────────────

/// MemoryStore semantics plus an append-only journal: every mutation is
/// durable on disk before the in-memory maps change, and `open` rebuilds
/// the maps by replay (last write wins per id).
pub struct JournalStore {
    options: DashMap<Ulid, BookingOption>,
    bookings: DashMap<Ulid, Booking>,
    journal: Mutex<Journal>,
}

impl JournalStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let records = Journal::replay(path)?;
        let replayed = records.len();
        let journal = Journal::open(path)?;

        let store = Self {
            options: DashMap::new(),
            bookings: DashMap::new(),
            journal: Mutex::new(journal),
        };
        for record in records {
            match record {
                Record::OptionPut(option) => {
                    store.options.insert(option.id, option);
                }
                Record::OptionDeleted(id) => {
                    store.options.remove(&id);
                }
                Record::BookingPut(booking) => {
                    store.bookings.insert(booking.id, booking);
                }
            }
        }
        debug!(
            replayed,
            options = store.options.len(),
            bookings = store.bookings.len(),
            "journal store opened"
        );
        Ok(store)
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        // A poisoned lock only means a panic mid-append; the journal itself
        // stays consistent (torn entries are dropped on replay).
        self.journal.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, record: &Record) -> Result<(), StoreError> {
        let started = std::time::Instant::now();
        self.journal().append(record)?;
        metrics::histogram!(crate::observability::JOURNAL_APPEND_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(())
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.journal().appends_since_compact()
    }

    /// Rewrite the journal with one live record per entity.
    pub fn compact(&self) -> Result<(), StoreError> {
        let mut guard = self.journal();
        let mut records: Vec<Record> = self
            .options
            .iter()
            .map(|e| Record::OptionPut(e.value().clone()))
            .collect();
        records.extend(self.bookings.iter().map(|e| Record::BookingPut(e.value().clone())));
        guard.compact(&records)?;
        Ok(())
    }
}

impl RecordStore for JournalStore {
    fn get_option(&self, id: &Ulid) -> Result<Option<BookingOption>, StoreError> {
        Ok(self.options.get(id).map(|e| e.value().clone()))
    }

    fn put_option(&self, option: BookingOption) -> Result<(), StoreError> {
        self.append(&Record::OptionPut(option.clone()))?;
        self.options.insert(option.id, option);
        Ok(())
    }

    fn delete_option(&self, id: &Ulid) -> Result<Option<BookingOption>, StoreError> {
        self.append(&Record::OptionDeleted(*id))?;
        Ok(self.options.remove(id).map(|(_, v)| v))
    }

    fn list_options(&self) -> Result<Vec<BookingOption>, StoreError> {
        Ok(self.options.iter().map(|e| e.value().clone()).collect())
    }

    fn get_booking(&self, id: &Ulid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(id).map(|e| e.value().clone()))
    }

    fn put_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.append(&Record::BookingPut(booking.clone()))?;
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::model::*;

    fn option_with_mode(mode: &str) -> BookingOption {
        let now = Utc::now();
        BookingOption {
            id: Ulid::new(),
            location_id: Ulid::new(),
            mode: mode.into(),
            label: "Test".into(),
            description: String::new(),
            duration_minutes: 60,
            capacity: Capacity { max_people: 4 },
            rules: BookingRules {
                slot_increment_minutes: 60,
                min_advance_minutes: 0,
                max_advance_days: 30,
                cancellation_cutoff_minutes: 0,
                buffer_before_minutes: 0,
                buffer_after_minutes: 0,
            },
            weekly_hours: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn booking_for(option: &BookingOption, start: DateTime<Utc>, state: BookingState) -> Booking {
        let now = Utc::now();
        Booking {
            id: Ulid::new(),
            option_id: option.id,
            location_id: option.location_id,
            mode: option.mode.clone(),
            start_time: start,
            end_time: start + option.duration(),
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

    #[test]
    fn memory_store_option_crud() {
        let store = MemoryStore::new();
        let option = option_with_mode("rum");
        let id = option.id;

        store.put_option(option.clone()).unwrap();
        assert_eq!(store.get_option(&id).unwrap(), Some(option));
        assert_eq!(store.list_options().unwrap().len(), 1);

        let removed = store.delete_option(&id).unwrap();
        assert!(removed.is_some());
        assert_eq!(store.get_option(&id).unwrap(), None);
    }

    #[test]
    fn booking_overwrite_by_id() {
        let store = MemoryStore::new();
        let option = option_with_mode("rum");
        let mut booking = booking_for(&option, Utc::now(), BookingState::Confirmed);
        store.put_booking(booking.clone()).unwrap();

        booking.state = BookingState::Cancelled;
        store.put_booking(booking.clone()).unwrap();

        let fetched = store.get_booking(&booking.id).unwrap().unwrap();
        assert_eq!(fetched.state, BookingState::Cancelled);
        assert_eq!(store.list_bookings(&BookingFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn filter_by_option_state_and_range() {
        let store = MemoryStore::new();
        let opt_a = option_with_mode("rum");
        let opt_b = option_with_mode("handledning");

        let t0 = Utc::now();
        store
            .put_booking(booking_for(&opt_a, t0, BookingState::Confirmed))
            .unwrap();
        store
            .put_booking(booking_for(&opt_a, t0 + Duration::hours(2), BookingState::Cancelled))
            .unwrap();
        store
            .put_booking(booking_for(&opt_b, t0, BookingState::Confirmed))
            .unwrap();

        let for_a = store.list_bookings(&BookingFilter::for_option(opt_a.id)).unwrap();
        assert_eq!(for_a.len(), 2);

        let confirmed_a = store
            .list_bookings(&BookingFilter {
                option_id: Some(opt_a.id),
                state: Some(BookingState::Confirmed),
                ..BookingFilter::default()
            })
            .unwrap();
        assert_eq!(confirmed_a.len(), 1);

        let by_mode = store
            .list_bookings(&BookingFilter {
                mode: Some("handledning".into()),
                ..BookingFilter::default()
            })
            .unwrap();
        assert_eq!(by_mode.len(), 1);
        assert_eq!(by_mode[0].option_id, opt_b.id);

        let later = store
            .list_bookings(&BookingFilter {
                starts_on_or_after: Some(t0 + Duration::hours(1)),
                ..BookingFilter::default()
            })
            .unwrap();
        assert_eq!(later.len(), 1);

        let earlier = store
            .list_bookings(&BookingFilter {
                starts_before: Some(t0 + Duration::hours(1)),
                ..BookingFilter::default()
            })
            .unwrap();
        assert_eq!(earlier.len(), 2);
    }

    fn tmp_journal(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("tidbok_test_store");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn journal_store_survives_reopen() {
        let path = tmp_journal("reopen.journal");
        let option = option_with_mode("rum");
        let booking = booking_for(&option, Utc::now(), BookingState::Confirmed);

        {
            let store = JournalStore::open(&path).unwrap();
            store.put_option(option.clone()).unwrap();
            store.put_booking(booking.clone()).unwrap();
        }

        let reopened = JournalStore::open(&path).unwrap();
        assert_eq!(reopened.get_option(&option.id).unwrap(), Some(option));
        assert_eq!(reopened.get_booking(&booking.id).unwrap(), Some(booking));
    }

    #[test]
    fn journal_store_replays_last_write() {
        let path = tmp_journal("last_write.journal");
        let option = option_with_mode("rum");
        let mut booking = booking_for(&option, Utc::now(), BookingState::Confirmed);

        {
            let store = JournalStore::open(&path).unwrap();
            store.put_booking(booking.clone()).unwrap();
            booking.state = BookingState::Cancelled;
            store.put_booking(booking.clone()).unwrap();
        }

        let reopened = JournalStore::open(&path).unwrap();
        let fetched = reopened.get_booking(&booking.id).unwrap().unwrap();
        assert_eq!(fetched.state, BookingState::Cancelled);
    }

    #[test]
    fn journal_store_delete_survives_reopen() {
        let path = tmp_journal("delete.journal");
        let option = option_with_mode("rum");

        {
            let store = JournalStore::open(&path).unwrap();
            store.put_option(option.clone()).unwrap();
            store.delete_option(&option.id).unwrap();
        }

        let reopened = JournalStore::open(&path).unwrap();
        assert_eq!(reopened.get_option(&option.id).unwrap(), None);
    }

    #[test]
    fn journal_store_compaction_keeps_state() {
        let path = tmp_journal("compact.journal");
        let option = option_with_mode("rum");
        let booking = booking_for(&option, Utc::now(), BookingState::Confirmed);

        let store = JournalStore::open(&path).unwrap();
        store.put_option(option.clone()).unwrap();
        for _ in 0..5 {
            store.put_booking(booking.clone()).unwrap();
        }
        assert_eq!(store.appends_since_compact(), 6);

        store.compact().unwrap();
        assert_eq!(store.appends_since_compact(), 0);

        drop(store);
        let reopened = JournalStore::open(&path).unwrap();
        assert_eq!(reopened.get_option(&option.id).unwrap(), Some(option));
        assert_eq!(reopened.get_booking(&booking.id).unwrap(), Some(booking));
    }
}
