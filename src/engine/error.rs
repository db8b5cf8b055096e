use crate::store::StoreError;

/// Every business outcome the engine can reject with. All variants except
/// `Store` are expected, recoverable results for the caller to map to its
/// own status codes; `Store` is the fatal class (I/O, corruption) and
/// aborts the operation with nothing persisted.
#[derive(Debug)]
pub enum EngineError {
    /// Referenced option or booking does not exist.
    NotFound,
    /// The option is deactivated and not bookable.
    Unavailable,
    /// Requested party size exceeds the option's capacity.
    CapacityExceeded { max_people: u32 },
    /// Requested start does not align with any generated slot.
    InvalidSlot,
    /// Aligned slot that conflicts with a booking or falls outside the
    /// advance window.
    SlotUnavailable,
    AlreadyCancelled,
    /// Cancellation attempted after the option's cutoff.
    CutoffPassed { cutoff_minutes: u32 },
    /// Option configuration cannot produce slots (e.g. zero increment).
    InvalidConfiguration(&'static str),
    Store(StoreError),
}

impl EngineError {
    /// Stable machine-readable code, one per variant. The HTTP layer maps
    /// these to status codes.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound => "not_found",
            EngineError::Unavailable => "unavailable",
            EngineError::CapacityExceeded { .. } => "capacity_exceeded",
            EngineError::InvalidSlot => "invalid_slot",
            EngineError::SlotUnavailable => "slot_unavailable",
            EngineError::AlreadyCancelled => "already_cancelled",
            EngineError::CutoffPassed { .. } => "cutoff_passed",
            EngineError::InvalidConfiguration(_) => "invalid_configuration",
            EngineError::Store(_) => "store_error",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound => write!(f, "not found"),
            EngineError::Unavailable => write!(f, "booking option is not currently available"),
            EngineError::CapacityExceeded { max_people } => {
                write!(f, "maximum {max_people} people allowed")
            }
            EngineError::InvalidSlot => write!(f, "requested time is not a valid slot"),
            EngineError::SlotUnavailable => write!(f, "requested time is not available"),
            EngineError::AlreadyCancelled => write!(f, "booking is already cancelled"),
            EngineError::CutoffPassed { cutoff_minutes } => {
                write!(f, "cannot cancel within {cutoff_minutes} minutes of booking start")
            }
            EngineError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {msg}")
            }
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
