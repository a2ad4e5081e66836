use chrono::NaiveDate;
use ulid::Ulid;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("already exists: {0}")]
    AlreadyExists(Ulid),
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("venue {venue_id} is already booked on {date} by event {event_id}")]
    Conflict {
        venue_id: Ulid,
        date: NaiveDate,
        event_id: Ulid,
    },
    #[error("table {table_id} seats {capacity}: {seated} seated, {requested} more requested")]
    Capacity {
        table_id: Ulid,
        capacity: u32,
        seated: u32,
        requested: u32,
    },
    #[error("budget of event {event_id} is {limit}, providers would total {total}")]
    Budget { event_id: Ulid, limit: u64, total: u64 },
    #[error("company {requested:?} is outside tenant {tenant:?}")]
    Scope { tenant: String, requested: String },
    #[error("still referenced: {0}")]
    InUse(Ulid),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("WAL error: {0}")]
    WalError(String),
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            reason: reason.into(),
        }
    }
}
