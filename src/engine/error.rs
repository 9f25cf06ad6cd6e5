use ulid::Ulid;

use crate::model::ItemStatus;
use crate::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// The (item, group) pair already has a live reservation.
    DuplicateItem { item: Ulid, group: Ulid },
    /// A date change would collide with this confirmed reservation.
    ConfirmedConflict(Ulid),
    AlreadyConfirmed(Ulid),
    GroupCancelled(Ulid),
    /// Confirmation requires every member to be available or a granted
    /// tier-one hold; this one is neither.
    IneligibleItem { id: Ulid, status: ItemStatus },
    InvalidState(&'static str),
    LimitExceeded(&'static str),
    Store(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::DuplicateItem { item, group } => {
                write!(f, "item {item} is already reserved in group {group}")
            }
            EngineError::ConfirmedConflict(id) => {
                write!(f, "dates collide with confirmed reservation {id}")
            }
            EngineError::AlreadyConfirmed(id) => write!(f, "group {id} is already confirmed"),
            EngineError::GroupCancelled(id) => write!(f, "group {id} is cancelled"),
            EngineError::IneligibleItem { id, status } => {
                write!(f, "reservation {id} cannot be confirmed from status {status:?}")
            }
            EngineError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e.0)
    }
}

/// Per-item result collection for batch passes (request-hold, confirm sweep,
/// escalation). Prior writes in a pass are never rolled back; a failed item is
/// recorded here and the pass continues.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Reservations successfully written.
    pub updated: usize,
    /// Reservations whose write failed, with the store's error text.
    pub failures: Vec<(Ulid, String)>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(super) fn record(&mut self, id: Ulid, result: Result<(), StoreError>) {
        match result {
            Ok(()) => self.updated += 1,
            Err(e) => {
                tracing::warn!("batch write failed for reservation {id}: {e}");
                metrics::counter!(crate::observability::BATCH_ITEM_FAILURES_TOTAL).increment(1);
                self.failures.push((id, e.0));
            }
        }
    }
}
