//! The conflict-detection and status-resolution engine.
//!
//! Layout mirrors the moving parts: `conflict` finds overlapping
//! reservations, `resolve` turns a conflict set into a status, `escalation`
//! re-ranks conflicts after a removal, `mutations` hosts the group-level
//! orchestration, `queries` the pure reads.

mod conflict;
mod error;
mod escalation;
mod mutations;
mod queries;
mod resolve;

pub use error::{BatchOutcome, EngineError};
pub use queries::ProposedItemStatus;
pub use resolve::{resolve_coarse, resolve_full};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::model::{Reservation, ReservationGroup};
use crate::store::ReservationStore;

pub struct Engine {
    store: Arc<dyn ReservationStore>,
    /// Per-inventory-item critical sections. A guard is held across
    /// conflict-read + status-write so concurrent operations on the same item
    /// serialize instead of racing each other to `Confirmed`.
    item_locks: DashMap<Ulid, Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            store,
            item_locks: DashMap::new(),
        }
    }

    pub(super) fn store(&self) -> &dyn ReservationStore {
        self.store.as_ref()
    }

    /// Acquire the exclusive-access token for one inventory item.
    pub(super) async fn lock_item(&self, item_id: Ulid) -> OwnedMutexGuard<()> {
        let lock = self
            .item_locks
            .entry(item_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Acquire tokens for several items. Ids are sorted and deduped first so
    /// two concurrent multi-item operations can never deadlock on each other.
    pub(super) async fn lock_items(&self, item_ids: &[Ulid]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<Ulid> = item_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock_item(id).await);
        }
        guards
    }

    pub(super) async fn group_or_not_found(
        &self,
        group_id: Ulid,
    ) -> Result<ReservationGroup, EngineError> {
        self.store
            .find_group(group_id)
            .await?
            .ok_or(EngineError::NotFound(group_id))
    }

    /// Non-deleted reservations belonging to a group.
    pub(super) async fn live_members(
        &self,
        group_id: Ulid,
    ) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.store.find_by_group(group_id).await?)
    }
}
