//! Abstract persistence contract plus the in-memory reference implementation.
//!
//! The engine never talks to a database directly — it goes through
//! [`ReservationStore`]. A real deployment backs this with whatever storage it
//! likes; [`MemoryStore`] is what the test suite runs against and is good
//! enough for single-process embedding.

use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::{
    GroupPatch, Reservation, ReservationGroup, ReservationPatch, Span,
};

/// A persistence read or write failed. Not locally recoverable — retry policy
/// belongs to the storage backend, not the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/write access to reservation records, queryable by inventory item and
/// date range.
///
/// Implementations must honor two filters everywhere: soft-deleted
/// reservations are never returned, and `find_overlapping` uses the
/// boundary-inclusive overlap predicate of [`Span::overlaps`].
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Non-deleted reservations on `item_id`, belonging to a group other than
    /// `excluded_group`, whose span overlaps `span` (endpoints inclusive).
    async fn find_overlapping(
        &self,
        item_id: Ulid,
        excluded_group: Ulid,
        span: Span,
    ) -> StoreResult<Vec<Reservation>>;

    /// Non-deleted reservations owned by `group_id`.
    async fn find_by_group(&self, group_id: Ulid) -> StoreResult<Vec<Reservation>>;

    async fn find_reservation(&self, id: Ulid) -> StoreResult<Option<Reservation>>;

    async fn insert_reservation(&self, reservation: Reservation) -> StoreResult<()>;

    /// Partial-field update of a single reservation.
    async fn update_reservation(&self, id: Ulid, patch: ReservationPatch) -> StoreResult<()>;

    /// Apply the same patch to many reservations.
    async fn update_reservations(&self, ids: &[Ulid], patch: ReservationPatch) -> StoreResult<()>;

    async fn find_group(&self, id: Ulid) -> StoreResult<Option<ReservationGroup>>;

    async fn insert_group(&self, group: ReservationGroup) -> StoreResult<()>;

    async fn update_group(&self, id: Ulid, patch: GroupPatch) -> StoreResult<()>;
}

/// DashMap-backed store with a per-item index for overlap queries.
pub struct MemoryStore {
    reservations: DashMap<Ulid, Reservation>,
    groups: DashMap<Ulid, ReservationGroup>,
    /// item id → reservation ids ever created on that item.
    by_item: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            reservations: DashMap::new(),
            groups: DashMap::new(),
            by_item: DashMap::new(),
        }
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn find_overlapping(
        &self,
        item_id: Ulid,
        excluded_group: Ulid,
        span: Span,
    ) -> StoreResult<Vec<Reservation>> {
        let ids = self
            .by_item
            .get(&item_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let mut hits = Vec::new();
        for id in ids {
            if let Some(r) = self.reservations.get(&id)
                && !r.deleted
                && r.group_id != excluded_group
                && r.span.overlaps(&span)
            {
                hits.push(r.value().clone());
            }
        }
        Ok(hits)
    }

    async fn find_by_group(&self, group_id: Ulid) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|e| e.group_id == group_id && !e.deleted)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn find_reservation(&self, id: Ulid) -> StoreResult<Option<Reservation>> {
        Ok(self.reservations.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        if self.reservations.contains_key(&reservation.id) {
            return Err(StoreError(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        self.by_item
            .entry(reservation.item_id)
            .or_default()
            .push(reservation.id);
        self.reservations.insert(reservation.id, reservation);
        Ok(())
    }

    async fn update_reservation(&self, id: Ulid, patch: ReservationPatch) -> StoreResult<()> {
        match self.reservations.get_mut(&id) {
            Some(mut r) => {
                patch.apply(&mut r);
                Ok(())
            }
            None => Err(StoreError(format!("reservation {id} not found"))),
        }
    }

    async fn update_reservations(&self, ids: &[Ulid], patch: ReservationPatch) -> StoreResult<()> {
        for id in ids {
            match self.reservations.get_mut(id) {
                Some(mut r) => patch.apply(&mut r),
                None => return Err(StoreError(format!("reservation {id} not found"))),
            }
        }
        Ok(())
    }

    async fn find_group(&self, id: Ulid) -> StoreResult<Option<ReservationGroup>> {
        Ok(self.groups.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_group(&self, group: ReservationGroup) -> StoreResult<()> {
        if self.groups.contains_key(&group.id) {
            return Err(StoreError(format!("group {} already exists", group.id)));
        }
        self.groups.insert(group.id, group);
        Ok(())
    }

    async fn update_group(&self, id: Ulid, patch: GroupPatch) -> StoreResult<()> {
        match self.groups.get_mut(&id) {
            Some(mut g) => {
                patch.apply(&mut g);
                Ok(())
            }
            None => Err(StoreError(format!("group {id} not found"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupStatus, ItemStatus};

    fn reservation(group_id: Ulid, item_id: Ulid, start: i64, end: i64) -> Reservation {
        Reservation {
            id: Ulid::new(),
            group_id,
            item_id,
            span: Span::new(start, end),
            status: ItemStatus::Available,
            hold_requested: false,
            hold_requested_at: None,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn overlap_query_excludes_own_group() {
        let store = MemoryStore::new();
        let item = Ulid::new();
        let mine = Ulid::new();
        let theirs = Ulid::new();

        store
            .insert_reservation(reservation(mine, item, 100, 200))
            .await
            .unwrap();
        store
            .insert_reservation(reservation(theirs, item, 150, 250))
            .await
            .unwrap();

        let hits = store
            .find_overlapping(item, mine, Span::new(100, 200))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].group_id, theirs);
    }

    #[tokio::test]
    async fn overlap_query_excludes_deleted() {
        let store = MemoryStore::new();
        let item = Ulid::new();
        let other = Ulid::new();

        let mut r = reservation(other, item, 100, 200);
        r.deleted = true;
        store.insert_reservation(r).await.unwrap();

        let hits = store
            .find_overlapping(item, Ulid::new(), Span::new(100, 200))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn overlap_query_is_boundary_inclusive() {
        let store = MemoryStore::new();
        let item = Ulid::new();
        store
            .insert_reservation(reservation(Ulid::new(), item, 100, 200))
            .await
            .unwrap();

        // Touching at 200 counts; starting at 201 does not
        let touching = store
            .find_overlapping(item, Ulid::new(), Span::new(200, 300))
            .await
            .unwrap();
        assert_eq!(touching.len(), 1);

        let apart = store
            .find_overlapping(item, Ulid::new(), Span::new(201, 300))
            .await
            .unwrap();
        assert!(apart.is_empty());
    }

    #[tokio::test]
    async fn overlap_query_is_per_item() {
        let store = MemoryStore::new();
        let item_a = Ulid::new();
        let item_b = Ulid::new();
        store
            .insert_reservation(reservation(Ulid::new(), item_a, 100, 200))
            .await
            .unwrap();

        let hits = store
            .find_overlapping(item_b, Ulid::new(), Span::new(100, 200))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn group_membership_skips_deleted() {
        let store = MemoryStore::new();
        let group = Ulid::new();
        let live = reservation(group, Ulid::new(), 0, 100);
        let live_id = live.id;
        store.insert_reservation(live).await.unwrap();

        let dead = reservation(group, Ulid::new(), 0, 100);
        let dead_id = dead.id;
        store.insert_reservation(dead).await.unwrap();
        store
            .update_reservation(
                dead_id,
                ReservationPatch {
                    deleted: Some(true),
                    ..ReservationPatch::default()
                },
            )
            .await
            .unwrap();

        let members = store.find_by_group(group).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, live_id);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let r = reservation(Ulid::new(), Ulid::new(), 0, 100);
        store.insert_reservation(r.clone()).await.unwrap();
        assert!(store.insert_reservation(r).await.is_err());

        let g = ReservationGroup::new(Ulid::new(), Span::new(0, 100));
        store.insert_group(g.clone()).await.unwrap();
        assert!(store.insert_group(g).await.is_err());
    }

    #[tokio::test]
    async fn bulk_update_applies_to_all() {
        let store = MemoryStore::new();
        let group = Ulid::new();
        let a = reservation(group, Ulid::new(), 0, 100);
        let b = reservation(group, Ulid::new(), 0, 100);
        let ids = [a.id, b.id];
        store.insert_reservation(a).await.unwrap();
        store.insert_reservation(b).await.unwrap();

        store
            .update_reservations(&ids, ReservationPatch::status(ItemStatus::Confirmed))
            .await
            .unwrap();

        for id in ids {
            let r = store.find_reservation(id).await.unwrap().unwrap();
            assert_eq!(r.status, ItemStatus::Confirmed);
        }
    }

    #[tokio::test]
    async fn group_patch_updates_status() {
        let store = MemoryStore::new();
        let g = ReservationGroup::new(Ulid::new(), Span::new(0, 100));
        let id = g.id;
        store.insert_group(g).await.unwrap();

        store
            .update_group(id, GroupPatch::status(GroupStatus::Hold))
            .await
            .unwrap();
        let g = store.find_group(id).await.unwrap().unwrap();
        assert_eq!(g.status, GroupStatus::Hold);
    }
}
