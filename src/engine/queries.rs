use ulid::Ulid;

use crate::model::{GroupStatus, ItemStatus, Reservation, Span};

use super::conflict::validate_span;
use super::resolve::resolve_full;
use super::{Engine, EngineError};

/// One line of a date-change preview: what a member's status would become
/// under the proposed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedItemStatus {
    pub reservation_id: Ulid,
    pub item_id: Ulid,
    pub current: ItemStatus,
    pub proposed: ItemStatus,
}

impl Engine {
    /// Dry-run a group date change: the per-item status diff the new window
    /// would produce. Mutates nothing.
    ///
    /// Rejects the whole proposal if any member would collide with a
    /// confirmed reservation — a date change never partially applies.
    pub async fn preview_date_change(
        &self,
        group_id: Ulid,
        new_span: Span,
    ) -> Result<Vec<ProposedItemStatus>, EngineError> {
        validate_span(&new_span)?;
        let group = self.group_or_not_found(group_id).await?;
        if group.status == GroupStatus::Confirmed {
            return Err(EngineError::InvalidState("cannot re-date a confirmed group"));
        }

        let members = self.live_members(group_id).await?;
        self.compute_date_change(&members, group_id, new_span).await
    }

    /// Shared by preview (lock-free dry run) and commit (re-run under item
    /// locks).
    pub(super) async fn compute_date_change(
        &self,
        members: &[Reservation],
        group_id: Ulid,
        new_span: Span,
    ) -> Result<Vec<ProposedItemStatus>, EngineError> {
        let mut changes = Vec::with_capacity(members.len());
        for m in members {
            let conflicts = self.find_conflicts(m.item_id, group_id, new_span).await?;
            if let Some(confirmed) = conflicts.iter().find(|c| c.status == ItemStatus::Confirmed) {
                return Err(EngineError::ConfirmedConflict(confirmed.id));
            }
            changes.push(ProposedItemStatus {
                reservation_id: m.id,
                item_id: m.item_id,
                current: m.status,
                proposed: resolve_full(&conflicts),
            });
        }
        Ok(changes)
    }

    /// Live reservations in a group.
    pub async fn group_items(&self, group_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        self.group_or_not_found(group_id).await?;
        self.live_members(group_id).await
    }

    pub async fn get_group(
        &self,
        group_id: Ulid,
    ) -> Result<crate::model::ReservationGroup, EngineError> {
        self.group_or_not_found(group_id).await
    }
}
