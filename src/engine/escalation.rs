//! Ripple effects of removing a reservation: tier promotion when a tier-one
//! hold disappears, and release of confirmed-blocked reservations when a
//! confirmed reservation disappears.

use tracing::debug;

use crate::model::{ItemStatus, Reservation, ReservationPatch, Tier};

use super::error::BatchOutcome;
use super::{Engine, EngineError};

impl Engine {
    /// Recompute conflicting reservations after `removed` was soft-deleted.
    ///
    /// Dispatch is on the PRE-deletion status: blocked statuses occupy no
    /// tier slot, so nothing moves; a tier-one hold frees the top rung and
    /// promotes everyone below it; a confirmed reservation may release the
    /// reservations it was blocking. Removing a tier-two/three hold leaves
    /// the rungs above it untouched.
    ///
    /// Mutations persist one by one; a failed write is recorded in the
    /// outcome and the pass continues.
    pub async fn escalate_after_removal(
        &self,
        removed: &Reservation,
    ) -> Result<BatchOutcome, EngineError> {
        let outcome = match removed.status {
            ItemStatus::Unavailable | ItemStatus::UnavailableUntil { .. } => BatchOutcome::default(),
            ItemStatus::Hold {
                tier: Tier::One, ..
            } => self.promote_hold_conflicts(removed).await?,
            ItemStatus::Confirmed => self.release_confirmed_blocks(removed).await?,
            _ => BatchOutcome::default(),
        };
        metrics::counter!(crate::observability::ESCALATION_MUTATIONS_TOTAL)
            .increment(outcome.updated as u64);
        Ok(outcome)
    }

    /// The top rung is free: move every tier-two/three conflict up one step,
    /// keeping its request-vs-granted sub-state. Tier-one peers and the
    /// recognized non-tier statuses stay put. Anything the ladder does not
    /// recognize is stale and resets to available.
    async fn promote_hold_conflicts(
        &self,
        removed: &Reservation,
    ) -> Result<BatchOutcome, EngineError> {
        let conflicts = self
            .find_conflicts(removed.item_id, removed.group_id, removed.span)
            .await?;

        let mut outcome = BatchOutcome::default();
        for c in &conflicts {
            let new_status = if let Some(promoted) = c.status.promoted() {
                Some(promoted)
            } else if !c.status.recognized_by_ladder() {
                debug!(
                    "resetting stale status {:?} on reservation {} to available",
                    c.status, c.id
                );
                Some(ItemStatus::Available)
            } else {
                None
            };

            if let Some(status) = new_status {
                let result = self
                    .store()
                    .update_reservation(c.id, ReservationPatch::status(status))
                    .await;
                outcome.record(c.id, result);
            }
        }
        Ok(outcome)
    }

    /// A confirmed reservation is gone. Each conflict it was blocking gets a
    /// second look: if no OTHER confirmed reservation on the item still
    /// overlaps that conflict's own group window, it goes back to available;
    /// otherwise it stays blocked.
    async fn release_confirmed_blocks(
        &self,
        removed: &Reservation,
    ) -> Result<BatchOutcome, EngineError> {
        let conflicts = self
            .find_conflicts(removed.item_id, removed.group_id, removed.span)
            .await?;

        let mut outcome = BatchOutcome::default();
        for c in &conflicts {
            if !matches!(
                c.status,
                ItemStatus::Unavailable | ItemStatus::UnavailableUntil { .. }
            ) {
                continue;
            }

            // The conflict's own window is its group's, not necessarily the
            // removed reservation's.
            let Some(group) = self.store().find_group(c.group_id).await? else {
                tracing::warn!(
                    "reservation {} references missing group {}, skipping release check",
                    c.id,
                    c.group_id
                );
                continue;
            };

            let still_blocked = self
                .store()
                .find_overlapping(removed.item_id, removed.group_id, group.span)
                .await?
                .iter()
                .any(|other| {
                    other.group_id != c.group_id && other.status == ItemStatus::Confirmed
                });

            if still_blocked {
                debug!(
                    "reservation {} stays blocked: another confirmed reservation overlaps",
                    c.id
                );
                continue;
            }

            let result = self
                .store()
                .update_reservation(c.id, ReservationPatch::status(ItemStatus::Available))
                .await;
            outcome.record(c.id, result);
        }
        Ok(outcome)
    }
}
