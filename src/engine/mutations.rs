use tracing::info;
use ulid::Ulid;

use crate::limits::MAX_ITEMS_PER_GROUP;
use crate::model::{
    GroupPatch, GroupStatus, ItemStatus, Reservation, ReservationGroup, ReservationPatch, Span,
    Tier,
};
use crate::observability::{OPERATION_DURATION_SECONDS, OPERATIONS_TOTAL};

use super::conflict::{now_ms, validate_span};
use super::error::BatchOutcome;
use super::resolve::{resolve_coarse, resolve_full};
use super::{Engine, EngineError};

impl Engine {
    /// Register a new reservation group ("order"). Groups are never deleted,
    /// only cancelled when their last item is removed.
    pub async fn create_group(&self, id: Ulid, span: Span) -> Result<(), EngineError> {
        validate_span(&span)?;
        if self.store().find_group(id).await?.is_some() {
            return Err(EngineError::AlreadyExists(id));
        }
        self.store()
            .insert_group(ReservationGroup::new(id, span))
            .await?;
        metrics::counter!(OPERATIONS_TOTAL, "op" => "create_group").increment(1);
        Ok(())
    }

    /// Add an inventory item to a group.
    ///
    /// The initial status comes from the coarse resolver — a passive "can I
    /// add this?" answer, not a hold. Adding an item invalidates any prior
    /// hold snapshot, so the group's hold-request flag is cleared.
    pub async fn add_item(
        &self,
        group_id: Ulid,
        item_id: Ulid,
    ) -> Result<Reservation, EngineError> {
        let _guard = self.lock_item(item_id).await;
        // Group window read under the item lock, so the span we persist
        // matches the window the status was resolved against.
        let group = self.group_or_not_found(group_id).await?;

        let members = self.live_members(group_id).await?;
        if members.len() >= MAX_ITEMS_PER_GROUP {
            return Err(EngineError::LimitExceeded("too many items in group"));
        }
        if members.iter().any(|m| m.item_id == item_id) {
            return Err(EngineError::DuplicateItem {
                item: item_id,
                group: group_id,
            });
        }

        let conflicts = self.find_conflicts(item_id, group_id, group.span).await?;
        let status = resolve_coarse(&conflicts);

        let reservation = Reservation {
            id: Ulid::new(),
            group_id,
            item_id,
            span: group.span,
            status,
            hold_requested: false,
            hold_requested_at: None,
            deleted: false,
        };
        self.store().insert_reservation(reservation.clone()).await?;
        self.store()
            .update_group(
                group_id,
                GroupPatch {
                    hold_requested: Some(false),
                    ..GroupPatch::default()
                },
            )
            .await?;

        metrics::counter!(OPERATIONS_TOTAL, "op" => "add_item").increment(1);
        Ok(reservation)
    }

    /// Request holds on every item in the group.
    ///
    /// Each member gets a fresh full resolution against the group's current
    /// window, a hold-request flag, and a timestamp. Per-item write failures
    /// land in the outcome; prior writes stay.
    pub async fn request_hold(&self, group_id: Ulid) -> Result<BatchOutcome, EngineError> {
        let started = std::time::Instant::now();
        let group = self.group_or_not_found(group_id).await?;
        let members = self.live_members(group_id).await?;
        let item_ids: Vec<Ulid> = members.iter().map(|m| m.item_id).collect();
        let _guards = self.lock_items(&item_ids).await;

        let now = now_ms();
        let mut outcome = BatchOutcome::default();
        for m in &members {
            // A read failure aborts the whole operation; writes already made
            // in this pass stay (at-least-once batch semantics).
            let conflicts = self.find_conflicts(m.item_id, group_id, group.span).await?;
            let status = resolve_full(&conflicts);
            let result = self
                .store()
                .update_reservation(
                    m.id,
                    ReservationPatch {
                        status: Some(status),
                        hold_requested: Some(true),
                        hold_requested_at: Some(Some(now)),
                        ..ReservationPatch::default()
                    },
                )
                .await;
            outcome.record(m.id, result);
        }

        self.store()
            .update_group(
                group_id,
                GroupPatch {
                    status: Some(GroupStatus::Hold),
                    hold_requested: Some(true),
                    ..GroupPatch::default()
                },
            )
            .await?;

        info!(
            "hold requested for group {group_id}: {} items updated, {} failed",
            outcome.updated,
            outcome.failures.len()
        );
        metrics::counter!(OPERATIONS_TOTAL, "op" => "request_hold").increment(1);
        metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => "request_hold")
            .record(started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Approve the pending hold requests in a group: every
    /// `hold-request-N` member becomes a granted `hold-N` at the same tier.
    pub async fn grant_hold(&self, group_id: Ulid) -> Result<BatchOutcome, EngineError> {
        let group = self.group_or_not_found(group_id).await?;
        if !group.hold_requested {
            return Err(EngineError::InvalidState("no hold requested on group"));
        }

        let members = self.live_members(group_id).await?;
        let item_ids: Vec<Ulid> = members.iter().map(|m| m.item_id).collect();
        let _guards = self.lock_items(&item_ids).await;

        // An escalation pass may have re-ranked a member while we waited on
        // the locks; grant the tier it holds now, not the one first read.
        let members = self.live_members(group_id).await?;

        let mut outcome = BatchOutcome::default();
        for m in &members {
            if let Some((tier, false)) = m.status.hold_tier() {
                let result = self
                    .store()
                    .update_reservation(
                        m.id,
                        ReservationPatch::status(ItemStatus::Hold {
                            tier,
                            granted: true,
                        }),
                    )
                    .await;
                outcome.record(m.id, result);
            }
        }

        metrics::counter!(OPERATIONS_TOTAL, "op" => "grant_hold").increment(1);
        Ok(outcome)
    }

    /// Confirm a group: every member must be available or a granted tier-one
    /// hold. On success the group and all members become confirmed, and every
    /// conflicting reservation that had requested a hold is pushed to
    /// unavailable-until this group's return instant.
    pub async fn confirm_group(&self, group_id: Ulid) -> Result<BatchOutcome, EngineError> {
        let started = std::time::Instant::now();
        let group = self.group_or_not_found(group_id).await?;
        match group.status {
            GroupStatus::Cancelled => return Err(EngineError::GroupCancelled(group_id)),
            GroupStatus::Confirmed => return Err(EngineError::AlreadyConfirmed(group_id)),
            GroupStatus::Working | GroupStatus::Hold => {}
        }

        let members = self.live_members(group_id).await?;
        let item_ids: Vec<Ulid> = members.iter().map(|m| m.item_id).collect();
        let _guards = self.lock_items(&item_ids).await;

        // Statuses can move while we wait on the locks (another group's
        // confirm may have swept a member); the gate runs on a fresh read.
        let members = self.live_members(group_id).await?;
        for m in &members {
            let eligible = matches!(
                m.status,
                ItemStatus::Available
                    | ItemStatus::Hold {
                        tier: Tier::One,
                        granted: true,
                    }
            );
            if !eligible {
                return Err(EngineError::IneligibleItem {
                    id: m.id,
                    status: m.status,
                });
            }
        }

        self.store()
            .update_group(group_id, GroupPatch::status(GroupStatus::Confirmed))
            .await?;
        let member_ids: Vec<Ulid> = members.iter().map(|m| m.id).collect();
        self.store()
            .update_reservations(&member_ids, ReservationPatch::status(ItemStatus::Confirmed))
            .await?;

        // Sweep: anyone who had requested a hold on these items is now
        // blocked until we return the gear.
        let mut outcome = BatchOutcome::default();
        for m in &members {
            let conflicts = self.find_conflicts(m.item_id, group_id, group.span).await?;
            for c in &conflicts {
                let already_out_of_play = matches!(
                    c.status,
                    ItemStatus::Cancelled
                        | ItemStatus::Available
                        | ItemStatus::In
                        | ItemStatus::Unavailable
                        | ItemStatus::UnavailableUntil { .. }
                );
                if !c.hold_requested || already_out_of_play {
                    continue;
                }
                let result = self
                    .store()
                    .update_reservation(
                        c.id,
                        ReservationPatch::status(ItemStatus::UnavailableUntil {
                            until: group.span.end,
                        }),
                    )
                    .await;
                outcome.record(c.id, result);
            }
        }

        info!(
            "group {group_id} confirmed: {} members, {} conflicts blocked",
            members.len(),
            outcome.updated
        );
        metrics::counter!(OPERATIONS_TOTAL, "op" => "confirm_group").increment(1);
        metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => "confirm_group")
            .record(started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Commit a date change previously previewed with
    /// [`Engine::preview_date_change`].
    ///
    /// The proposal is recomputed under the item locks (the preview ran
    /// without them), so a conflicting confirmed reservation that appeared in
    /// between still rejects the whole update.
    pub async fn commit_date_change(
        &self,
        group_id: Ulid,
        new_span: Span,
    ) -> Result<BatchOutcome, EngineError> {
        validate_span(&new_span)?;
        let group = self.group_or_not_found(group_id).await?;
        if group.status == GroupStatus::Confirmed {
            return Err(EngineError::InvalidState("cannot re-date a confirmed group"));
        }
        if group.span == new_span {
            return Ok(BatchOutcome::default());
        }

        let members = self.live_members(group_id).await?;
        let item_ids: Vec<Ulid> = members.iter().map(|m| m.item_id).collect();
        let _guards = self.lock_items(&item_ids).await;

        let changes = self.compute_date_change(&members, group_id, new_span).await?;

        let mut outcome = BatchOutcome::default();
        for change in &changes {
            let result = self
                .store()
                .update_reservation(
                    change.reservation_id,
                    ReservationPatch {
                        span: Some(new_span),
                        status: Some(change.proposed),
                        ..ReservationPatch::default()
                    },
                )
                .await;
            outcome.record(change.reservation_id, result);
        }

        self.store()
            .update_group(
                group_id,
                GroupPatch {
                    span: Some(new_span),
                    ..GroupPatch::default()
                },
            )
            .await?;

        info!(
            "group {group_id} re-dated to [{}, {}]: {} items updated",
            new_span.start, new_span.end, outcome.updated
        );
        metrics::counter!(OPERATIONS_TOTAL, "op" => "commit_date_change").increment(1);
        Ok(outcome)
    }

    /// Soft-delete one item's reservation and let the escalation pass re-rank
    /// whoever it was competing with. Cancels the group when nothing is left.
    pub async fn delete_item(
        &self,
        group_id: Ulid,
        item_id: Ulid,
    ) -> Result<BatchOutcome, EngineError> {
        self.group_or_not_found(group_id).await?;
        let _guard = self.lock_item(item_id).await;

        let members = self.live_members(group_id).await?;
        let Some(target) = members.iter().find(|m| m.item_id == item_id) else {
            return Err(EngineError::NotFound(item_id));
        };

        self.store()
            .update_reservation(
                target.id,
                ReservationPatch {
                    deleted: Some(true),
                    ..ReservationPatch::default()
                },
            )
            .await?;

        let outcome = self.escalate_after_removal(target).await?;

        let remaining = self.live_members(group_id).await?;
        if remaining.is_empty() {
            self.store()
                .update_group(group_id, GroupPatch::status(GroupStatus::Cancelled))
                .await?;
            info!("group {group_id} cancelled: last item removed");
        }

        metrics::counter!(OPERATIONS_TOTAL, "op" => "delete_item").increment(1);
        Ok(outcome)
    }
}
