use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Closed interval `[start, end]` — pickup and return instants, both inclusive.
///
/// Two spans that merely touch at an endpoint DO overlap: an item returned at
/// instant T cannot also be picked up at T by someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start <= end, "Span start must not be after end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t <= self.end
    }

    /// Boundary-inclusive overlap: `other` overlaps `self` if either endpoint
    /// of `other` falls inside `self`, or `other` fully encloses `self`.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.contains_instant(other.start)
            || self.contains_instant(other.end)
            || (other.start <= self.start && other.end >= self.end)
    }
}

/// Hold priority tier. `One` is the highest priority — the front of the queue
/// for an item once the current blocker goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    One,
    Two,
    Three,
}

impl Tier {
    /// One step toward `One`. `One` has nowhere to go.
    pub fn promote(self) -> Option<Tier> {
        match self {
            Tier::One => None,
            Tier::Two => Some(Tier::One),
            Tier::Three => Some(Tier::Two),
        }
    }

    /// One step away from `One`. `Three` is the last rung of the ladder.
    pub fn demote(self) -> Option<Tier> {
        match self {
            Tier::One => Some(Tier::Two),
            Tier::Two => Some(Tier::Three),
            Tier::Three => None,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
        }
    }
}

/// Status of a single reservation (one item bound to one group's window).
///
/// `Hold` covers both sub-states of a tier: `granted: false` is a pending
/// hold request, `granted: true` is an approved hold. The blocking instant of
/// `UnavailableUntil` lives inside the variant, so "blocking instant present
/// iff confirmed-blocked" holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Available,
    Hold { tier: Tier, granted: bool },
    /// All three hold tiers are taken for this window.
    Unavailable,
    /// Blocked by another group's confirmed reservation until `until`.
    UnavailableUntil { until: Ms },
    Confirmed,
    Cancelled,
    // Physical-condition states. The conflict engine never produces these;
    // they come from check-in/check-out flows outside this crate.
    Clean,
    Loss,
    Damage,
    Out,
    In,
}

impl ItemStatus {
    /// Tier and granted flag, if this status occupies a slot on the ladder.
    pub fn hold_tier(&self) -> Option<(Tier, bool)> {
        match self {
            ItemStatus::Hold { tier, granted } => Some((*tier, *granted)),
            _ => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, ItemStatus::Hold { .. })
    }

    /// This status with its tier promoted one step, preserving the granted
    /// flag. `None` when not a hold or already at tier one.
    pub fn promoted(&self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Hold { tier, granted } => tier
                .promote()
                .map(|tier| ItemStatus::Hold { tier, granted: *granted }),
            _ => None,
        }
    }

    /// Statuses the escalation pass knows how to handle. Anything else found
    /// on a conflicting reservation is stale and gets reset to `Available`.
    pub fn recognized_by_ladder(&self) -> bool {
        matches!(
            self,
            ItemStatus::Available
                | ItemStatus::Hold { .. }
                | ItemStatus::Confirmed
                | ItemStatus::Unavailable
                | ItemStatus::UnavailableUntil { .. }
        )
    }
}

/// Lifecycle status of a reservation group ("order").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    Working,
    Hold,
    Confirmed,
    Cancelled,
}

/// One inventory item bound to one group's pickup/return window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub group_id: Ulid,
    pub item_id: Ulid,
    /// Normally a copy of the owning group's span; diverges only mid
    /// date-change.
    pub span: Span,
    pub status: ItemStatus,
    pub hold_requested: bool,
    pub hold_requested_at: Option<Ms>,
    /// Soft-deleted reservations are invisible to conflict queries and
    /// membership counts. Never hard-deleted.
    pub deleted: bool,
}

/// A customer's set of reservations sharing one pickup/return window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationGroup {
    pub id: Ulid,
    pub span: Span,
    pub status: GroupStatus,
    pub hold_requested: bool,
}

impl ReservationGroup {
    pub fn new(id: Ulid, span: Span) -> Self {
        Self {
            id,
            span,
            status: GroupStatus::Working,
            hold_requested: false,
        }
    }
}

// ── Partial-field updates ────────────────────────────────────────

/// Fields to overwrite on a reservation. `None` leaves a field untouched;
/// `hold_requested_at` is doubly optional so it can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub span: Option<Span>,
    pub status: Option<ItemStatus>,
    pub hold_requested: Option<bool>,
    pub hold_requested_at: Option<Option<Ms>>,
    pub deleted: Option<bool>,
}

impl ReservationPatch {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, r: &mut Reservation) {
        if let Some(span) = self.span {
            r.span = span;
        }
        if let Some(status) = self.status {
            r.status = status;
        }
        if let Some(hold_requested) = self.hold_requested {
            r.hold_requested = hold_requested;
        }
        if let Some(hold_requested_at) = self.hold_requested_at {
            r.hold_requested_at = hold_requested_at;
        }
        if let Some(deleted) = self.deleted {
            r.deleted = deleted;
        }
    }
}

/// Fields to overwrite on a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub span: Option<Span>,
    pub status: Option<GroupStatus>,
    pub hold_requested: Option<bool>,
}

impl GroupPatch {
    pub fn status(status: GroupStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, g: &mut ReservationGroup) {
        if let Some(span) = self.span {
            g.span = span;
        }
        if let Some(status) = self.status {
            g.status = status;
        }
        if let Some(hold_requested) = self.hold_requested {
            g.hold_requested = hold_requested;
        }
    }
}
