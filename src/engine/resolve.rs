//! Status resolution: turn a conflict set into the status a candidate
//! reservation should carry.
//!
//! Two variants exist on purpose. `resolve_full` assigns exact tiers and is
//! used by active operations (request-hold, date changes). `resolve_coarse`
//! is the cheap creation-time check: it only distinguishes "fine",
//! "confirmed-blocked", and "ladder full". They agree whenever there are no
//! conflicts or a confirmed conflict exists.

use crate::model::{ItemStatus, Ms, Reservation, Tier};

/// Latest return instant among confirmed conflicts, if any.
///
/// Latest wins: releasing at the earliest return would offer the item while a
/// later confirmed reservation still covers it.
fn confirmed_blocker(conflicts: &[Reservation]) -> Option<Ms> {
    conflicts
        .iter()
        .filter(|c| c.status == ItemStatus::Confirmed)
        .map(|c| c.span.end)
        .max()
}

fn hold_tiers(conflicts: &[Reservation]) -> Vec<Tier> {
    conflicts
        .iter()
        .filter_map(|c| c.status.hold_tier().map(|(tier, _)| tier))
        .collect()
}

/// Full tier-assignment resolution.
///
/// Confirmed conflict ⇒ blocked until its return. Otherwise the candidate
/// takes the next free rung of the ladder; three occupied rungs ⇒
/// unavailable. The ladder assumes occupied tiers are contiguous from one
/// upward — a gap means some earlier pass misbehaved, so we log it and fall
/// back to a tier-one request rather than guessing.
pub fn resolve_full(conflicts: &[Reservation]) -> ItemStatus {
    if let Some(until) = confirmed_blocker(conflicts) {
        return ItemStatus::UnavailableUntil { until };
    }

    let tiers = hold_tiers(conflicts);
    let request = |tier| ItemStatus::Hold {
        tier,
        granted: false,
    };

    match tiers.len() {
        n if n >= 3 => ItemStatus::Unavailable,
        0 => request(Tier::One),
        1 if tiers[0] == Tier::One => request(Tier::Two),
        2 if tiers.iter().all(|t| *t != Tier::Three) => request(Tier::Three),
        _ => {
            tracing::warn!(
                "non-contiguous tier ladder {:?}, defaulting to tier-one request",
                tiers
            );
            metrics::counter!(crate::observability::RESOLVER_ANOMALIES_TOTAL).increment(1);
            request(Tier::One)
        }
    }
}

/// Creation-time resolution: collapse the tier distinctions.
///
/// Only a confirmed conflict or a fully occupied ladder (all three tiers
/// simultaneously present) makes the item anything other than available.
pub fn resolve_coarse(conflicts: &[Reservation]) -> ItemStatus {
    if let Some(until) = confirmed_blocker(conflicts) {
        return ItemStatus::UnavailableUntil { until };
    }

    let tiers = hold_tiers(conflicts);
    let all_present = [Tier::One, Tier::Two, Tier::Three]
        .iter()
        .all(|t| tiers.contains(t));
    if all_present {
        ItemStatus::Unavailable
    } else {
        ItemStatus::Available
    }
}
