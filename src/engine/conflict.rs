use ulid::Ulid;

use crate::model::{Ms, Reservation, Span};

use super::{Engine, EngineError};

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start > span.end {
        return Err(EngineError::InvalidState("span start after end"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(())
}

impl Engine {
    /// Every live reservation on `item_id` from a group other than
    /// `excluded_group` whose window overlaps `span` (endpoints inclusive —
    /// see [`Span::overlaps`]). Pure read, no side effects.
    pub async fn find_conflicts(
        &self,
        item_id: Ulid,
        excluded_group: Ulid,
        span: Span,
    ) -> Result<Vec<Reservation>, EngineError> {
        let conflicts = self
            .store()
            .find_overlapping(item_id, excluded_group, span)
            .await?;
        metrics::counter!(crate::observability::CONFLICTS_FOUND_TOTAL)
            .increment(conflicts.len() as u64);
        Ok(conflicts)
    }
}
