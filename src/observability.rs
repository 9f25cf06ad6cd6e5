//! Metric names recorded through the `metrics` facade. The crate installs no
//! exporter — embedders pick their own recorder.

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: group operations executed. Labels: op.
pub const OPERATIONS_TOTAL: &str = "holdline_operations_total";

/// Histogram: group operation latency in seconds. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "holdline_operation_duration_seconds";

// ── Domain counters ─────────────────────────────────────────────

/// Counter: conflicts returned by the conflict finder.
pub const CONFLICTS_FOUND_TOTAL: &str = "holdline_conflicts_found_total";

/// Counter: reservations mutated by escalation passes.
pub const ESCALATION_MUTATIONS_TOTAL: &str = "holdline_escalation_mutations_total";

/// Counter: resolver saw a non-contiguous tier configuration and fell back
/// to a tier-one request.
pub const RESOLVER_ANOMALIES_TOTAL: &str = "holdline_resolver_anomalies_total";

/// Counter: per-item persistence failures inside batch passes.
pub const BATCH_ITEM_FAILURES_TOTAL: &str = "holdline_batch_item_failures_total";
