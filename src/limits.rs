//! Hard bounds on inputs. Everything here is checked at operation entry so a
//! bad caller cannot wedge the engine with absurd windows or giant groups.

use crate::model::Ms;

/// Nothing before the epoch.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// 2100-01-01T00:00:00Z.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// Two years. No rental window is wider than this.
pub const MAX_SPAN_DURATION_MS: Ms = 2 * 365 * 24 * 3_600_000;

/// Items per reservation group.
pub const MAX_ITEMS_PER_GROUP: usize = 500;
