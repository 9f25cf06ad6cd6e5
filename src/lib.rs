//! holdline — tiered hold and reservation conflict engine for discrete
//! rental inventory.
//!
//! The core problem: many reservation groups ("orders") want the same
//! inventory item over overlapping pickup/return windows. The engine decides,
//! per item, whether a reservation is available, provisionally held at one of
//! three priority tiers, permanently blocked by a confirmed reservation, or
//! unavailable because all tiers are taken — and keeps those decisions
//! consistent as reservations are added, held, confirmed, re-dated, and
//! removed.
//!
//! Persistence is abstract: everything goes through
//! [`store::ReservationStore`]. [`store::MemoryStore`] is included for tests
//! and single-process embedding.

pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod store;
