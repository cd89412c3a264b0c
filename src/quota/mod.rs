//! Quota Enforcement
//!
//! Per-key admission control: daily reset arithmetic, trailing-minute and
//! per-day limit checks, and the bookkeeping writes that make an admitted
//! request count.

pub mod enforcer;

pub use enforcer::QuotaEnforcer;
