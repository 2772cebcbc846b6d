//! Gate Module
//!
//! Process-wide admission control in front of the upstream API.

mod rate_gate;

pub use rate_gate::{Admission, DenyReason, GateStats, RateGate};

// == Public Constants ==
/// Default minimum spacing between upstream calls: one minute
pub const DEFAULT_COOLDOWN_MS: u64 = 60_000;
