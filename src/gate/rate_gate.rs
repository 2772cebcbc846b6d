//! Rate Gate Module
//!
//! Global, non-blocking admission control for upstream calls: at most one
//! grant per cooldown window, decided inside a single critical section.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

use serde::Serialize;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

// == Admission ==
/// Outcome of [`RateGate::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller may perform one upstream fetch now.
    Granted,
    /// The caller must not call upstream.
    Denied(DenyReason),
}

/// Why a permission check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The cooldown since the last grant has not elapsed.
    Cooldown,
    /// Another check was executing its critical section.
    InFlight,
}

impl Admission {
    /// Returns true if the caller may call upstream.
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }
}

// == Gate Stats ==
/// Snapshot of gate activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GateStats {
    /// Number of permissions granted
    pub granted: u64,
    /// Denials because the cooldown had not elapsed
    pub denied_cooldown: u64,
    /// Denials because another check was in flight
    pub denied_in_flight: u64,
    /// Time of the most recent grant (Unix milliseconds)
    pub last_grant_at: Option<u64>,
}

/// Sentinel for "never granted" in the lock-free mirror
const NEVER: u64 = u64::MAX;

#[derive(Debug, Default)]
struct GateState {
    last_request_at: Option<u64>,
}

// == Rate Gate ==
/// Admission controller shared by every upstream fetch path.
///
/// The state mutex doubles as the reentrancy flag: it is only ever taken with
/// `try_lock`, so a caller that finds it held is denied instead of waiting.
pub struct RateGate {
    state: Mutex<GateState>,
    cooldown_ms: u64,
    clock: Arc<dyn Clock>,
    /// Copy of the last grant time, readable without touching the lock
    last_grant: AtomicU64,
    granted: AtomicU64,
    denied_cooldown: AtomicU64,
    denied_in_flight: AtomicU64,
}

impl RateGate {
    // == Constructor ==
    /// Creates a gate that has never granted.
    ///
    /// # Arguments
    /// * `cooldown_ms` - Minimum spacing between grants in milliseconds
    /// * `clock` - Time source for grant decisions
    pub fn new(cooldown_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            cooldown_ms,
            clock,
            last_grant: AtomicU64::new(NEVER),
            granted: AtomicU64::new(0),
            denied_cooldown: AtomicU64::new(0),
            denied_in_flight: AtomicU64::new(0),
        }
    }

    /// Creates a gate on the system clock.
    pub fn with_cooldown_ms(cooldown_ms: u64) -> Self {
        Self::new(cooldown_ms, Arc::new(SystemClock))
    }

    // == Try Acquire ==
    /// Asks whether the next upstream fetch may happen now.
    ///
    /// Never blocks. A grant moves the window forward to the current time
    /// before the lock is released, so two callers can never both be granted
    /// for the same window.
    pub fn try_acquire(&self) -> Admission {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.denied_in_flight.fetch_add(1, Ordering::Relaxed);
                debug!("rate gate denied: check already in flight");
                return Admission::Denied(DenyReason::InFlight);
            }
        };

        let now = self.clock.now_ms();
        if let Some(last) = state.last_request_at {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.cooldown_ms {
                self.denied_cooldown.fetch_add(1, Ordering::Relaxed);
                debug!(
                    elapsed_ms = elapsed,
                    cooldown_ms = self.cooldown_ms,
                    "rate gate denied: cooldown not elapsed"
                );
                return Admission::Denied(DenyReason::Cooldown);
            }
        }

        state.last_request_at = Some(now);
        self.last_grant.store(now, Ordering::Release);
        self.granted.fetch_add(1, Ordering::Relaxed);
        debug!(at_ms = now, "rate gate granted");
        Admission::Granted
    }

    /// Time of the most recent grant, if any.
    ///
    /// Lock-free; never contends with `try_acquire`.
    pub fn last_grant_at(&self) -> Option<u64> {
        match self.last_grant.load(Ordering::Acquire) {
            NEVER => None,
            at => Some(at),
        }
    }

    /// Minimum spacing between grants in milliseconds.
    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    // == Stats ==
    /// Returns a snapshot of gate counters.
    pub fn stats(&self) -> GateStats {
        GateStats {
            granted: self.granted.load(Ordering::Relaxed),
            denied_cooldown: self.denied_cooldown.load(Ordering::Relaxed),
            denied_in_flight: self.denied_in_flight.load(Ordering::Relaxed),
            last_grant_at: self.last_grant_at(),
        }
    }
}

// == Debug ==
impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("cooldown_ms", &self.cooldown_ms)
            .field("last_grant_at", &self.last_grant_at())
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gate::DEFAULT_COOLDOWN_MS;
    use proptest::prelude::*;
    use std::sync::Barrier;
    use std::thread;

    fn gate_at(clock: &ManualClock) -> RateGate {
        RateGate::new(DEFAULT_COOLDOWN_MS, Arc::new(clock.clone()))
    }

    #[test]
    fn test_first_call_is_granted() {
        let clock = ManualClock::new(0);
        let gate = gate_at(&clock);

        assert_eq!(gate.last_grant_at(), None);
        assert_eq!(gate.try_acquire(), Admission::Granted);
        assert_eq!(gate.last_grant_at(), Some(0));
    }

    #[test]
    fn test_single_grant_per_window() {
        let clock = ManualClock::new(0);
        let gate = gate_at(&clock);

        assert!(gate.try_acquire().is_granted());
        assert_eq!(gate.try_acquire(), Admission::Denied(DenyReason::Cooldown));

        clock.set(DEFAULT_COOLDOWN_MS - 1);
        assert_eq!(gate.try_acquire(), Admission::Denied(DenyReason::Cooldown));

        clock.set(DEFAULT_COOLDOWN_MS);
        assert_eq!(gate.try_acquire(), Admission::Granted);
        assert_eq!(gate.last_grant_at(), Some(DEFAULT_COOLDOWN_MS));
    }

    #[test]
    fn test_denial_does_not_shift_window() {
        let clock = ManualClock::new(0);
        let gate = gate_at(&clock);

        gate.try_acquire();
        clock.set(59_000);
        gate.try_acquire();

        // Window still measured from the grant at t=0
        clock.set(60_000);
        assert!(gate.try_acquire().is_granted());
    }

    #[test]
    fn test_clock_behind_last_grant_is_denied() {
        let clock = ManualClock::new(100_000);
        let gate = gate_at(&clock);

        gate.try_acquire();
        clock.set(50_000);
        assert_eq!(gate.try_acquire(), Admission::Denied(DenyReason::Cooldown));
    }

    #[test]
    fn test_system_clock_gate() {
        let gate = RateGate::with_cooldown_ms(DEFAULT_COOLDOWN_MS);

        assert_eq!(gate.cooldown_ms(), 60_000);
        assert!(gate.try_acquire().is_granted());
        assert!(!gate.try_acquire().is_granted());
        assert!(gate.last_grant_at().is_some());
    }

    #[test]
    fn test_zero_cooldown_always_grants() {
        let clock = ManualClock::new(0);
        let gate = RateGate::new(0, Arc::new(clock));

        assert!(gate.try_acquire().is_granted());
        assert!(gate.try_acquire().is_granted());
    }

    #[test]
    fn test_in_flight_check_is_denied() {
        let clock = ManualClock::new(0);
        let gate = gate_at(&clock);

        let _held = gate.state.lock().unwrap();
        assert_eq!(gate.try_acquire(), Admission::Denied(DenyReason::InFlight));
        // Observers do not need the held lock
        assert_eq!(gate.stats().denied_in_flight, 1);
        assert_eq!(gate.last_grant_at(), None);
    }

    #[test]
    fn test_stats() {
        let clock = ManualClock::new(0);
        let gate = gate_at(&clock);

        gate.try_acquire();
        gate.try_acquire();
        gate.try_acquire();

        let stats = gate.stats();
        assert_eq!(stats.granted, 1);
        assert_eq!(stats.denied_cooldown, 2);
        assert_eq!(stats.denied_in_flight, 0);
        assert_eq!(stats.last_grant_at, Some(0));
    }

    #[test]
    fn test_concurrent_callers_get_one_grant() {
        const CALLERS: usize = 16;

        let clock = ManualClock::new(0);
        let gate = Arc::new(gate_at(&clock));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    gate.try_acquire()
                })
            })
            .collect();

        let outcomes: Vec<Admission> = handles
            .into_iter()
            .map(|h| h.join().expect("caller thread panicked"))
            .collect();

        let granted = outcomes.iter().filter(|a| a.is_granted()).count();
        assert_eq!(granted, 1, "exactly one caller may be granted");
        assert_eq!(outcomes.len() - granted, CALLERS - 1);

        let stats = gate.stats();
        assert_eq!(stats.granted, 1);
        assert_eq!(
            stats.denied_cooldown + stats.denied_in_flight,
            (CALLERS - 1) as u64
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // Within a window only the first call is granted; from the window's
        // end onward the next call is granted again.
        #[test]
        fn prop_single_grant_per_window(
            cooldown in 1u64..10_000_000,
            start in 0u64..1_000_000_000,
            offsets in prop::collection::vec(0u64..10_000_000, 1..20)
        ) {
            let clock = ManualClock::new(start);
            let gate = RateGate::new(cooldown, Arc::new(clock.clone()));
            prop_assert!(gate.try_acquire().is_granted());

            for offset in offsets {
                let within = offset % cooldown;
                clock.set(start + within);
                prop_assert_eq!(gate.try_acquire(), Admission::Denied(DenyReason::Cooldown));
            }

            clock.set(start + cooldown);
            prop_assert!(gate.try_acquire().is_granted());
        }
    }
}
