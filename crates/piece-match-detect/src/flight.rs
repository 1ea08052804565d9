//! Single-flight admission for frame processing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Admits at most one frame at a time. Cloning shares the same flag.
#[derive(Clone, Debug, Default)]
pub struct FlightGuard {
    in_flight: Arc<AtomicBool>,
}

impl FlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a flight unless one is already running. Never blocks.
    pub fn try_begin(&self) -> Option<FlightToken> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightToken {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Proof of a running flight; dropping it ends the flight.
#[derive(Debug)]
pub struct FlightToken {
    in_flight: Arc<AtomicBool>,
}

impl Drop for FlightToken {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
