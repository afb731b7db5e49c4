//! Monotonic timing for the per-message latency breakdown
//! (`tIngress`/`tEnqueued`/`tBroadcastBegin`/`tWsWriteEnd`/`tBroadcastEnd`).
//!
//! These are deliberately distinct from the wall-clock `sentAt` carried in
//! the envelope: wall clocks can jump (NTP step, leap second), which would
//! make a latency breakdown computed from them meaningless. `Instant` never
//! jumps backwards, so elapsed-time math on it is always valid.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Milliseconds elapsed since this clock was created.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now_ms();
        assert!(b > a);
    }

    #[test]
    fn starts_near_zero() {
        let clock = MonotonicClock::new();
        assert!(clock.now_ms() < 50.0);
    }
}
