/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use tracing::warn;

use super::Clock;

/// Wall-clock time source backed by [`Instant`].
///
/// Reports milliseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1_000.0
    }
}

/// Settable clock for deterministic tests and simulations.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(start_ms)),
        }
    }

    /// Moves time forward by `ms`.  Negative steps are ignored so the clock
    /// stays monotonic.
    pub fn advance(&self, ms: f64) {
        if ms < 0.0 {
            warn!(ms, "ManualClock::advance ignored negative step");
            return;
        }
        self.now_ms.set(self.now_ms.get() + ms);
    }

    /// Jumps to `ms` if it is not earlier than the current time.
    pub fn set(&self, ms: f64) {
        if ms < self.now_ms.get() {
            warn!(ms, now_ms = self.now_ms.get(), "ManualClock::set ignored backwards jump");
            return;
        }
        self.now_ms.set(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now_ms.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_and_shares_time() {
        let a = ManualClock::new(10.0);
        let b = a.clone();
        a.advance(5.5);
        assert_eq!(b.now(), 15.5);
        b.set(100.0);
        assert_eq!(a.now(), 100.0);
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let c = ManualClock::new(50.0);
        c.advance(-10.0);
        assert_eq!(c.now(), 50.0);
        c.set(20.0);
        assert_eq!(c.now(), 50.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let c = SystemClock::new();
        let t0 = c.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let t1 = c.now();
        assert!(t0 >= 0.0);
        assert!(t1 >= t0 + 2.0, "t0={t0} t1={t1}");
    }
}
