/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deterministic host for tests and offline simulation.
//!
//! Time only moves when the caller says so:
//!
//! ```text
//! advance(ms) ──► clock += ms, due timers fire in deadline order
//! tick()      ──► frame callbacks booked so far run at clock.now()
//! run_for(d, step) = repeat { advance(step); tick() } for ⌊d / step⌋ refreshes
//! run_until(t, origin, step) = tick at every origin + k·step ≤ t, then advance to t
//! ```

use std::cell::{Cell, RefCell};

use tracing::{debug, trace, warn};

use super::{
    Clock, FrameCallback, FrameHandle, FrameHost, FrameQueue, ManualClock, TimerCallback,
    TimerHandle, TimerHost,
};

/// Absorbs float error when dividing a run into whole refresh steps.
const STEP_EPSILON: f64 = 1e-9;

struct PendingTimer {
    handle: TimerHandle,
    due_ms: f64,
    callback: TimerCallback,
}

/// Simulated display + timer host driven by a [`ManualClock`].
///
/// Counts frame requests and cancellations so tests can assert on how a
/// scheduler used the host.
pub struct SimulatedHost {
    clock: ManualClock,
    frames: FrameQueue,
    timers: RefCell<Vec<PendingTimer>>,
    next_timer: Cell<u64>,
    frame_requests: Cell<usize>,
    frame_cancels: Cell<usize>,
    ticks: Cell<u64>,
}

impl SimulatedHost {
    /// Creates a host whose clock starts at `0.0` ms.
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(start_ms: f64) -> Self {
        Self {
            clock: ManualClock::new(start_ms),
            frames: FrameQueue::new(),
            timers: RefCell::new(Vec::new()),
            next_timer: Cell::new(0),
            frame_requests: Cell::new(0),
            frame_cancels: Cell::new(0),
            ticks: Cell::new(0),
        }
    }

    /// Shared handle to the host clock.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Moves time forward by `ms`, firing every timer that falls due on the
    /// way.  Each timer runs with the clock set to its own deadline.
    pub fn advance(&self, ms: f64) {
        let target = self.clock.now() + ms.max(0.0);

        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let idx = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due_ms <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.due_ms
                            .total_cmp(&b.due_ms)
                            .then(a.handle.cmp(&b.handle))
                    })
                    .map(|(idx, _)| idx);
                idx.map(|idx| timers.remove(idx))
            };
            let Some(timer) = next else {
                break;
            };
            self.clock.set(timer.due_ms);
            trace!(handle = timer.handle.id(), due_ms = timer.due_ms, "firing timer");
            (timer.callback)();
        }

        self.clock.set(target);
    }

    /// Runs one display refresh at the current time.  Returns how many frame
    /// callbacks ran.
    pub fn tick(&self) -> usize {
        self.ticks.set(self.ticks.get() + 1);
        self.frames.dispatch(self.clock.now())
    }

    /// Simulates `duration_ms` of refreshes spaced `step_ms` apart.  Returns
    /// the number of refreshes performed.
    pub fn run_for(&self, duration_ms: f64, step_ms: f64) -> u64 {
        if !(step_ms.is_finite() && step_ms > 0.0) {
            warn!(step_ms, "run_for ignored: refresh step must be positive");
            return 0;
        }
        let steps = (duration_ms / step_ms + STEP_EPSILON).floor().max(0.0) as u64;
        debug!(duration_ms, step_ms, steps, "simulating refreshes");
        for _ in 0..steps {
            self.advance(step_ms);
            self.tick();
        }
        steps
    }

    /// Moves the clock to `until_ms`, refreshing on the fixed grid
    /// `origin_ms + k * step_ms` (k ≥ 1).  Grid points already behind the
    /// clock are skipped, so repeated calls with the same origin see one
    /// unbroken refresh cadence.  Returns the refreshes performed.
    pub fn run_until(&self, until_ms: f64, origin_ms: f64, step_ms: f64) -> u64 {
        if !(step_ms.is_finite() && step_ms > 0.0) {
            warn!(step_ms, "run_until ignored: refresh step must be positive");
            return 0;
        }

        let mut k = ((self.clock.now() - origin_ms) / step_ms + STEP_EPSILON)
            .floor()
            .max(0.0) as u64
            + 1;
        let mut refreshes = 0;
        loop {
            let at = origin_ms + k as f64 * step_ms;
            if at > until_ms + STEP_EPSILON {
                break;
            }
            self.advance(at - self.clock.now());
            self.tick();
            refreshes += 1;
            k += 1;
        }
        self.advance(until_ms - self.clock.now());
        trace!(until_ms, refreshes, "ran to grid point");
        refreshes
    }

    /// [`run_for`](Self::run_for) with the step derived from a refresh rate.
    pub fn run_at_hz(&self, duration_ms: f64, refresh_hz: f64) -> u64 {
        self.run_for(duration_ms, 1_000.0 / refresh_hz)
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Total `request_frame` calls received.
    pub fn frame_requests(&self) -> usize {
        self.frame_requests.get()
    }

    /// Total `cancel_frame` calls received.
    pub fn frame_cancels(&self) -> usize {
        self.frame_cancels.get()
    }

    /// Total refreshes performed.
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimulatedHost {
    fn now(&self) -> f64 {
        self.clock.now()
    }
}

impl FrameHost for SimulatedHost {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.frame_requests.set(self.frame_requests.get() + 1);
        self.frames.request_frame(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.frame_cancels.set(self.frame_cancels.get() + 1);
        self.frames.cancel_frame(handle);
    }
}

impl TimerHost for SimulatedHost {
    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::new(self.next_timer.get());
        self.next_timer.set(handle.id() + 1);
        self.timers.borrow_mut().push(PendingTimer {
            handle,
            due_ms: self.clock.now() + delay_ms.max(0.0),
            callback,
        });
        handle
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.timers.borrow_mut().retain(|t| t.handle != handle);
    }
}

impl std::fmt::Debug for SimulatedHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedHost")
            .field("now_ms", &self.clock.now())
            .field("pending_frames", &self.pending_frames())
            .field("pending_timers", &self.pending_timers())
            .field("ticks", &self.ticks())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn run_for_counts_whole_steps() {
        let host = SimulatedHost::new();
        assert_eq!(host.run_for(2_000.0, 16.0), 125);
        assert_eq!(host.now(), 2_000.0);
        assert_eq!(host.ticks(), 125);
    }

    #[test]
    fn run_at_hz_absorbs_float_error() {
        let host = SimulatedHost::new();
        assert_eq!(host.run_at_hz(1_000.0, 144.0), 144);
        assert_eq!(host.run_at_hz(1_000.0, 240.0), 240);
    }

    #[test]
    fn run_for_rejects_non_positive_step() {
        let host = SimulatedHost::new();
        assert_eq!(host.run_for(1_000.0, 0.0), 0);
        assert_eq!(host.run_for(1_000.0, -5.0), 0);
        assert_eq!(host.now(), 0.0);
    }

    #[test]
    fn run_until_keeps_one_grid_across_stops() {
        let step = 1_000.0 / 60.0;

        let straight = SimulatedHost::new();
        assert_eq!(straight.run_until(1_000.0, 0.0, step), 60);

        let split = SimulatedHost::new();
        let mut total = 0;
        for until in [110.0, 120.0, 500.0, 1_000.0] {
            total += split.run_until(until, 0.0, step);
            assert!((split.now() - until).abs() < 1e-6);
        }
        assert_eq!(total, 60);
        assert_eq!(split.ticks(), straight.ticks());
    }

    #[test]
    fn run_until_refreshes_on_grid_timestamps() {
        let host = SimulatedHost::new();
        host.run_until(25.0, 0.0, 10.0);

        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        host.request_frame(Box::new(move |ts| s.set(ts)));
        assert_eq!(host.run_until(40.0, 0.0, 10.0), 2);
        assert_eq!(seen.get(), 30.0);
        assert_eq!(host.now(), 40.0);
    }

    #[test]
    fn frame_receives_tick_timestamp() {
        let host = SimulatedHost::starting_at(100.0);
        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        host.request_frame(Box::new(move |ts| s.set(ts)));
        host.advance(16.0);
        host.tick();
        assert_eq!(seen.get(), 116.0);
        assert_eq!(host.frame_requests(), 1);
    }

    #[test]
    fn cancel_is_counted_and_removes_frame() {
        let host = SimulatedHost::new();
        let h = host.request_frame(Box::new(|_| {}));
        host.cancel_frame(h);
        assert_eq!(host.frame_cancels(), 1);
        assert_eq!(host.pending_frames(), 0);
    }

    #[test]
    fn timers_fire_in_deadline_order_at_their_deadline() {
        let host = Rc::new(SimulatedHost::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("late", 30.0), ("early", 10.0), ("mid", 20.0)] {
            let (log, h) = (log.clone(), host.clone());
            host.set_timeout(delay, Box::new(move || log.borrow_mut().push((label, h.now()))));
        }

        host.advance(25.0);
        assert_eq!(*log.borrow(), vec![("early", 10.0), ("mid", 20.0)]);
        assert_eq!(host.now(), 25.0);
        assert_eq!(host.pending_timers(), 1);

        host.advance(5.0);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let host = SimulatedHost::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = host.set_timeout(5.0, Box::new(move || h.set(h.get() + 1)));
        host.clear_timeout(handle);
        host.advance(100.0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn timer_booked_inside_timer_fires_in_same_advance_when_due() {
        let host = Rc::new(SimulatedHost::new());
        let hits = Rc::new(Cell::new(0));

        let (h, inner_host) = (hits.clone(), host.clone());
        host.set_timeout(
            10.0,
            Box::new(move || {
                h.set(h.get() + 1);
                let h2 = h.clone();
                inner_host.set_timeout(10.0, Box::new(move || h2.set(h2.get() + 1)));
            }),
        );

        host.advance(50.0);
        assert_eq!(hits.get(), 2);
    }
}
