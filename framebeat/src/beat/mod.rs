/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Frame-paced callback scheduler.
//!
//! [`Beat`] invokes a callback at a target rate (frames per second) that is
//! independent of how often the host refreshes.  Every host refresh runs one
//! scheduling pass:
//!
//! ```text
//!            ┌──────────── not running ──────────► return (chain halts)
//! refresh ──►│
//!            └─ now -= paused time
//!               delta = now - accepted marker
//!               delta >= interval ?  ── yes ──► marker snaps forward by whole
//!                     │                          intervals, callback(Frame),
//!                     no                         frame_count += 1
//!                     ▼
//!               continuation alive ? ── yes ──► book next refresh
//! ```
//!
//! Keeping the remainder when the marker snaps forward means the callback
//! fires at most `fps` times per second on any refresh rate without drifting
//! over long runs.
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Host coupling | [`Clock`] and [`FrameHost`] injected at construction |
//! | Self-reference across refreshes | `Weak` continuation stored in the state, dropped by `stop()` |
//! | Re-entrancy | No borrow is held while the user callback runs |
//! | Invalid fps | Rejected with [`BeatError::InvalidFps`] |
//! | Rate change | Explicit [`Beat::set_fps`], re-anchors the accepted marker |
//! | Outstanding registrations | At most one per beat; `pause()`+`resume()` before a refresh does not fork a second chain |
//!
//! # Example
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use framebeat::beat::Beat;
//! use framebeat::frame::BeatControl;
//! use framebeat::host::SimulatedHost;
//!
//! let host = Rc::new(SimulatedHost::new());
//! let frames = Rc::new(Cell::new(0u32));
//! let counter = frames.clone();
//!
//! let beat = Beat::on_host(
//!     move |_frame| {
//!         counter.set(counter.get() + 1);
//!         BeatControl::Continue
//!     },
//!     30.0,
//!     host.clone(),
//! )
//! .unwrap();
//!
//! beat.start().unwrap();
//! host.run_at_hz(1_000.0, 120.0);
//! assert!(frames.get() <= 30);
//! beat.stop();
//! ```

pub mod error;

pub use error::BeatError;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::frame::{BeatControl, Frame};
use crate::host::{Clock, FrameHandle, FrameHost};
use crate::math::{accepted_marker, fps_from_interval, interval_for_fps};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Frame rate used by [`Beat::with_default_fps`].
pub const DEFAULT_FPS: f64 = 60.0;

type FrameFn = Box<dyn FnMut(&Frame) -> BeatControl>;

// ── Internal state ────────────────────────────────────────────────────────────

/// Timing bookkeeping for one beat.  All times are virtual ms (paused
/// intervals subtracted) except `previous_pause_time`, which is host time.
struct BeatState {
    callback: Option<FrameFn>,
    fps: f64,
    interval_ms: f64,

    running: bool,
    stopped: bool,

    start_time: f64,
    previous_frame_time: f64,
    previous_accepted_time: f64,
    paused_accumulated_ms: f64,
    previous_pause_time: Option<f64>,

    /// Timestamps of the two most recent accepted frames, newest last.
    last_accepted: Option<f64>,
    prior_accepted: Option<f64>,

    frame_count: u64,

    pending: Option<FrameHandle>,
    /// Target of the next host registration; `None` once stopped.
    on_frame: Option<Weak<RefCell<BeatState>>>,

    clock: Rc<dyn Clock>,
    host: Rc<dyn FrameHost>,
}

// ── Beat ──────────────────────────────────────────────────────────────────────

/// Calls a callback at most `fps` times per second, driven by host refreshes.
///
/// Dropping a `Beat` stops it.
pub struct Beat {
    state: Rc<RefCell<BeatState>>,
}

impl Beat {
    /// Creates an idle beat.  Nothing is booked with the host until
    /// [`start`](Self::start).
    ///
    /// # Errors
    /// [`BeatError::InvalidFps`] if `fps` is not a finite number above zero.
    pub fn new<F>(
        callback: F,
        fps: f64,
        clock: Rc<dyn Clock>,
        host: Rc<dyn FrameHost>,
    ) -> Result<Self, BeatError>
    where
        F: FnMut(&Frame) -> BeatControl + 'static,
    {
        let interval_ms = interval_for_fps(fps).ok_or(BeatError::InvalidFps(fps))?;
        debug!(fps, interval_ms, "Beat created");

        Ok(Self {
            state: Rc::new(RefCell::new(BeatState {
                callback: Some(Box::new(callback)),
                fps,
                interval_ms,
                running: false,
                stopped: false,
                start_time: 0.0,
                previous_frame_time: 0.0,
                previous_accepted_time: 0.0,
                paused_accumulated_ms: 0.0,
                previous_pause_time: None,
                last_accepted: None,
                prior_accepted: None,
                frame_count: 0,
                pending: None,
                on_frame: None,
                clock,
                host,
            })),
        })
    }

    /// [`new`](Self::new) at [`DEFAULT_FPS`].
    pub fn with_default_fps<F>(
        callback: F,
        clock: Rc<dyn Clock>,
        host: Rc<dyn FrameHost>,
    ) -> Result<Self, BeatError>
    where
        F: FnMut(&Frame) -> BeatControl + 'static,
    {
        Self::new(callback, DEFAULT_FPS, clock, host)
    }

    /// [`new`](Self::new) with one object serving as both clock and frame
    /// host.
    pub fn on_host<H, F>(callback: F, fps: f64, host: Rc<H>) -> Result<Self, BeatError>
    where
        H: Clock + FrameHost + 'static,
        F: FnMut(&Frame) -> BeatControl + 'static,
    {
        let clock: Rc<dyn Clock> = host.clone();
        Self::new(callback, fps, clock, host)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts the loop and runs the first scheduling pass immediately.
    ///
    /// Calling `start()` on a running beat restarts its timeline.
    ///
    /// # Errors
    /// [`BeatError::Stopped`] after [`stop`](Self::stop).
    pub fn start(&self) -> Result<(), BeatError> {
        let now = {
            let mut s = self.state.borrow_mut();
            if s.stopped {
                return Err(BeatError::Stopped);
            }
            let now = s.clock.now();
            s.start_time = now;
            s.previous_frame_time = now;
            s.previous_accepted_time = now;
            s.paused_accumulated_ms = 0.0;
            s.previous_pause_time = None;
            s.last_accepted = None;
            s.prior_accepted = None;
            s.running = true;
            s.on_frame = Some(Rc::downgrade(&self.state));
            debug!(start_ms = now, fps = s.fps, "Beat started");
            now
        };

        step(&self.state, now);
        Ok(())
    }

    /// Pauses the loop.
    ///
    /// The pending host registration is left in place; when it fires it sees
    /// the beat paused and does not book another one.
    pub fn pause(&self) {
        let mut s = self.state.borrow_mut();
        if !s.running {
            debug!("pause() ignored: beat is not running");
            return;
        }
        let now = s.clock.now();
        s.running = false;
        s.previous_pause_time = Some(now);
        debug!(pause_ms = now, frame_count = s.frame_count, "Beat paused");
    }

    /// Resumes after [`pause`](Self::pause).  The paused interval is excluded
    /// from every later `elapsed_ms` / `delta_ms`.
    pub fn resume(&self) {
        let now = {
            let mut s = self.state.borrow_mut();
            if s.stopped || s.running {
                debug!(
                    stopped = s.stopped,
                    running = s.running,
                    "resume() ignored: beat is not paused"
                );
                return;
            }
            let Some(paused_at) = s.previous_pause_time.take() else {
                warn!("resume() ignored: beat was never started");
                return;
            };
            let now = s.clock.now();
            s.paused_accumulated_ms += now - paused_at;
            s.running = true;
            debug!(
                resume_ms = now,
                paused_total_ms = s.paused_accumulated_ms,
                "Beat resumed"
            );
            now
        };

        step(&self.state, now);
    }

    /// Stops the loop for good: releases the callback and cancels the pending
    /// host registration.  Idempotent.
    pub fn stop(&self) {
        stop_state(&self.state);
    }

    /// Runs one scheduling pass at host time `current_time`.
    ///
    /// Normally invoked by the host on each refresh; exposed so callers can
    /// drive a beat by hand.
    pub fn frame(&self, current_time: f64) {
        step(&self.state, current_time);
    }

    /// Changes the target rate.
    ///
    /// The accepted-frame marker is re-anchored to the most recent accepted
    /// frame, so the next frame is accepted one new interval after it.
    ///
    /// # Errors
    /// [`BeatError::InvalidFps`]; the current rate is kept.
    pub fn set_fps(&self, fps: f64) -> Result<(), BeatError> {
        let interval_ms = interval_for_fps(fps).ok_or(BeatError::InvalidFps(fps))?;
        let mut s = self.state.borrow_mut();
        debug!(from = s.fps, to = fps, "Beat rate changed");
        s.fps = fps;
        s.interval_ms = interval_ms;
        s.previous_accepted_time = s.previous_frame_time;
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn running(&self) -> bool {
        self.state.borrow().running
    }

    /// `true` once [`stop`](Self::stop) has run.
    pub fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    /// Elapsed ms since `start()` as of the most recent accepted frame,
    /// excluding paused time.
    pub fn time(&self) -> f64 {
        let s = self.state.borrow();
        s.previous_frame_time - s.start_time
    }

    /// Measured rate from the two most recent accepted frames.
    ///
    /// `None` until two frames have been accepted since `start()`.
    pub fn current_fps(&self) -> Option<f64> {
        let s = self.state.borrow();
        match (s.prior_accepted, s.last_accepted) {
            (Some(prior), Some(last)) => fps_from_interval(last - prior),
            _ => None,
        }
    }

    /// Number of accepted frames so far.
    pub fn frame_count(&self) -> u64 {
        self.state.borrow().frame_count
    }

    pub fn fps(&self) -> f64 {
        self.state.borrow().fps
    }

    /// Minimum ms between accepted frames (`1000 / fps`).
    pub fn interval_ms(&self) -> f64 {
        self.state.borrow().interval_ms
    }
}

impl Drop for Beat {
    fn drop(&mut self) {
        stop_state(&self.state);
    }
}

impl std::fmt::Debug for Beat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("Beat")
            .field("fps", &s.fps)
            .field("running", &s.running)
            .field("stopped", &s.stopped)
            .field("frame_count", &s.frame_count)
            .finish()
    }
}

// ── Scheduling pass ───────────────────────────────────────────────────────────

fn step(state: &Rc<RefCell<BeatState>>, current_time: f64) {
    let accepted = {
        let mut s = state.borrow_mut();
        if !s.running {
            trace!(current_time, "refresh while paused; frame chain halted");
            return;
        }

        let now = current_time - s.paused_accumulated_ms;
        let delta = now - s.previous_accepted_time;
        if delta >= s.interval_ms {
            s.previous_accepted_time = accepted_marker(now, delta, s.interval_ms);
            let frame = Frame {
                elapsed_ms: now - s.start_time,
                delta_ms: now - s.previous_frame_time,
                index: s.frame_count,
            };
            Some((now, frame, s.callback.take()))
        } else {
            None
        }
    };

    if let Some((now, frame, callback)) = accepted {
        trace!(
            index = frame.index,
            elapsed_ms = frame.elapsed_ms,
            delta_ms = frame.delta_ms,
            "accepted frame"
        );

        // The callback runs with no borrow held: it may touch the host,
        // and a `Stop` is applied only after it returns.
        let (callback, control) = match callback {
            Some(mut cb) => {
                let control = cb(&frame);
                (Some(cb), control)
            }
            None => (None, BeatControl::Continue),
        };

        {
            let mut s = state.borrow_mut();
            s.previous_frame_time = now;
            s.prior_accepted = s.last_accepted;
            s.last_accepted = Some(now);
            s.frame_count += 1;
            if s.on_frame.is_some() && s.callback.is_none() {
                s.callback = callback;
            }
        }

        if control == BeatControl::Stop {
            debug!(index = frame.index, "callback requested stop");
            stop_state(state);
        }
    }

    schedule_next(state);
}

/// Books the next refresh unless the beat is stopped or one is already
/// pending.
fn schedule_next(state: &Rc<RefCell<BeatState>>) {
    let (host, continuation) = {
        let s = state.borrow();
        match (&s.on_frame, s.pending) {
            (Some(weak), None) => (s.host.clone(), weak.clone()),
            _ => return,
        }
    };

    let handle = host.request_frame(Box::new(move |timestamp| {
        if let Some(state) = continuation.upgrade() {
            state.borrow_mut().pending = None;
            step(&state, timestamp);
        }
    }));
    state.borrow_mut().pending = Some(handle);
}

fn stop_state(state: &Rc<RefCell<BeatState>>) {
    let (host, pending, callback) = {
        let mut s = state.borrow_mut();
        if s.stopped {
            return;
        }
        if s.running {
            let now = s.clock.now();
            s.running = false;
            s.previous_pause_time = Some(now);
        }
        s.stopped = true;
        s.on_frame = None;
        debug!(frame_count = s.frame_count, "Beat stopped");
        (s.host.clone(), s.pending.take(), s.callback.take())
    };

    if let Some(handle) = pending {
        host.cancel_frame(handle);
    }
    drop(callback);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
