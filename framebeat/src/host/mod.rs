/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Host collaborators consumed by the frame scheduler.
//!
//! A [`Beat`](crate::beat::Beat) never talks to a display or a timer
//! directly.  It is handed two capabilities at construction:
//!
//! * a [`Clock`] returning monotonic milliseconds, and
//! * a [`FrameHost`] that runs a callback once before the next display
//!   refresh, passing the refresh timestamp.
//!
//! [`TimerHost`] is the one-shot timeout capability used by
//! [`Debounce`](crate::timing::Debounce).
//!
//! | Implementation | Clock | Frames | Timers | Use |
//! |---|---|---|---|---|
//! | [`SimulatedHost`] | [`ManualClock`] | [`FrameQueue`] | yes | tests, offline simulation |
//! | [`PacedHost`] | [`SystemClock`] | [`FrameQueue`] | no | real-time runs on tokio |

pub mod clock;
pub mod paced;
pub mod queue;
pub mod sim;

pub use clock::{ManualClock, SystemClock};
pub use paced::PacedHost;
pub use queue::FrameQueue;
pub use sim::SimulatedHost;

// ── Callbacks & handles ───────────────────────────────────────────────────────

/// One-shot per-refresh callback; receives the refresh timestamp in ms.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// One-shot timeout callback.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Opaque handle to a pending [`FrameHost::request_frame`] registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to a pending [`TimerHost::set_timeout`] registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────────

/// Monotonic high-resolution time source, in milliseconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Per-refresh callback registry.
pub trait FrameHost {
    /// Schedules `callback` to run once before the next refresh.
    ///
    /// Implementations must not invoke `callback` synchronously from inside
    /// this call.
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancels a pending registration.  No-op if it already fired or the
    /// handle is unknown.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// One-shot timeout registry.
pub trait TimerHost {
    /// Schedules `callback` to run once `delay_ms` from now.
    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle;

    /// Cancels a pending timeout.  No-op if it already fired or the handle is
    /// unknown.
    fn clear_timeout(&self, handle: TimerHandle);
}
