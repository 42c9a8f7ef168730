/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Real-time host: a tokio interval stands in for the display refresh.
//!
//! The host is `!Send` (frame callbacks capture `Rc` state), so
//! [`PacedHost::run_for`] must be awaited on a current-thread runtime or
//! inside a `LocalSet`.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::{Clock, FrameCallback, FrameHandle, FrameHost, FrameQueue, SystemClock};
use crate::math::interval_for_fps;

/// Frame host paced by wall-clock time.
#[derive(Debug, Default)]
pub struct PacedHost {
    clock: SystemClock,
    frames: FrameQueue,
}

impl PacedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh period for `refresh_hz`, or `None` for a non-positive rate.
    pub fn refresh_period(refresh_hz: f64) -> Option<Duration> {
        interval_for_fps(refresh_hz).map(|ms| Duration::from_nanos((ms * 1_000_000.0).round() as u64))
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Dispatches pending frame callbacks once per `period` until `duration`
    /// has elapsed.  Returns the number of refreshes performed.
    ///
    /// Late refreshes are skipped rather than bunched up, the same way a
    /// display drops frames it could not present in time.
    pub async fn run_for(&self, duration: Duration, period: Duration) -> u64 {
        if period.is_zero() {
            warn!("PacedHost::run_for ignored: refresh period must be non-zero");
            return 0;
        }

        let deadline = Instant::now() + duration;
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; a refresh happens one period in.
        ticker.tick().await;

        let mut refreshes = 0;
        loop {
            let at = ticker.tick().await;
            if at > deadline {
                break;
            }
            self.frames.dispatch(self.clock.now());
            refreshes += 1;
        }

        debug!(
            refreshes,
            duration_ms = duration.as_millis() as u64,
            "paced run finished"
        );
        refreshes
    }
}

impl Clock for PacedHost {
    fn now(&self) -> f64 {
        self.clock.now()
    }
}

impl FrameHost for PacedHost {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.frames.request_frame(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.frames.cancel_frame(handle);
    }
}
