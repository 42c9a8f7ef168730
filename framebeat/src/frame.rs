/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Values exchanged between a [`Beat`](crate::beat::Beat) and its callback.
//!
//! ```text
//! host tick ──(timestamp)──►  Beat::frame  ──(accepted?)──►  Frame  ──►  callback
//!                                                                            │
//!                                  Beat::stop  ◄──(BeatControl::Stop)────────┘
//! ```
//!
//! All times are *virtual* milliseconds: paused intervals are already
//! subtracted, so an animation driven by `delta_ms` does not jump after a
//! resume.

// ── Frame ─────────────────────────────────────────────────────────────────────

/// Snapshot handed to the callback on every accepted frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Time since `start()`, excluding paused intervals.
    pub elapsed_ms: f64,

    /// Time since the previous accepted frame (or since `start()` for the
    /// first one), excluding paused intervals.
    ///
    /// Use this to scale per-frame progress so the animation keeps the same
    /// speed regardless of the effective frame rate.
    pub delta_ms: f64,

    /// Zero-based index of this frame.
    pub index: u64,
}

impl Frame {
    /// `delta_ms` in seconds, convenient for physics-style integration.
    pub fn delta_secs(&self) -> f64 {
        self.delta_ms / 1_000.0
    }
}

// ── BeatControl ───────────────────────────────────────────────────────────────

/// Directive returned by a frame callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum BeatControl {
    /// Keep the beat running.
    #[default]
    Continue,
    /// Stop the beat once the callback returns; no further frames are booked.
    Stop,
}
