/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: frame intervals, drift correction and easing.
//!
//! These are free functions rather than methods so they can be used and tested
//! independently of [`Beat`](crate::beat::Beat).  All times are milliseconds
//! held in `f64`, matching the resolution of a high-resolution host clock.

use std::f64::consts::PI;

/// Milliseconds in one second.
pub const MS_PER_SECOND: f64 = 1_000.0;

/// Target interval in milliseconds for `fps` frames per second.
///
/// Returns `None` when `fps` is not finite or not strictly positive.  A zero
/// rate would yield an infinite interval (the scheduler never fires) and a
/// negative one a negative interval (it fires on every host tick); neither is
/// a meaningful configuration.
pub fn interval_for_fps(fps: f64) -> Option<f64> {
    if fps.is_finite() && fps > 0.0 {
        Some(MS_PER_SECOND / fps)
    } else {
        None
    }
}

/// New "previous accepted" marker after accepting a frame at `current_ms`.
///
/// `delta_ms` is the time elapsed since the old marker.  The marker moves
/// forward by a whole number of intervals, keeping the remainder
/// (`delta_ms % interval_ms`) so rounding error does not accumulate across
/// frames.
pub fn accepted_marker(current_ms: f64, delta_ms: f64, interval_ms: f64) -> f64 {
    current_ms - delta_ms % interval_ms
}

/// Instantaneous frame rate for two frames `interval_ms` apart.
///
/// Returns `None` for a non-positive or non-finite interval.
pub fn fps_from_interval(interval_ms: f64) -> Option<f64> {
    if interval_ms.is_finite() && interval_ms > 0.0 {
        Some(MS_PER_SECOND / interval_ms)
    } else {
        None
    }
}

/// Position at `t` (0–1) on a quadratic Bézier curve with control points
/// `x1`, `x2`, `x3`.
pub fn bezier3(t: f64, x1: f64, x2: f64, x3: f64) -> f64 {
    let u = 1.0 - t;
    u * u * x1 + 2.0 * u * t * x2 + t * t * x3
}

/// Converts an angle from degrees to radians.
pub fn to_radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
