/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for the frame scheduler.
//!
//! Only configuration and lifecycle misuse that would otherwise leave a beat
//! silently broken is reported here.  Harmless misuse (`pause()` twice,
//! `resume()` without a prior `pause()`) is logged and ignored instead.

use thiserror::Error;

/// Error returned by [`Beat`](super::Beat) construction and lifecycle calls.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BeatError {
    /// The requested frame rate is zero, negative, NaN or infinite.
    ///
    /// A zero rate would give an infinite interval (the callback never
    /// fires) and a negative rate a negative one (it fires on every host
    /// tick), so both are rejected up front.
    #[error("invalid frame rate {0}: fps must be a finite number greater than zero")]
    InvalidFps(f64),

    /// `start()` was called after `stop()` released the callback.
    #[error("beat has been stopped and cannot be restarted")]
    Stopped,
}
