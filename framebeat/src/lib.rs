/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! framebeat – frame-paced callback scheduler
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── beat/      – Beat: fixed-rate callback driver on host refreshes
//! ├── frame.rs   – Frame snapshot + BeatControl
//! ├── host/      – Clock / FrameHost / TimerHost + simulated & paced hosts
//! ├── timing.rs  – Throttle, Debounce, wait
//! ├── math.rs    – interval, drift-correction and easing helpers
//! └── config/    – YAML scenario files for the simulator
//! ```

pub mod beat;
pub mod config;
pub mod frame;
pub mod host;
pub mod math;
pub mod timing;
