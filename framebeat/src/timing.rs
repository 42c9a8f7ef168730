/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Call-rate helpers: throttle, debounce and an async wait.
//!
//! Like [`Beat`](crate::beat::Beat), the helpers take their time source and
//! timer registry as injected host capabilities, so they run unchanged
//! against a [`SimulatedHost`](crate::host::SimulatedHost) in tests.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::trace;

use crate::host::{Clock, TimerHandle, TimerHost};

// ── Throttle ──────────────────────────────────────────────────────────────────

/// Forwards at most one call per `wait_ms` window.
///
/// The first call always goes through.  A later call goes through only when
/// strictly more than `wait_ms` has passed since the last forwarded one;
/// suppressed calls are dropped, not queued.
pub struct Throttle<F> {
    func: F,
    wait_ms: f64,
    clock: Rc<dyn Clock>,
    last_call: Option<f64>,
}

impl<F> Throttle<F> {
    pub fn new(func: F, wait_ms: f64, clock: Rc<dyn Clock>) -> Self {
        Self {
            func,
            wait_ms,
            clock,
            last_call: None,
        }
    }

    /// Invokes the wrapped function with `args` unless throttled.  Returns
    /// whether it ran.
    pub fn call<A>(&mut self, args: A) -> bool
    where
        F: FnMut(A),
    {
        let now = self.clock.now();
        if let Some(last) = self.last_call {
            if now <= last + self.wait_ms {
                trace!(now, last, wait_ms = self.wait_ms, "throttled call dropped");
                return false;
            }
        }
        (self.func)(args);
        self.last_call = Some(now);
        true
    }

    /// Forgets the last forwarded call so the next one goes through.
    pub fn reset(&mut self) {
        self.last_call = None;
    }
}

// ── Debounce ──────────────────────────────────────────────────────────────────

struct DebounceInner<A> {
    func: RefCell<Box<dyn FnMut(A)>>,
    delay_ms: f64,
    timers: Rc<dyn TimerHost>,
    pending: Cell<Option<TimerHandle>>,
}

/// Runs the wrapped function once `delay_ms` has passed without a new call,
/// with the arguments of the most recent call.
///
/// Dropping a `Debounce` cancels a pending invocation.
pub struct Debounce<A: 'static> {
    inner: Rc<DebounceInner<A>>,
}

impl<A: 'static> Debounce<A> {
    pub fn new<F>(func: F, delay_ms: f64, timers: Rc<dyn TimerHost>) -> Self
    where
        F: FnMut(A) + 'static,
    {
        Self {
            inner: Rc::new(DebounceInner {
                func: RefCell::new(Box::new(func)),
                delay_ms,
                timers,
                pending: Cell::new(None),
            }),
        }
    }

    /// Restarts the delay, replacing any pending arguments with `args`.
    pub fn call(&self, args: A) {
        self.cancel();

        let weak: Weak<DebounceInner<A>> = Rc::downgrade(&self.inner);
        let handle = self.inner.timers.set_timeout(
            self.inner.delay_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.pending.set(None);
                    let mut func = inner.func.borrow_mut();
                    (*func)(args);
                }
            }),
        );
        self.inner.pending.set(Some(handle));
    }

    /// Drops the pending invocation, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.pending.take() {
            self.inner.timers.clear_timeout(handle);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }
}

impl<A: 'static> Drop for Debounce<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── wait ──────────────────────────────────────────────────────────────────────

/// Resolves after `ms` milliseconds.  Non-positive or non-finite values
/// resolve immediately.
pub async fn wait(ms: f64) {
    if !(ms.is_finite() && ms > 0.0) {
        return;
    }
    tokio::time::sleep(Duration::from_secs_f64(ms / 1_000.0)).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
