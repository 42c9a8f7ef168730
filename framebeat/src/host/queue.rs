/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pending per-refresh callbacks, shared by every host implementation.

use std::cell::{Cell, RefCell};

use tracing::trace;

use super::{FrameCallback, FrameHandle, FrameHost};

/// Ordered registry of frame callbacks waiting for the next refresh.
///
/// [`dispatch`](Self::dispatch) runs only callbacks that were registered
/// before it began; anything booked from inside a callback waits for the
/// following refresh.  No internal borrow is held while a callback runs, so
/// callbacks may register or cancel freely.
#[derive(Default)]
pub struct FrameQueue {
    next_id: Cell<u64>,
    pending: RefCell<Vec<(FrameHandle, FrameCallback)>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registrations waiting for the next refresh.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Runs every callback registered before this call, in registration
    /// order, passing `timestamp_ms`.  Returns how many ran.
    pub fn dispatch(&self, timestamp_ms: f64) -> usize {
        let cutoff = self.next_id.get();
        let mut ran = 0;

        loop {
            let next = {
                let mut pending = self.pending.borrow_mut();
                let idx = pending
                    .iter()
                    .position(|(handle, _)| handle.id() < cutoff);
                idx.map(|idx| pending.remove(idx))
            };
            let Some((handle, callback)) = next else {
                break;
            };
            trace!(handle = handle.id(), timestamp_ms, "dispatching frame callback");
            callback(timestamp_ms);
            ran += 1;
        }

        ran
    }
}

impl FrameHost for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle::new(self.next_id.get());
        self.next_id.set(handle.id() + 1);
        self.pending.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.pending.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("next_id", &self.next_id.get())
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn dispatch_runs_in_registration_order() {
        let q = FrameQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            q.request_frame(Box::new(move |ts| log.borrow_mut().push((i, ts))));
        }
        assert_eq!(q.dispatch(16.0), 3);
        assert_eq!(*log.borrow(), vec![(0, 16.0), (1, 16.0), (2, 16.0)]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_callback_never_runs() {
        let q = FrameQueue::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = q.request_frame(Box::new(move |_| h.set(h.get() + 1)));
        q.cancel_frame(handle);
        assert_eq!(q.dispatch(1.0), 0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn cancel_unknown_handle_is_noop() {
        let q = FrameQueue::new();
        q.request_frame(Box::new(|_| {}));
        q.cancel_frame(FrameHandle::new(999));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn callbacks_booked_during_dispatch_wait_for_next_refresh() {
        let q = Rc::new(FrameQueue::new());
        let hits = Rc::new(Cell::new(0));

        let (q2, h2) = (q.clone(), hits.clone());
        q.request_frame(Box::new(move |_| {
            h2.set(h2.get() + 1);
            let h3 = h2.clone();
            q2.request_frame(Box::new(move |_| h3.set(h3.get() + 1)));
        }));

        assert_eq!(q.dispatch(1.0), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(q.len(), 1);

        assert_eq!(q.dispatch(2.0), 1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn callback_can_cancel_a_sibling_in_the_same_batch() {
        let q = Rc::new(FrameQueue::new());
        let hits = Rc::new(Cell::new(0));

        // Second registration's handle is known in advance: ids are sequential.
        let q2 = q.clone();
        q.request_frame(Box::new(move |_| q2.cancel_frame(FrameHandle::new(1))));
        let h = hits.clone();
        q.request_frame(Box::new(move |_| h.set(h.get() + 1)));

        assert_eq!(q.dispatch(1.0), 1);
        assert_eq!(hits.get(), 0);
    }
}
