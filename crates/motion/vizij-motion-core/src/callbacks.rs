//! Callback side table and fault isolation.
//!
//! Lifecycle callbacks live here rather than in the dense rows so the tick
//! loop stays small. Most motions never register one; lookups only happen
//! on loop boundaries, completion and cancellation.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::completion::{recycle, CompletionCell, CompletionPool, CompletionStatus};
use crate::error::{CallbackFault, CallbackSource};
use crate::handle::MotionHandle;

pub type Callback = Box<dyn FnMut()>;
pub type LoopCallback = Box<dyn FnMut(u32)>;
pub type FaultHook = Box<dyn FnMut(CallbackFault)>;

/// Default fault hook: log and carry on.
pub fn log_fault(fault: CallbackFault) {
    log::error!("unhandled motion callback fault: {fault}");
}

#[derive(Default)]
pub struct MotionCallbacks {
    pub on_complete: Option<Callback>,
    pub on_cancel: Option<Callback>,
    pub on_loop_complete: Option<LoopCallback>,
    waiters: Vec<Arc<CompletionCell>>,
}

impl MotionCallbacks {
    pub fn is_empty(&self) -> bool {
        self.on_complete.is_none()
            && self.on_cancel.is_none()
            && self.on_loop_complete.is_none()
            && self.waiters.is_empty()
    }
}

impl std::fmt::Debug for MotionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionCallbacks")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_loop_complete", &self.on_loop_complete.is_some())
            .field("waiters", &self.waiters.len())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run a consumer callback, turning a panic into a [`CallbackFault`].
#[inline]
pub(crate) fn guard(
    faults: &mut FaultHook,
    handle: MotionHandle,
    callback: CallbackSource,
    f: impl FnOnce(),
) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let fault = CallbackFault {
            handle,
            callback,
            message: panic_message(payload),
        };
        // A panicking hook must not take the tick down either.
        if catch_unwind(AssertUnwindSafe(|| faults(fault))).is_err() {
            log::error!("motion fault hook panicked while reporting {callback:?} of {handle:?}");
        }
    }
}

/// Side table from handle to callbacks plus the fault hook they report to.
pub(crate) struct CallbackRegistry {
    entries: HashMap<MotionHandle, MotionCallbacks>,
    pool: Arc<CompletionPool>,
    pub(crate) faults: FaultHook,
}

impl CallbackRegistry {
    pub(crate) fn new(pool: Arc<CompletionPool>) -> Self {
        Self {
            entries: HashMap::new(),
            pool,
            faults: Box::new(log_fault),
        }
    }

    pub fn insert(&mut self, handle: MotionHandle, callbacks: MotionCallbacks) {
        if !callbacks.is_empty() {
            self.entries.insert(handle, callbacks);
        }
    }

    pub(crate) fn add_waiter(&mut self, handle: MotionHandle, cell: Arc<CompletionCell>) {
        self.entries.entry(handle).or_default().waiters.push(cell);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: MotionHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub(crate) fn loop_complete(&mut self, handle: MotionHandle, completed_loops: u32) {
        if let Some(cb) = self
            .entries
            .get_mut(&handle)
            .and_then(|e| e.on_loop_complete.as_mut())
        {
            guard(&mut self.faults, handle, CallbackSource::OnLoopComplete, || {
                cb(completed_loops)
            });
        }
    }

    pub(crate) fn complete(&mut self, handle: MotionHandle) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return;
        };
        if let Some(cb) = entry.on_complete.as_mut() {
            guard(&mut self.faults, handle, CallbackSource::OnComplete, || cb());
        }
        for cell in entry.waiters.drain(..) {
            cell.resolve(CompletionStatus::Completed);
            recycle(&self.pool, cell);
        }
    }

    pub(crate) fn cancel(&mut self, handle: MotionHandle) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return;
        };
        if let Some(cb) = entry.on_cancel.as_mut() {
            guard(&mut self.faults, handle, CallbackSource::OnCancel, || cb());
        }
        for cell in entry.waiters.drain(..) {
            cell.resolve(CompletionStatus::Canceled);
            recycle(&self.pool, cell);
        }
    }

    /// Drop everything registered for a released motion. Waiters still
    /// pending (released without completing) resolve as canceled.
    pub(crate) fn release(&mut self, handle: MotionHandle) {
        if let Some(mut entry) = self.entries.remove(&handle) {
            for cell in entry.waiters.drain(..) {
                cell.resolve(CompletionStatus::Canceled);
                recycle(&self.pool, cell);
            }
        }
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
