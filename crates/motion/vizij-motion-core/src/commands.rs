//! Deferred motion commands.
//!
//! Callbacks run while the engine is mutably borrowed, so they cannot call
//! engine methods directly. They push [`MotionCommand`]s into a cloned
//! [`MotionCommands`] queue instead; the engine applies the queue after each
//! phase pass and after every direct call that may have run callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::handle::MotionHandle;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotionCommand {
    Cancel(MotionHandle),
    Complete(MotionHandle),
    Pause(MotionHandle),
    Resume(MotionHandle),
    SetPlaybackSpeed { handle: MotionHandle, speed: f32 },
    SetTime { handle: MotionHandle, time: f64 },
}

/// Shared, single-threaded command queue. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct MotionCommands {
    queue: Rc<RefCell<Vec<MotionCommand>>>,
}

impl MotionCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cmd: MotionCommand) {
        self.queue.borrow_mut().push(cmd);
    }

    pub fn cancel(&self, handle: MotionHandle) {
        self.push(MotionCommand::Cancel(handle));
    }

    pub fn complete(&self, handle: MotionHandle) {
        self.push(MotionCommand::Complete(handle));
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Take every queued command, in push order.
    pub(crate) fn take(&self) -> Vec<MotionCommand> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }
}
