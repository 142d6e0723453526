//! External handle to a motion.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::slot::SlotIndex;
use crate::timeline::MotionStatus;

/// Weak, versioned reference to a motion owned by an [`Engine`].
///
/// A handle resolves only while its version matches the slot's current
/// version. Once the motion is canceled or completes (and was not preserved)
/// every operation through the handle is a no-op. `MotionHandle::default()`
/// never resolves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionHandle {
    pub storage: u32,
    pub index: u32,
    pub version: u32,
}

impl MotionHandle {
    #[inline]
    pub(crate) fn new(storage: u32, slot: SlotIndex) -> Self {
        Self {
            storage,
            index: slot.index,
            version: slot.version,
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> SlotIndex {
        SlotIndex {
            index: self.index,
            version: self.version,
        }
    }

    // Convenience wrappers so call sites can read `handle.cancel(&mut engine)`.

    pub fn is_active(self, engine: &Engine) -> bool {
        engine.is_active(self)
    }

    pub fn is_playing(self, engine: &Engine) -> bool {
        engine.is_playing(self)
    }

    pub fn status(self, engine: &Engine) -> Option<MotionStatus> {
        engine.status(self)
    }

    pub fn cancel(self, engine: &mut Engine) -> bool {
        engine.cancel(self)
    }

    pub fn complete(self, engine: &mut Engine) -> bool {
        engine.complete(self)
    }

    pub fn preserve(self, engine: &mut Engine) -> bool {
        engine.preserve(self)
    }

    pub fn pause(self, engine: &mut Engine) -> bool {
        engine.pause(self)
    }

    pub fn resume(self, engine: &mut Engine) -> bool {
        engine.resume(self)
    }

    pub fn time(self, engine: &Engine) -> Option<f64> {
        engine.time(self)
    }

    pub fn set_time(self, engine: &mut Engine, time: f64) -> bool {
        engine.set_time(self, time)
    }

    pub fn playback_speed(self, engine: &Engine) -> Option<f32> {
        engine.playback_speed(self)
    }

    pub fn set_playback_speed(self, engine: &mut Engine, speed: f32) -> bool {
        engine.set_playback_speed(self, speed)
    }
}
