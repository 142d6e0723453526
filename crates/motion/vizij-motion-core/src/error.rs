//! Error types for motion construction and callback faults.

use serde::{Deserialize, Serialize};

use crate::handle::MotionHandle;
use crate::timeline::LoopType;

/// Rejected construction. Returned at call time, never from a tick.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MotionError {
    #[error("Invalid duration: {duration}")]
    InvalidDuration { duration: f64 },

    #[error("Invalid delay: {delay}")]
    InvalidDelay { delay: f64 },

    #[error("Invalid playback speed: {speed}")]
    InvalidPlaybackSpeed { speed: f32 },

    #[error("Invalid sequence position: {position}")]
    InvalidPosition { position: f64 },

    /// A sequence needs every child to end.
    #[error("Motion {handle:?} loops forever and cannot be sequenced")]
    InfiniteDuration { handle: MotionHandle },

    #[error("Motion {handle:?} is not active")]
    InactiveMotion { handle: MotionHandle },

    #[error("Motion {handle:?} already belongs to a sequence")]
    AlreadyInSequence { handle: MotionHandle },

    #[error("Sequence {handle:?} cannot be nested in another sequence")]
    NestedSequence { handle: MotionHandle },

    #[error("Loop type {loop_type:?} is not supported for sequences")]
    UnsupportedLoopType { loop_type: LoopType },

    #[error("Config error: {reason}")]
    Config { reason: String },
}

/// Which consumer callback misbehaved.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackSource {
    Sink,
    OnComplete,
    OnCancel,
    OnLoopComplete,
}

/// A consumer callback panicked. Delivered to the engine's fault hook; the
/// motion's lifecycle continues as if the callback had returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{callback:?} callback of {handle:?} panicked: {message}")]
pub struct CallbackFault {
    pub handle: MotionHandle,
    pub callback: CallbackSource,
    pub message: String,
}
