//! Vizij Motion Core (engine-agnostic)
//!
//! Slot-based tweening engine. Motions are created through a builder, stored
//! densely per (value, options, adapter) type and update phase, and advanced
//! by `Engine::update`. Consumers hold weak, versioned [`MotionHandle`]s and
//! receive values through sinks plus completion/cancel callbacks.

pub mod adapter;
pub mod builder;
pub mod callbacks;
pub mod commands;
pub mod completion;
pub mod config;
pub mod ease;
pub mod engine;
pub mod error;
pub mod group;
pub mod handle;
pub mod pool;
pub mod scheduler;
pub mod sequence;
pub mod slot;
pub mod storage;
pub mod timeline;

// Re-exports for consumers (bindings)
pub use adapter::{
    ColorAdapter, DefaultAdapter, DoubleAdapter, EvaluationContext, IntegerAdapter,
    IntegerOptions, LerpAdapter, MotionAdapter, NoOptions, PunchAdapter, PunchOptions,
    QuatAdapter, RoundingMode, ScrambleMode, ShakeAdapter, ShakeOptions, SpringAdapter,
    SpringOptions, TextAdapter, TextOptions,
};
pub use builder::MotionBuilder;
pub use callbacks::log_fault;
pub use commands::{MotionCommand, MotionCommands};
pub use completion::{Completion, CompletionStatus};
pub use config::Config;
pub use ease::Ease;
pub use engine::{Engine, EngineStats};
pub use error::{CallbackFault, CallbackSource, MotionError};
pub use group::MotionHandleGroup;
pub use handle::MotionHandle;
pub use pool::ObjectPool;
pub use scheduler::{MotionState, TickTime, UpdatePhase};
pub use sequence::SequenceBuilder;
pub use timeline::{DelayType, LoopCount, LoopType, MotionParams, MotionStatus, TimeKind};
