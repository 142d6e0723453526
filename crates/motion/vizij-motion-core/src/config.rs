//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::ease::Ease;
use crate::error::MotionError;
use crate::scheduler::UpdatePhase;

/// Defaults applied to new motions plus storage sizing hints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Slots reserved up front for each storage.
    pub initial_capacity: usize,
    /// Phase used by builders that do not pick one.
    pub default_phase: UpdatePhase,
    pub default_ease: Ease,
    pub skip_values_during_delay: bool,
    /// Upper bound on recycled completion cells kept around.
    pub completion_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            default_phase: UpdatePhase::Update,
            default_ease: Ease::Linear,
            skip_values_during_delay: true,
            completion_pool_size: 256,
        }
    }
}

impl Config {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, MotionError> {
        serde_json::from_str(json).map_err(|e| MotionError::Config {
            reason: e.to_string(),
        })
    }
}
