use serde::{Deserialize, Serialize};

use crate::models::ExerciseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RepPhase {
    /// No usable signal yet, or tracking was lost.
    #[default]
    Idle,
    Top,
    Descending,
    Bottom,
    Ascending,
}

impl RepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepPhase::Idle => "idle",
            RepPhase::Top => "top",
            RepPhase::Descending => "descending",
            RepPhase::Bottom => "bottom",
            RepPhase::Ascending => "ascending",
        }
    }
}

/// Per-session rep tracking state. Only the state machine mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepState {
    pub exercise_type: ExerciseType,
    pub phase: RepPhase,
    pub rep_count: u32,
    pub last_transition_time: Option<f64>,
}

impl RepState {
    pub fn new(exercise_type: ExerciseType) -> Self {
        Self {
            exercise_type,
            phase: RepPhase::Idle,
            rep_count: 0,
            last_transition_time: None,
        }
    }
}
