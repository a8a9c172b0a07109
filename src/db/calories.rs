use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ExerciseType;

/// Linear calorie estimate: kcal per rep, or per second held for planks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalorieTable(BTreeMap<ExerciseType, f64>);

impl Default for CalorieTable {
    fn default() -> Self {
        Self(BTreeMap::from([
            (ExerciseType::Squat, 0.32),
            (ExerciseType::Pushup, 0.36),
            (ExerciseType::BicepCurl, 0.25),
            (ExerciseType::Crunch, 0.25),
            (ExerciseType::Lunge, 0.30),
            (ExerciseType::Plank, 0.05),
            (ExerciseType::JumpingJack, 0.20),
            (ExerciseType::Burpee, 0.50),
        ]))
    }
}

impl CalorieTable {
    pub fn rate(&self, exercise: ExerciseType) -> f64 {
        self.0.get(&exercise).copied().unwrap_or(0.0)
    }

    pub fn set_rate(&mut self, exercise: ExerciseType, kcal_per_unit: f64) {
        self.0.insert(exercise, kcal_per_unit.max(0.0));
    }

    pub fn estimate(&self, exercise: ExerciseType, count: u32) -> f64 {
        self.rate(exercise) * f64::from(count)
    }
}
