use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::RepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    Squat,
    Pushup,
    BicepCurl,
    Crunch,
    Lunge,
    Plank,
    JumpingJack,
    Burpee,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 8] = [
        ExerciseType::Squat,
        ExerciseType::Pushup,
        ExerciseType::BicepCurl,
        ExerciseType::Crunch,
        ExerciseType::Lunge,
        ExerciseType::Plank,
        ExerciseType::JumpingJack,
        ExerciseType::Burpee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Squat => "squat",
            ExerciseType::Pushup => "pushup",
            ExerciseType::BicepCurl => "bicep-curl",
            ExerciseType::Crunch => "crunch",
            ExerciseType::Lunge => "lunge",
            ExerciseType::Plank => "plank",
            ExerciseType::JumpingJack => "jumping-jack",
            ExerciseType::Burpee => "burpee",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = RepError;

    /// Accepts kebab-case, snake_case and the legacy display labels
    /// (`Pushups`, `Squats`, `Bicep Curls`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let exercise = match normalized.as_str() {
            "squat" | "squats" => ExerciseType::Squat,
            "pushup" | "pushups" | "push-up" | "push-ups" | "pushes" => ExerciseType::Pushup,
            "bicep-curl" | "bicep-curls" => ExerciseType::BicepCurl,
            "crunch" | "crunches" => ExerciseType::Crunch,
            "lunge" | "lunges" => ExerciseType::Lunge,
            "plank" => ExerciseType::Plank,
            "jumping-jack" | "jumping-jacks" => ExerciseType::JumpingJack,
            "burpee" | "burpees" => ExerciseType::Burpee,
            _ => return Err(RepError::UnsupportedExerciseType(value.to_string())),
        };
        Ok(exercise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("squat".parse::<ExerciseType>().unwrap(), ExerciseType::Squat);
        assert_eq!("Squats".parse::<ExerciseType>().unwrap(), ExerciseType::Squat);
        assert_eq!("Bicep Curls".parse::<ExerciseType>().unwrap(), ExerciseType::BicepCurl);
        assert_eq!("jumping_jack".parse::<ExerciseType>().unwrap(), ExerciseType::JumpingJack);
        assert_eq!("Pushups".parse::<ExerciseType>().unwrap(), ExerciseType::Pushup);
    }

    #[test]
    fn test_unsupported_exercise() {
        match "deadlift".parse::<ExerciseType>() {
            Err(RepError::UnsupportedExerciseType(name)) => assert_eq!(name, "deadlift"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_canonical_names_parse_back() {
        for exercise in ExerciseType::ALL {
            assert_eq!(exercise.as_str().parse::<ExerciseType>().unwrap(), exercise);
            let json = serde_json::to_string(&exercise).unwrap();
            assert_eq!(json, format!("\"{}\"", exercise.as_str()));
        }
    }
}
