//! Per-exercise configuration table: which formula drives the signal and
//! where the hysteresis band sits.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::geometry::{angle_at, verticality, Point};
use crate::{
    error::RepError,
    models::{ExerciseType, Joint},
    reps::{MotionKind, Thresholds},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Left,
    Right,
}

/// Three-joint chain whose middle joint carries the measured angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AngleChain {
    HipKneeAnkle,
    ShoulderElbowWrist,
    ShoulderHipKnee,
    ShoulderHipAnkle,
    HipShoulderWrist,
}

impl AngleChain {
    pub fn joints(&self, side: Side) -> [Joint; 3] {
        use Joint::*;
        match (self, side) {
            (AngleChain::HipKneeAnkle, Side::Left) => [LeftHip, LeftKnee, LeftAnkle],
            (AngleChain::HipKneeAnkle, Side::Right) => [RightHip, RightKnee, RightAnkle],
            (AngleChain::ShoulderElbowWrist, Side::Left) => [LeftShoulder, LeftElbow, LeftWrist],
            (AngleChain::ShoulderElbowWrist, Side::Right) => {
                [RightShoulder, RightElbow, RightWrist]
            }
            (AngleChain::ShoulderHipKnee, Side::Left) => [LeftShoulder, LeftHip, LeftKnee],
            (AngleChain::ShoulderHipKnee, Side::Right) => [RightShoulder, RightHip, RightKnee],
            (AngleChain::ShoulderHipAnkle, Side::Left) => [LeftShoulder, LeftHip, LeftAnkle],
            (AngleChain::ShoulderHipAnkle, Side::Right) => [RightShoulder, RightHip, RightAnkle],
            (AngleChain::HipShoulderWrist, Side::Left) => [LeftHip, LeftShoulder, LeftWrist],
            (AngleChain::HipShoulderWrist, Side::Right) => [RightHip, RightShoulder, RightWrist],
        }
    }
}

/// Geometric formula turning smoothed joint positions into one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignalFormula {
    /// Angle at the middle joint of the chain, degrees.
    Angle { chain: AngleChain },
    /// 180 minus the angle at the middle joint, for movements that start flexed.
    InvertedAngle { chain: AngleChain },
    /// Uprightness of the shoulder-ankle line, percent.
    Verticality,
}

impl SignalFormula {
    pub fn required_joints(&self, side: Side) -> Vec<Joint> {
        match self {
            SignalFormula::Angle { chain } | SignalFormula::InvertedAngle { chain } => {
                chain.joints(side).to_vec()
            }
            SignalFormula::Verticality => match side {
                Side::Left => vec![Joint::LeftShoulder, Joint::LeftAnkle],
                Side::Right => vec![Joint::RightShoulder, Joint::RightAnkle],
            },
        }
    }

    /// Evaluates the formula on points ordered as in `required_joints`.
    pub fn evaluate(&self, points: &[Point]) -> Option<f64> {
        match (self, points) {
            (SignalFormula::Angle { .. }, [a, b, c]) => angle_at(*a, *b, *c),
            (SignalFormula::InvertedAngle { .. }, [a, b, c]) => {
                angle_at(*a, *b, *c).map(|angle| 180.0 - angle)
            }
            (SignalFormula::Verticality, [top, bottom]) => verticality(*top, *bottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProfile {
    pub formula: SignalFormula,
    pub thresholds: Thresholds,
    /// Fastest acceptable full cycle, seconds.
    pub min_rep_secs: f64,
    pub kind: MotionKind,
}

impl ExerciseProfile {
    fn reps(formula: SignalFormula, thresholds: Thresholds, min_rep_secs: f64) -> Self {
        Self {
            formula,
            thresholds,
            min_rep_secs,
            kind: MotionKind::Reps,
        }
    }
}

/// Profiles keyed by exercise. Loaded once when a session starts.
///
/// Deserialized entries override the built-in profiles one exercise at a
/// time; exercises left out keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProfileTable(BTreeMap<ExerciseType, ExerciseProfile>);

impl<'de> Deserialize<'de> for ProfileTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = BTreeMap::<ExerciseType, ExerciseProfile>::deserialize(deserializer)?;
        let mut table = ProfileTable::default();
        table.0.extend(overrides);
        Ok(table)
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        use AngleChain::*;
        use SignalFormula::*;

        let mut table = BTreeMap::new();
        table.insert(
            ExerciseType::Squat,
            ExerciseProfile::reps(
                Angle { chain: HipKneeAnkle },
                Thresholds::new(160.0, 90.0, 5.0),
                1.0,
            ),
        );
        table.insert(
            ExerciseType::Pushup,
            ExerciseProfile::reps(
                Angle {
                    chain: ShoulderElbowWrist,
                },
                Thresholds::new(160.0, 90.0, 5.0),
                0.8,
            ),
        );
        table.insert(
            ExerciseType::BicepCurl,
            ExerciseProfile::reps(
                Angle {
                    chain: ShoulderElbowWrist,
                },
                Thresholds::new(160.0, 40.0, 10.0),
                1.0,
            ),
        );
        table.insert(
            ExerciseType::Crunch,
            ExerciseProfile::reps(
                Angle {
                    chain: ShoulderHipKnee,
                },
                Thresholds::new(120.0, 70.0, 5.0),
                0.8,
            ),
        );
        table.insert(
            ExerciseType::Lunge,
            ExerciseProfile::reps(
                Angle { chain: HipKneeAnkle },
                Thresholds::new(150.0, 100.0, 5.0),
                1.0,
            ),
        );
        table.insert(
            ExerciseType::Plank,
            ExerciseProfile {
                formula: Angle {
                    chain: ShoulderHipAnkle,
                },
                thresholds: Thresholds::new(160.0, 140.0, 5.0),
                min_rep_secs: 0.0,
                kind: MotionKind::Hold,
            },
        );
        table.insert(
            ExerciseType::JumpingJack,
            ExerciseProfile::reps(
                InvertedAngle {
                    chain: HipShoulderWrist,
                },
                Thresholds::new(140.0, 60.0, 10.0),
                0.5,
            ),
        );
        table.insert(
            ExerciseType::Burpee,
            ExerciseProfile::reps(Verticality, Thresholds::new(80.0, 30.0, 5.0), 1.5),
        );

        Self(table)
    }
}

impl ProfileTable {
    pub fn get(&self, exercise: ExerciseType) -> Result<&ExerciseProfile, RepError> {
        self.0
            .get(&exercise)
            .ok_or_else(|| RepError::UnsupportedExerciseType(exercise.as_str().to_string()))
    }

    pub fn set(&mut self, exercise: ExerciseType, profile: ExerciseProfile) {
        self.0.insert(exercise, profile);
    }

    pub fn remove(&mut self, exercise: ExerciseType) -> Option<ExerciseProfile> {
        self.0.remove(&exercise)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (exercise, profile) in &self.0 {
            profile
                .thresholds
                .validate()
                .map_err(|err| format!("{exercise}: {err}"))?;
            if profile.min_rep_secs < 0.0 {
                return Err(format!("{exercise}: min_rep_secs must not be negative"));
            }
        }
        Ok(())
    }
}
