use serde::{Deserialize, Serialize};

use super::{
    geometry::Point,
    profile::{ExerciseProfile, ProfileTable, Side},
    smoothing::Smoothing,
};
use crate::{
    error::RepError,
    ingest::FrameBuffer,
    models::{ExerciseType, Joint},
};

/// Scalar driving the rep state machine for one accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSignal {
    pub timestamp: f64,
    pub value: f64,
    /// False when the joints behind the formula were not reliably detected.
    pub valid: bool,
    /// Mean confidence of the formula's joints in the newest frame.
    pub confidence: f64,
}

impl ExerciseSignal {
    pub fn valid(timestamp: f64, value: f64, confidence: f64) -> Self {
        Self {
            timestamp,
            value,
            valid: true,
            confidence,
        }
    }

    pub fn invalid(timestamp: f64) -> Self {
        Self {
            timestamp,
            value: f64::NAN,
            valid: false,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalExtractor {
    exercise: ExerciseType,
    profile: ExerciseProfile,
    min_confidence: f64,
    smoothing: Smoothing,
}

impl SignalExtractor {
    pub fn new(
        exercise: ExerciseType,
        profile: ExerciseProfile,
        min_confidence: f64,
        smoothing: Smoothing,
    ) -> Self {
        Self {
            exercise,
            profile,
            min_confidence,
            smoothing,
        }
    }

    pub fn for_exercise(
        exercise: ExerciseType,
        profiles: &ProfileTable,
        min_confidence: f64,
        smoothing: Smoothing,
    ) -> Result<Self, RepError> {
        let profile = *profiles.get(exercise)?;
        Ok(Self::new(exercise, profile, min_confidence, smoothing))
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    pub fn profile(&self) -> &ExerciseProfile {
        &self.profile
    }

    /// Signal for the newest frame in `buffer`; `None` if the buffer is empty.
    pub fn extract(&self, buffer: &FrameBuffer) -> Option<ExerciseSignal> {
        let latest = buffer.latest()?;
        let timestamp = latest.timestamp;

        let side = self.pick_side(buffer);
        let joints = self.profile.formula.required_joints(side);

        if !self.joints_reliable(buffer, &joints) {
            return Some(ExerciseSignal::invalid(timestamp));
        }

        let points: Option<Vec<Point>> = joints
            .iter()
            .map(|joint| self.smoothing.position(buffer, *joint, self.min_confidence))
            .collect();
        let value = points.and_then(|points| self.profile.formula.evaluate(&points));

        let confidence = joints
            .iter()
            .map(|joint| latest.get(*joint).map_or(0.0, |kp| kp.confidence))
            .sum::<f64>()
            / joints.len() as f64;

        Some(match value {
            Some(value) => ExerciseSignal::valid(timestamp, value, confidence),
            None => ExerciseSignal::invalid(timestamp),
        })
    }

    /// Side whose formula joints are better detected across the window. Left wins ties.
    fn pick_side(&self, buffer: &FrameBuffer) -> Side {
        let score = |side: Side| -> f64 {
            let joints = self.profile.formula.required_joints(side);
            buffer
                .iter()
                .flat_map(|frame| {
                    joints
                        .iter()
                        .map(move |joint| frame.get(*joint).map_or(0.0, |kp| kp.confidence))
                })
                .sum()
        };

        if score(Side::Right) > score(Side::Left) {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// A joint is unreliable when it is missing or below the confidence
    /// threshold in at least half of the buffered frames.
    fn joints_reliable(&self, buffer: &FrameBuffer, joints: &[Joint]) -> bool {
        let window = buffer.len();
        joints.iter().all(|joint| {
            let weak = buffer
                .iter()
                .filter(|frame| {
                    frame
                        .get(*joint)
                        .map_or(true, |kp| !kp.is_confident(self.min_confidence))
                })
                .count();
            weak * 2 < window
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frame, Keypoint};

    fn leg_frame(timestamp: f64, ankle: (f64, f64), confidence: f64) -> Frame {
        Frame::new(
            timestamp,
            [
                Keypoint::new(Joint::LeftHip, 0.5, 0.3, confidence),
                Keypoint::new(Joint::LeftKnee, 0.5, 0.5, confidence),
                Keypoint::new(Joint::LeftAnkle, ankle.0, ankle.1, confidence),
                Keypoint::new(Joint::RightHip, 0.5, 0.3, 0.1),
                Keypoint::new(Joint::RightKnee, 0.5, 0.5, 0.1),
                Keypoint::new(Joint::RightAnkle, 0.5, 0.7, 0.1),
            ],
        )
    }

    fn squat_extractor(smoothing: Smoothing) -> SignalExtractor {
        SignalExtractor::for_exercise(ExerciseType::Squat, &ProfileTable::default(), 0.5, smoothing)
            .unwrap()
    }

    #[test]
    fn test_knee_angle_for_squat() {
        let extractor = squat_extractor(Smoothing::None);
        let mut buffer = FrameBuffer::new(4);

        buffer.push(leg_frame(0.0, (0.5, 0.7), 0.9));
        let standing = extractor.extract(&buffer).unwrap();
        assert!(standing.valid);
        assert!((standing.value - 180.0).abs() < 1e-6);
        assert!((standing.confidence - 0.9).abs() < 1e-9);

        buffer.push(leg_frame(0.1, (0.7, 0.5), 0.9));
        let bent = extractor.extract(&buffer).unwrap();
        assert!((bent.value - 90.0).abs() < 1e-6);
        assert_eq!(bent.timestamp, 0.1);
    }

    #[test]
    fn test_right_side_used_when_better_detected() {
        let extractor = squat_extractor(Smoothing::None);
        let mut buffer = FrameBuffer::new(4);
        buffer.push(Frame::new(
            0.0,
            [
                Keypoint::new(Joint::LeftHip, 0.5, 0.3, 0.2),
                Keypoint::new(Joint::RightHip, 0.5, 0.3, 0.9),
                Keypoint::new(Joint::RightKnee, 0.5, 0.5, 0.9),
                Keypoint::new(Joint::RightAnkle, 0.7, 0.5, 0.9),
            ],
        ));
        let signal = extractor.extract(&buffer).unwrap();
        assert!(signal.valid);
        assert!((signal.value - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_signal_invalid_when_joint_weak_in_half_the_window() {
        let extractor = squat_extractor(Smoothing::MovingAverage { window: 4 });
        let mut buffer = FrameBuffer::new(4);
        buffer.push(leg_frame(0.0, (0.5, 0.7), 0.9));
        buffer.push(leg_frame(0.1, (0.5, 0.7), 0.9));
        buffer.push(leg_frame(0.2, (0.5, 0.7), 0.3));
        assert!(extractor.extract(&buffer).unwrap().valid);

        buffer.push(leg_frame(0.3, (0.5, 0.7), 0.3));
        let signal = extractor.extract(&buffer).unwrap();
        assert!(!signal.valid);
        assert_eq!(signal.timestamp, 0.3);
    }

    #[test]
    fn test_moving_average_suppresses_single_frame_jitter() {
        let extractor = squat_extractor(Smoothing::MovingAverage { window: 3 });
        let mut buffer = FrameBuffer::new(3);
        buffer.push(leg_frame(0.0, (0.5, 0.7), 0.9));
        buffer.push(leg_frame(0.1, (0.5, 0.7), 0.9));
        buffer.push(leg_frame(0.2, (0.7, 0.5), 0.9));
        let smoothed = extractor.extract(&buffer).unwrap().value;
        assert!(smoothed > 120.0, "smoothed angle {smoothed}");
    }

    #[test]
    fn test_empty_buffer_has_no_signal() {
        let extractor = squat_extractor(Smoothing::None);
        assert!(extractor.extract(&FrameBuffer::new(2)).is_none());
    }
}
