use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    error::RepError,
    ingest::KeypointIngest,
    models::{ExerciseType, FeedbackEvent, Frame, RepSnapshot, SessionSummary},
    reps::{MachineSettings, MotionKind, RepPhase, RepStateMachine, StepOutcome},
    settings::EngineConfig,
    signal::SignalExtractor,
};

use super::{AccuracyWeights, RetryPolicy};

/// One session's pipeline: ingest, signal extraction, rep machine and the
/// running totals that end up in the summary.
pub struct SessionAggregator {
    session_id: String,
    user_id: String,
    ingest: KeypointIngest,
    extractor: SignalExtractor,
    machine: RepStateMachine,
    accuracy: AccuracyWeights,
    retry: RetryPolicy,
    feedback: Vec<FeedbackEvent>,
    total_frames: u64,
    valid_frames: u64,
    dropped_frames: u64,
    confidence_sum: f64,
    first_timestamp: Option<f64>,
    last_timestamp: Option<f64>,
    hold_secs: f64,
    /// Whether the previous accepted frame produced a valid signal.
    previous_valid: bool,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl SessionAggregator {
    pub fn new(
        session_id: String,
        user_id: String,
        exercise: ExerciseType,
        config: &EngineConfig,
    ) -> Result<Self, RepError> {
        let extractor = SignalExtractor::for_exercise(
            exercise,
            &config.profiles,
            config.min_confidence,
            config.smoothing,
        )?;
        let profile = *extractor.profile();
        let machine = RepStateMachine::new(
            exercise,
            MachineSettings {
                thresholds: profile.thresholds,
                min_rep_secs: profile.min_rep_secs,
                max_invalid_frames: config.max_invalid_frames,
                kind: profile.kind,
            },
        );

        Ok(Self {
            session_id,
            user_id,
            ingest: KeypointIngest::new(
                config.min_confidence,
                config.min_keypoints,
                config.buffer_len,
            ),
            extractor,
            machine,
            accuracy: config.accuracy,
            retry: config.retry,
            feedback: Vec::new(),
            total_frames: 0,
            valid_frames: 0,
            dropped_frames: 0,
            confidence_sum: 0.0,
            first_timestamp: None,
            last_timestamp: None,
            hold_secs: 0.0,
            previous_valid: false,
            started_at: Utc::now(),
            finished: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn exercise(&self) -> ExerciseType {
        self.extractor.exercise()
    }

    pub fn motion_kind(&self) -> MotionKind {
        self.machine.settings().kind
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Feeds one frame through the pipeline.
    ///
    /// Frame-local errors count the frame as dropped and leave every other
    /// total untouched.
    pub fn ingest(&mut self, frame: Frame) -> Result<StepOutcome, RepError> {
        if self.finished {
            return Err(RepError::UnknownSession(self.session_id.clone()));
        }

        self.total_frames += 1;
        let buffer = match self.ingest.accept(frame) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.dropped_frames += 1;
                return Err(err);
            }
        };

        // The buffer holds at least the frame just accepted.
        let Some(signal) = self.extractor.extract(buffer) else {
            return Ok(StepOutcome::default());
        };

        let phase_before = self.machine.phase();
        let outcome = self.machine.update(&signal)?;

        if signal.valid {
            self.valid_frames += 1;
            self.confidence_sum += signal.confidence;
        }
        // Only intervals bounded by two valid frames count as held.
        if self.motion_kind() == MotionKind::Hold
            && signal.valid
            && self.previous_valid
            && phase_before == RepPhase::Top
            && self.machine.phase() == RepPhase::Top
        {
            if let Some(previous) = self.last_timestamp {
                self.hold_secs += signal.timestamp - previous;
            }
        }
        self.previous_valid = signal.valid;
        self.first_timestamp.get_or_insert(signal.timestamp);
        self.last_timestamp = Some(signal.timestamp);

        if outcome.rep_completed {
            debug!(
                "[{}] rep {} completed at {:.3}s",
                self.session_id,
                self.machine.rep_count(),
                signal.timestamp
            );
        }
        self.feedback.extend(outcome.feedback.iter().cloned());

        Ok(outcome)
    }

    pub fn snapshot(&self) -> RepSnapshot {
        RepSnapshot {
            phase: self.machine.phase(),
            rep_count: self.machine.rep_count(),
            last_feedback: self.feedback.last().cloned(),
        }
    }

    /// Closes the session and builds its summary. Later ingests are rejected.
    pub fn finish(&mut self) -> SessionSummary {
        self.finished = true;

        let accepted = self.total_frames - self.dropped_frames;
        let mean_confidence = if accepted == 0 {
            0.0
        } else {
            self.confidence_sum / accepted as f64
        };
        let duration_secs = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => (last - first).max(0.0),
            _ => 0.0,
        };
        let rep_count = self.machine.rep_count();
        let pace_warnings = self.machine.pace_warnings();

        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            exercise_type: self.exercise(),
            kind: self.motion_kind(),
            rep_count,
            duration_secs,
            hold_secs: self.hold_secs,
            mean_confidence,
            accuracy: self
                .accuracy
                .score(mean_confidence, self.valid_frames, rep_count, pace_warnings),
            pace_warnings,
            total_frames: self.total_frames,
            valid_frames: self.valid_frames,
            dropped_frames: self.dropped_frames,
            started_at: self.started_at,
            ended_at: Utc::now(),
            feedback_events: self.feedback.clone(),
        };

        info!(
            "Session {} finished: {} {} reps over {:.1}s ({} of {} frames dropped)",
            summary.session_id,
            summary.rep_count,
            summary.exercise_type,
            summary.duration_secs,
            summary.dropped_frames,
            summary.total_frames
        );

        summary
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    use crate::models::{Frame, Joint, Keypoint};
    use crate::signal::geometry::Point;

    /// Left-side squat pose whose hip-knee-ankle angle is `knee_deg`.
    pub fn squat_frame(timestamp: f64, knee_deg: f64) -> Frame {
        let knee = Point { x: 0.5, y: 0.6 };
        let ankle = Point { x: 0.5, y: 0.9 };
        let theta = (180.0 - knee_deg).to_radians();
        let hip = Point {
            x: knee.x + 0.3 * theta.sin(),
            y: knee.y - 0.3 * theta.cos(),
        };

        Frame::new(
            timestamp,
            [
                Keypoint::new(Joint::LeftShoulder, hip.x, hip.y - 0.3, 0.9),
                Keypoint::new(Joint::LeftHip, hip.x, hip.y, 0.9),
                Keypoint::new(Joint::LeftKnee, knee.x, knee.y, 0.9),
                Keypoint::new(Joint::LeftAnkle, ankle.x, ankle.y, 0.9),
                Keypoint::new(Joint::Nose, hip.x, hip.y - 0.45, 0.9),
            ],
        )
    }

    /// Knee angles for `reps` full squats, sampled `per_rep` times each.
    pub fn squat_angles(reps: usize, per_rep: usize) -> Vec<f64> {
        let mut angles = vec![170.0; 2];
        for _ in 0..reps {
            for i in 0..per_rep {
                let phase = i as f64 / per_rep as f64 * std::f64::consts::TAU;
                angles.push(125.0 + 45.0 * phase.cos());
            }
        }
        angles.push(170.0);
        angles
    }

    pub fn squat_session(reps: usize, fps: f64) -> Vec<Frame> {
        squat_angles(reps, 30)
            .into_iter()
            .enumerate()
            .map(|(i, angle)| squat_frame(i as f64 / fps, angle))
            .collect()
    }
}
