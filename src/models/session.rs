//! Session-level data handed back to callers and to the activity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExerciseType, FeedbackCategory, FeedbackEvent};
use crate::reps::{MotionKind, RepPhase};

/// What the UI polls for while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepSnapshot {
    pub phase: RepPhase,
    pub rep_count: u32,
    pub last_feedback: Option<FeedbackEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Performance {
    Excellent,
    Good,
    NeedsImprovement,
}

/// Final record of one session, produced when it ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub exercise_type: ExerciseType,
    pub kind: MotionKind,
    pub rep_count: u32,
    /// Span between the first and last accepted frame, in seconds.
    pub duration_secs: f64,
    /// Time spent in the held position (hold exercises only).
    pub hold_secs: f64,
    pub mean_confidence: f64,
    /// 0-100.
    pub accuracy: f64,
    pub pace_warnings: u32,
    pub total_frames: u64,
    pub valid_frames: u64,
    pub dropped_frames: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub feedback_events: Vec<FeedbackEvent>,
}

impl SessionSummary {
    pub fn performance(&self) -> Performance {
        if self.rep_count > 50 {
            Performance::Excellent
        } else if self.rep_count > 30 {
            Performance::Good
        } else {
            Performance::NeedsImprovement
        }
    }

    pub fn feedback_of(&self, category: FeedbackCategory) -> impl Iterator<Item = &FeedbackEvent> {
        self.feedback_events
            .iter()
            .filter(move |event| event.category == category)
    }
}

/// Payload of the activity store's "record activity" operation.
///
/// Calories are not part of it: the store derives them from `exercise_type`,
/// `count` and `duration_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub session_id: String,
    pub user_id: String,
    pub exercise_type: ExerciseType,
    /// Reps, or whole seconds held for hold exercises.
    pub count: u32,
    pub duration_secs: f64,
    pub accuracy: f64,
    pub feedback: Vec<FeedbackEvent>,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn from_summary(summary: &SessionSummary) -> Self {
        let count = match summary.kind {
            MotionKind::Hold => summary.hold_secs.max(0.0).floor() as u32,
            MotionKind::Reps => summary.rep_count,
        };

        Self {
            session_id: summary.session_id.clone(),
            user_id: summary.user_id.clone(),
            exercise_type: summary.exercise_type,
            count,
            duration_secs: summary.duration_secs,
            accuracy: summary.accuracy,
            feedback: summary.feedback_events.clone(),
            recorded_at: summary.ended_at,
        }
    }
}
