//! Error taxonomy for the rep-counting pipeline.
//!
//! Frame-local errors (`InsufficientKeypoints`, `OutOfOrderFrame`) drop the
//! offending frame and leave session state untouched; they are reported on the
//! diagnostic channel rather than ending the session. `UnsupportedExerciseType`,
//! `InvalidConfig` and an exhausted `PersistenceUnavailable` are surfaced to
//! the caller.

use thiserror::Error;

use crate::models::SessionSummary;

#[derive(Debug, Error)]
pub enum RepError {
    #[error("frame has {found} confident keypoints, at least {required} required")]
    InsufficientKeypoints { found: usize, required: usize },

    #[error("unsupported exercise type '{0}'")]
    UnsupportedExerciseType(String),

    #[error("frame timestamp {timestamp} is not after last accepted timestamp {last}")]
    OutOfOrderFrame { timestamp: f64, last: f64 },

    /// The summary is kept so the caller can resubmit it.
    #[error("activity store unavailable after {attempts} attempts: {reason}")]
    PersistenceUnavailable {
        attempts: u32,
        reason: String,
        summary: Box<SessionSummary>,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown session '{0}'")]
    UnknownSession(String),

    #[error("user '{user_id}' already has active session '{session_id}'")]
    SessionAlreadyActive { user_id: String, session_id: String },
}

impl RepError {
    /// Recoverable errors that only affect the frame being ingested.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            RepError::InsufficientKeypoints { .. } | RepError::OutOfOrderFrame { .. }
        )
    }

    /// Summary preserved by a failed persistence attempt, if any.
    pub fn into_unsaved_summary(self) -> Option<SessionSummary> {
        match self {
            RepError::PersistenceUnavailable { summary, .. } => Some(*summary),
            _ => None,
        }
    }
}
