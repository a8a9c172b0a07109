use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Form,
    Pace,
    Achievement,
    Warning,
}

impl FeedbackCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackCategory::Form => "form",
            FeedbackCategory::Pace => "pace",
            FeedbackCategory::Achievement => "achievement",
            FeedbackCategory::Warning => "warning",
        }
    }
}

/// Coaching message raised while a session runs. Append-only per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// Frame-clock timestamp the event was raised at.
    pub timestamp: f64,
    pub category: FeedbackCategory,
    pub message: String,
}

impl FeedbackEvent {
    pub fn new(timestamp: f64, category: FeedbackCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            category,
            message: message.into(),
        }
    }
}
