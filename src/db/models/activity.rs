use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ExerciseType, FeedbackEvent};

/// Stored activity, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub exercise_type: ExerciseType,
    pub count: u32,
    pub duration_secs: f64,
    pub calories: f64,
    pub accuracy: f64,
    pub feedback: Vec<FeedbackEvent>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivitySort {
    #[default]
    RecordedAt,
    Count,
    Calories,
    Duration,
    Accuracy,
}

impl ActivitySort {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            ActivitySort::RecordedAt => "recorded_at",
            ActivitySort::Count => "count",
            ActivitySort::Calories => "calories",
            ActivitySort::Duration => "duration_secs",
            ActivitySort::Accuracy => "accuracy",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityFilter {
    pub exercise_type: Option<ExerciseType>,
    pub sort: ActivitySort,
    pub direction: SortDirection,
    pub limit: Option<u32>,
    pub skip: u32,
}

/// Per-exercise totals for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub exercise_type: ExerciseType,
    pub sessions: u64,
    pub total_count: u64,
    pub total_calories: f64,
    pub total_duration_secs: f64,
    pub average_accuracy: f64,
}
