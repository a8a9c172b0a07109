use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{ExerciseType, FeedbackCategory};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_exercise(value: &str) -> Result<ExerciseType> {
    value
        .parse()
        .map_err(|err| anyhow!("stored activity has {err}"))
}

pub fn parse_category(value: &str) -> Result<FeedbackCategory> {
    match value {
        "form" => Ok(FeedbackCategory::Form),
        "pace" => Ok(FeedbackCategory::Pace),
        "achievement" => Ok(FeedbackCategory::Achievement),
        "warning" => Ok(FeedbackCategory::Warning),
        other => Err(anyhow!("unknown feedback category {other}")),
    }
}
