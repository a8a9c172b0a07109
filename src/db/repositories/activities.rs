use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    db::{
        connection::Database,
        helpers::{parse_category, parse_datetime, parse_exercise, to_u32, to_u64},
        models::{Activity, ActivityFilter, ActivityStats},
    },
    models::{ActivityRecord, FeedbackEvent},
    session::ActivitySink,
};

const ACTIVITY_COLUMNS: &str = "id, session_id, user_id, type, count, duration_secs, calories, accuracy, recorded_at, created_at";

fn row_to_activity(row: &Row) -> Result<Activity> {
    let exercise: String = row.get("type")?;
    let count: i64 = row.get("count")?;
    let recorded_at: String = row.get("recorded_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(Activity {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        user_id: row.get("user_id")?,
        exercise_type: parse_exercise(&exercise)?,
        count: to_u32(count, "count")?,
        duration_secs: row.get("duration_secs")?,
        calories: row.get("calories")?,
        accuracy: row.get("accuracy")?,
        feedback: Vec::new(),
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn load_feedback(conn: &Connection, activity_id: &str) -> Result<Vec<FeedbackEvent>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, category, message
         FROM activity_feedback
         WHERE activity_id = ?1
         ORDER BY position ASC",
    )?;
    let mut rows = stmt.query(params![activity_id])?;

    let mut feedback = Vec::new();
    while let Some(row) = rows.next()? {
        let category: String = row.get("category")?;
        feedback.push(FeedbackEvent {
            timestamp: row.get("timestamp")?,
            category: parse_category(&category)?,
            message: row.get("message")?,
        });
    }
    Ok(feedback)
}

impl Database {
    /// Stores a finished session. Recording the same `session_id` twice
    /// returns the id of the existing activity.
    pub async fn record_activity(&self, record: &ActivityRecord) -> Result<String> {
        let record = record.clone();
        let calories = self.calories().estimate(record.exercise_type, record.count);

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM activities WHERE session_id = ?1",
                    params![record.session_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                debug!(
                    "Session {} already recorded as activity {}",
                    record.session_id, id
                );
                return Ok(id);
            }

            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO activities (id, session_id, user_id, type, count, duration_secs, calories, accuracy, recorded_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    record.session_id,
                    record.user_id,
                    record.exercise_type.as_str(),
                    i64::from(record.count),
                    record.duration_secs.max(0.0),
                    calories,
                    record.accuracy.clamp(0.0, 100.0),
                    record.recorded_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("failed to insert activity")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO activity_feedback (activity_id, position, timestamp, category, message)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (position, event) in record.feedback.iter().enumerate() {
                    stmt.execute(params![
                        id,
                        position as i64,
                        event.timestamp,
                        event.category.as_str(),
                        event.message,
                    ])
                    .context("failed to insert activity feedback")?;
                }
            }

            tx.commit().context("failed to commit activity")?;
            info!(
                "Recorded {} x{} for user {} as activity {}",
                record.exercise_type, record.count, record.user_id, id
            );
            Ok(id)
        })
        .await
    }

    /// Activity `id` if it belongs to `user_id`.
    pub async fn get_activity(&self, id: &str, user_id: &str) -> Result<Option<Activity>> {
        let id = id.to_string();
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1 AND user_id = ?2"
            ))?;
            let mut rows = stmt.query(params![id, user_id])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };

            let mut activity = row_to_activity(row)?;
            activity.feedback = load_feedback(conn, &activity.id)?;
            Ok(Some(activity))
        })
        .await
    }

    pub async fn list_activities(
        &self,
        user_id: &str,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>> {
        let user_id = user_id.to_string();
        let filter = filter.clone();
        self.execute(move |conn| {
            // Column and direction come from enums, never from input text.
            let sql = format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities
                 WHERE user_id = ?1 AND (?2 IS NULL OR type = ?2)
                 ORDER BY {} {}, id ASC
                 LIMIT ?3 OFFSET ?4",
                filter.sort.column(),
                filter.direction.keyword()
            );
            let limit = filter.limit.map_or(-1, i64::from);

            let mut activities = {
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params![
                    user_id,
                    filter.exercise_type.map(|exercise| exercise.as_str()),
                    limit,
                    i64::from(filter.skip),
                ])?;

                let mut activities = Vec::new();
                while let Some(row) = rows.next()? {
                    activities.push(row_to_activity(row)?);
                }
                activities
            };

            for activity in &mut activities {
                activity.feedback = load_feedback(conn, &activity.id)?;
            }
            Ok(activities)
        })
        .await
    }

    /// Per-exercise totals for `user_id`, ordered by exercise name.
    pub async fn activity_stats(&self, user_id: &str) -> Result<Vec<ActivityStats>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT type,
                        COUNT(*) AS sessions,
                        SUM(count) AS total_count,
                        SUM(calories) AS total_calories,
                        SUM(duration_secs) AS total_duration_secs,
                        AVG(accuracy) AS average_accuracy
                 FROM activities
                 WHERE user_id = ?1
                 GROUP BY type
                 ORDER BY type ASC",
            )?;
            let mut rows = stmt.query(params![user_id])?;

            let mut stats = Vec::new();
            while let Some(row) = rows.next()? {
                let exercise: String = row.get("type")?;
                let sessions: i64 = row.get("sessions")?;
                let total_count: i64 = row.get("total_count")?;
                stats.push(ActivityStats {
                    exercise_type: parse_exercise(&exercise)?,
                    sessions: to_u64(sessions, "sessions")?,
                    total_count: to_u64(total_count, "total_count")?,
                    total_calories: row.get("total_calories")?,
                    total_duration_secs: row.get("total_duration_secs")?,
                    average_accuracy: row.get("average_accuracy")?,
                });
            }
            Ok(stats)
        })
        .await
    }
}

#[async_trait]
impl ActivitySink for Database {
    async fn record_activity(&self, record: &ActivityRecord) -> Result<String> {
        Database::record_activity(self, record).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        db::models::{ActivitySort, SortDirection},
        models::{ExerciseType, FeedbackCategory},
    };

    fn record(session_id: &str, user_id: &str, exercise: ExerciseType, count: u32) -> ActivityRecord {
        ActivityRecord {
            session_id: session_id.into(),
            user_id: user_id.into(),
            exercise_type: exercise,
            count,
            duration_secs: f64::from(count) * 2.0,
            accuracy: 80.0,
            feedback: vec![
                FeedbackEvent::new(1.5, FeedbackCategory::Form, "Go deeper, partial rep not counted"),
                FeedbackEvent::new(3.0, FeedbackCategory::Pace, "Rep too fast"),
            ],
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
                + Duration::minutes(i64::from(count)),
        }
    }

    #[tokio::test]
    async fn test_record_and_fetch() {
        let db = Database::in_memory().unwrap();
        let id = db
            .record_activity(&record("s1", "u1", ExerciseType::Squat, 10))
            .await
            .unwrap();

        let activity = db.get_activity(&id, "u1").await.unwrap().unwrap();
        assert_eq!(activity.session_id, "s1");
        assert_eq!(activity.exercise_type, ExerciseType::Squat);
        assert_eq!(activity.count, 10);
        assert!((activity.calories - 3.2).abs() < 1e-9);
        assert_eq!(activity.feedback.len(), 2);
        assert_eq!(activity.feedback[0].category, FeedbackCategory::Form);
        assert_eq!(activity.feedback[1].message, "Rep too fast");

        assert!(db.get_activity(&id, "someone-else").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_is_idempotent_per_session() {
        let db = Database::in_memory().unwrap();
        let first = db
            .record_activity(&record("s1", "u1", ExerciseType::Pushup, 5))
            .await
            .unwrap();
        let second = db
            .record_activity(&record("s1", "u1", ExerciseType::Pushup, 5))
            .await
            .unwrap();
        assert_eq!(first, second);

        let all = db
            .list_activities("u1", &ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filter_sort_and_page() {
        let db = Database::in_memory().unwrap();
        for (session, exercise, count) in [
            ("s1", ExerciseType::Squat, 12),
            ("s2", ExerciseType::Pushup, 20),
            ("s3", ExerciseType::Squat, 5),
            ("s4", ExerciseType::Squat, 30),
        ] {
            db.record_activity(&record(session, "u1", exercise, count))
                .await
                .unwrap();
        }
        db.record_activity(&record("other", "u2", ExerciseType::Squat, 99))
            .await
            .unwrap();

        let squats = db
            .list_activities(
                "u1",
                &ActivityFilter {
                    exercise_type: Some(ExerciseType::Squat),
                    sort: ActivitySort::Count,
                    direction: SortDirection::Asc,
                    ..ActivityFilter::default()
                },
            )
            .await
            .unwrap();
        let counts: Vec<u32> = squats.iter().map(|a| a.count).collect();
        assert_eq!(counts, vec![5, 12, 30]);

        let page = db
            .list_activities(
                "u1",
                &ActivityFilter {
                    limit: Some(2),
                    skip: 1,
                    ..ActivityFilter::default()
                },
            )
            .await
            .unwrap();
        // Newest first: 30, 20, 12, 5 minutes after the base time.
        let sessions: Vec<&str> = page.iter().map(|a| a.session_id.as_str()).collect();
        assert_eq!(sessions, vec!["s2", "s1"]);
    }

    #[tokio::test]
    async fn test_stats_per_exercise() {
        let db = Database::in_memory().unwrap();
        db.record_activity(&record("s1", "u1", ExerciseType::Squat, 10))
            .await
            .unwrap();
        db.record_activity(&record("s2", "u1", ExerciseType::Squat, 20))
            .await
            .unwrap();
        db.record_activity(&record("s3", "u1", ExerciseType::Burpee, 4))
            .await
            .unwrap();

        let stats = db.activity_stats("u1").await.unwrap();
        assert_eq!(stats.len(), 2);

        let burpee = &stats[0];
        assert_eq!(burpee.exercise_type, ExerciseType::Burpee);
        assert_eq!(burpee.total_count, 4);
        assert!((burpee.total_calories - 2.0).abs() < 1e-9);

        let squat = &stats[1];
        assert_eq!(squat.sessions, 2);
        assert_eq!(squat.total_count, 30);
        assert!((squat.total_duration_secs - 60.0).abs() < 1e-9);
        assert!((squat.average_accuracy - 80.0).abs() < 1e-9);

        assert!(db.activity_stats("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sink_end_to_end() {
        use std::sync::Arc;

        use crate::{
            session::{aggregator::test_frames::squat_session, SessionManager},
            settings::EngineConfig,
        };

        let db = Database::in_memory().unwrap();
        let manager = SessionManager::new(Arc::new(db.clone()), EngineConfig::default());
        let id = manager
            .start_session("u1", ExerciseType::Squat, None)
            .unwrap();
        for frame in squat_session(4, 20.0) {
            manager.ingest(&id, frame).await.unwrap();
        }
        let summary = manager.end_session(&id).await.unwrap();

        let activities = db
            .list_activities("u1", &ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].session_id, id);
        assert_eq!(activities[0].count, summary.rep_count);
        assert!((activities[0].accuracy - summary.accuracy).abs() < 1e-9);
    }
}
