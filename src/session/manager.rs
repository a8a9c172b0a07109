use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard},
};

use log::{error, info};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    error::RepError,
    models::{ActivityRecord, ExerciseType, Frame, Keypoint, RepSnapshot, SessionSummary},
    reps::RepPhase,
    settings::EngineConfig,
};

use super::{persist_with_retry, ActivitySink, RetryPolicy, SessionAggregator};

#[derive(Default)]
struct Registry {
    sessions: HashMap<String, Arc<Mutex<SessionAggregator>>>,
    /// user id -> session id
    active_by_user: HashMap<String, String>,
}

/// Owns every running session and the hand-off to the activity store.
///
/// The registry lock is only held for lookups; each session has its own async
/// mutex so frames of one session are processed strictly in order while
/// different sessions proceed independently.
#[derive(Clone)]
pub struct SessionManager {
    registry: Arc<StdMutex<Registry>>,
    sink: Arc<dyn ActivitySink>,
    config: Arc<EngineConfig>,
    diagnostics: Diagnostics,
    unsaved: Arc<StdMutex<Vec<SessionSummary>>>,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(sink: Arc<dyn ActivitySink>, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(StdMutex::new(Registry::default())),
            sink,
            config: Arc::new(config),
            diagnostics: Diagnostics::default(),
            unsaved: Arc::new(StdMutex::new(Vec::new())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Diagnostic> {
        self.diagnostics.subscribe()
    }

    /// Starts a session for `user_id`. `config` overrides the manager's
    /// defaults for this session only.
    pub fn start_session(
        &self,
        user_id: &str,
        exercise: ExerciseType,
        config: Option<EngineConfig>,
    ) -> Result<String, RepError> {
        let mut registry = self.registry();
        if let Some(existing) = registry.active_by_user.get(user_id) {
            return Err(RepError::SessionAlreadyActive {
                user_id: user_id.to_string(),
                session_id: existing.clone(),
            });
        }

        let config = config.as_ref().unwrap_or(&*self.config);
        config
            .validate()
            .map_err(|err| RepError::InvalidConfig(format!("{err:#}")))?;

        let session_id = Uuid::new_v4().to_string();
        let aggregator =
            SessionAggregator::new(session_id.clone(), user_id.to_string(), exercise, config)?;

        registry
            .sessions
            .insert(session_id.clone(), Arc::new(Mutex::new(aggregator)));
        registry
            .active_by_user
            .insert(user_id.to_string(), session_id.clone());

        info!(
            "Started {} session {} for user {}",
            exercise, session_id, user_id
        );
        Ok(session_id)
    }

    /// Like [`start_session`](Self::start_session) but takes the exercise as
    /// free text, e.g. from a request body.
    pub fn start_session_named(
        &self,
        user_id: &str,
        exercise: &str,
        config: Option<EngineConfig>,
    ) -> Result<String, RepError> {
        let exercise: ExerciseType = exercise.parse()?;
        self.start_session(user_id, exercise, config)
    }

    /// Routes one frame through the session's pipeline.
    ///
    /// Frame-local rejections go to the diagnostic channel and the unchanged
    /// snapshot is returned.
    pub async fn ingest(&self, session_id: &str, frame: Frame) -> Result<RepSnapshot, RepError> {
        let session = self.lookup(session_id)?;
        let mut aggregator = session.lock().await;

        match aggregator.ingest(frame) {
            Ok(outcome) => {
                if outcome
                    .transitions
                    .last()
                    .is_some_and(|(_, to)| *to == RepPhase::Idle)
                {
                    let message = outcome
                        .feedback
                        .last()
                        .map(|event| event.message.clone())
                        .unwrap_or_else(|| "tracking lost".to_string());
                    self.diagnostics
                        .publish(session_id, DiagnosticKind::TrackingLost, message);
                }
            }
            Err(err) if err.is_frame_local() => {
                self.diagnostics.report_frame_error(session_id, &err);
            }
            Err(err) => return Err(err),
        }

        Ok(aggregator.snapshot())
    }

    pub async fn ingest_frame(
        &self,
        session_id: &str,
        timestamp: f64,
        keypoints: impl IntoIterator<Item = Keypoint>,
    ) -> Result<RepSnapshot, RepError> {
        self.ingest(session_id, Frame::new(timestamp, keypoints))
            .await
    }

    pub async fn get_state(&self, session_id: &str) -> Result<RepSnapshot, RepError> {
        let session = self.lookup(session_id)?;
        let aggregator = session.lock().await;
        Ok(aggregator.snapshot())
    }

    /// Session ids currently running.
    pub fn active_sessions(&self) -> Vec<String> {
        self.registry().sessions.keys().cloned().collect()
    }

    /// Ends the session and records it, retrying per the session's policy.
    ///
    /// The user can start a new session as soon as this is called; only the
    /// caller waits on persistence. If every attempt fails the summary comes
    /// back inside `PersistenceUnavailable`.
    pub async fn end_session(&self, session_id: &str) -> Result<SessionSummary, RepError> {
        let (summary, policy) = self.close(session_id).await?;
        let record = ActivityRecord::from_summary(&summary);

        match persist_with_retry(
            self.sink.as_ref(),
            &record,
            &policy,
            &self.diagnostics,
            &self.shutdown,
        )
        .await
        {
            Ok(_) => Ok(summary),
            Err(exhausted) => {
                let reason = format!("{:#}", exhausted.last_error);
                self.diagnostics.publish(
                    session_id,
                    DiagnosticKind::PersistenceFailed,
                    format!("gave up after {} attempts: {reason}", exhausted.attempts),
                );
                Err(RepError::PersistenceUnavailable {
                    attempts: exhausted.attempts,
                    reason,
                    summary: Box::new(summary),
                })
            }
        }
    }

    /// Ends the session and returns its summary at once; persistence runs on
    /// a background task. Summaries that cannot be stored are parked for
    /// [`take_unsaved`](Self::take_unsaved).
    pub async fn end_session_detached(
        &self,
        session_id: &str,
    ) -> Result<(SessionSummary, JoinHandle<()>), RepError> {
        let (summary, policy) = self.close(session_id).await?;
        let handle = self.spawn_persist(summary.clone(), policy);
        Ok((summary, handle))
    }

    /// Drains the summaries whose persistence was abandoned.
    pub fn take_unsaved(&self) -> Vec<SessionSummary> {
        std::mem::take(&mut *self.unsaved())
    }

    /// Tries once more to record a summary that previously failed.
    pub async fn resubmit(&self, summary: SessionSummary) -> Result<String, RepError> {
        let record = ActivityRecord::from_summary(&summary);
        persist_with_retry(
            self.sink.as_ref(),
            &record,
            &self.config.retry,
            &self.diagnostics,
            &self.shutdown,
        )
        .await
        .map_err(|exhausted| RepError::PersistenceUnavailable {
            attempts: exhausted.attempts,
            reason: format!("{:#}", exhausted.last_error),
            summary: Box::new(summary),
        })
    }

    /// Cancels pending persistence retries. Summaries they were carrying end
    /// up in the unsaved queue or in the caller's error.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn spawn_persist(&self, summary: SessionSummary, policy: RetryPolicy) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let diagnostics = self.diagnostics.clone();
        let unsaved = Arc::clone(&self.unsaved);
        let cancel = self.shutdown.clone();

        tokio::spawn(async move {
            let record = ActivityRecord::from_summary(&summary);
            if let Err(exhausted) =
                persist_with_retry(sink.as_ref(), &record, &policy, &diagnostics, &cancel).await
            {
                error!(
                    "Failed to record session {} after {} attempts: {:#}",
                    summary.session_id, exhausted.attempts, exhausted.last_error
                );
                diagnostics.publish(
                    &summary.session_id,
                    DiagnosticKind::PersistenceFailed,
                    format!(
                        "summary kept for resubmission: {:#}",
                        exhausted.last_error
                    ),
                );
                let mut queue = match unsaved.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                queue.push(summary);
            }
        })
    }

    /// Removes the session from the registry, then waits for any in-flight
    /// frame before building the summary.
    async fn close(&self, session_id: &str) -> Result<(SessionSummary, RetryPolicy), RepError> {
        let session = {
            let mut registry = self.registry();
            let session = registry
                .sessions
                .remove(session_id)
                .ok_or_else(|| RepError::UnknownSession(session_id.to_string()))?;
            registry
                .active_by_user
                .retain(|_, active| active.as_str() != session_id);
            session
        };

        let mut aggregator = session.lock().await;
        let summary = aggregator.finish();
        Ok((summary, *aggregator.retry_policy()))
    }

    fn lookup(&self, session_id: &str) -> Result<Arc<Mutex<SessionAggregator>>, RepError> {
        self.registry()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RepError::UnknownSession(session_id.to_string()))
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn unsaved(&self) -> MutexGuard<'_, Vec<SessionSummary>> {
        match self.unsaved.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
