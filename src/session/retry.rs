use std::time::Duration;

use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::ActivitySink;
use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    models::ActivityRecord,
};

/// Bounded exponential backoff for activity persistence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    /// Adds up to 25% random delay on top of each backoff.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the delay after the `failed_attempt`-th failure (1-based).
    pub fn base_backoff(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }

    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let base = self.base_backoff(failed_attempt);
        if !self.jitter {
            return base;
        }
        let spread = base.as_millis() as u64 / 4;
        let extra = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        base + Duration::from_millis(extra)
    }
}

#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: anyhow::Error,
}

/// Records an activity, retrying failures per `policy` until it succeeds,
/// attempts run out, or `cancel` fires.
pub async fn persist_with_retry(
    sink: &dyn ActivitySink,
    record: &ActivityRecord,
    policy: &RetryPolicy,
    diagnostics: &Diagnostics,
    cancel: &CancellationToken,
) -> Result<String, RetryExhausted> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match sink.record_activity(record).await {
            Ok(activity_id) => {
                info!(
                    "Recorded activity {} for session {} (attempt {})",
                    activity_id, record.session_id, attempt
                );
                return Ok(activity_id);
            }
            Err(err) => err,
        };

        if attempt >= max_attempts {
            return Err(RetryExhausted {
                attempts: attempt,
                last_error: err,
            });
        }

        let delay = policy.backoff(attempt);
        diagnostics.publish(
            &record.session_id,
            DiagnosticKind::PersistenceRetry,
            format!(
                "record activity attempt {attempt}/{max_attempts} failed: {err:#}; retrying in {}ms",
                delay.as_millis()
            ),
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                warn!("Persistence retries for session {} cancelled", record.session_id);
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: err.context("retries cancelled by shutdown"),
                });
            }
        }
    }
}
