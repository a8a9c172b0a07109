//! Non-fatal diagnostic channel.
//!
//! Frame-local rejections, tracking loss and persistence retries are
//! broadcast here instead of failing the caller. Subscribers that fall behind
//! lose the oldest events.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::RepError;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    InsufficientKeypoints,
    OutOfOrderFrame,
    TrackingLost,
    PersistenceRetry,
    PersistenceFailed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub session_id: String,
    pub kind: DiagnosticKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Diagnostics {
    sender: broadcast::Sender<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
        self.sender.subscribe()
    }

    pub fn publish(&self, session_id: &str, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            session_id: session_id.to_string(),
            kind,
            message: message.into(),
            at: Utc::now(),
        };

        match kind {
            DiagnosticKind::InsufficientKeypoints | DiagnosticKind::OutOfOrderFrame => {
                debug!("[{}] {}", diagnostic.session_id, diagnostic.message)
            }
            _ => warn!("[{}] {}", diagnostic.session_id, diagnostic.message),
        }

        // No subscribers is fine.
        let _ = self.sender.send(diagnostic);
    }

    /// Reports a frame-local error. Other errors are ignored.
    pub fn report_frame_error(&self, session_id: &str, err: &RepError) {
        let kind = match err {
            RepError::InsufficientKeypoints { .. } => DiagnosticKind::InsufficientKeypoints,
            RepError::OutOfOrderFrame { .. } => DiagnosticKind::OutOfOrderFrame,
            _ => return,
        };
        self.publish(session_id, kind, err.to_string());
    }
}
