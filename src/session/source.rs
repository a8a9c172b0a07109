use std::{collections::VecDeque, path::Path};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
};
use tokio_util::sync::CancellationToken;

use super::SessionManager;
use crate::{
    error::RepError,
    models::{Frame, RepSnapshot, SessionSummary},
};

/// Anything that produces pose frames: a camera pipeline, a recording, a test.
#[async_trait]
pub trait FrameSource: Send {
    /// `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Replays frames held in memory.
pub struct VecFrameSource {
    frames: VecDeque<Frame>,
}

impl VecFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FrameSource for VecFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

/// Newline-delimited JSON frames. Blank lines are ignored and malformed lines
/// are logged and skipped.
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl JsonLinesSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open frame file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FrameSource for JsonLinesSource<R> {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("Failed to read frame line")?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Frame>(trimmed) {
                Ok(frame) => return Ok(Some(frame)),
                Err(err) => warn!("Skipping malformed frame on line {}: {}", self.line_no, err),
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpReport {
    pub frames: u64,
    pub cancelled: bool,
    pub last_snapshot: Option<RepSnapshot>,
}

/// Feeds `source` into a session until the source runs dry or `cancel`
/// fires. `on_snapshot` sees the snapshot after every frame.
///
/// The session is left open; ending it is the caller's call.
pub async fn pump_frames<S, F>(
    manager: &SessionManager,
    session_id: &str,
    source: &mut S,
    cancel: &CancellationToken,
    mut on_snapshot: F,
) -> Result<PumpReport>
where
    S: FrameSource + ?Sized,
    F: FnMut(&RepSnapshot),
{
    let mut report = PumpReport::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Frame pump for session {} cancelled", session_id);
                report.cancelled = true;
                break;
            }
            next = source.next_frame() => next?,
        };

        let Some(frame) = next else {
            debug!("Frame source for session {} exhausted", session_id);
            break;
        };

        let snapshot = manager.ingest(session_id, frame).await?;
        report.frames += 1;
        on_snapshot(&snapshot);
        report.last_snapshot = Some(snapshot);
    }

    Ok(report)
}

/// Result of [`replay_session`]: how the pump went and how the session ended.
pub struct ReplayOutcome {
    pub pump: Result<PumpReport>,
    pub ended: Result<SessionSummary, RepError>,
}

/// Pumps `source` into the session, then ends it. The session is ended even
/// when the source fails part-way, so reps already counted are summarized and
/// recorded.
pub async fn replay_session<S, F>(
    manager: &SessionManager,
    session_id: &str,
    source: &mut S,
    cancel: &CancellationToken,
    on_snapshot: F,
) -> ReplayOutcome
where
    S: FrameSource + ?Sized,
    F: FnMut(&RepSnapshot),
{
    let pump = pump_frames(manager, session_id, source, cancel, on_snapshot).await;
    if let Err(err) = &pump {
        warn!(
            "Frame pump for session {} failed, ending session: {:#}",
            session_id, err
        );
    }
    let ended = manager.end_session(session_id).await;
    ReplayOutcome { pump, ended }
}
