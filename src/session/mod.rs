//! Session layer: per-session pipelines, the multi-session manager and the
//! hand-off of finished sessions to the activity store.

mod accuracy;
pub(crate) mod aggregator;
mod manager;
mod retry;
pub(crate) mod sink;
mod source;

pub use accuracy::AccuracyWeights;
pub use aggregator::SessionAggregator;
pub use manager::SessionManager;
pub use retry::{persist_with_retry, RetryExhausted, RetryPolicy};
pub use sink::ActivitySink;
pub use source::{
    pump_frames, replay_session, FrameSource, JsonLinesSource, PumpReport, ReplayOutcome,
    VecFrameSource,
};
