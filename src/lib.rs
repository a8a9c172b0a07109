//! Real-time repetition counting from pose keypoints.
//!
//! Frames flow through [`ingest`] into [`signal`] extraction and the
//! [`reps`] state machine; [`session`] owns the per-user pipelines and hands
//! finished sessions to the [`db`] activity store.

pub mod db;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod models;
pub mod reps;
pub mod session;
pub mod settings;
pub mod signal;

pub use error::RepError;

/// Initializes `env_logger`. `RUST_LOG` wins when set; otherwise the level is
/// `info`, or `debug` with `REPCOUNT_DEBUG=1`.
pub fn init_logging() {
    let debug_mode = std::env::var("REPCOUNT_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug_mode { "debug" } else { "info" };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}
