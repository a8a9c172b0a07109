use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use repcount::{
    db::Database,
    models::ExerciseType,
    session::{replay_session, JsonLinesSource, SessionManager},
    settings::{EngineConfig, SettingsStore},
    RepError,
};

/// Replays recorded pose frames through the rep counter and stores the result.
#[derive(Parser, Debug)]
#[command(name = "repcount", version)]
struct Args {
    /// Exercise name, e.g. squat, pushup, "bicep curls"
    exercise: String,

    /// Newline-delimited JSON frames
    frames: PathBuf,

    /// SQLite activity store
    #[arg(default_value = "repcount.sqlite3")]
    db_path: PathBuf,

    #[arg(default_value = "local")]
    user_id: String,

    /// Engine settings JSON; defaults apply when missing
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    repcount::init_logging();
    let args = Args::parse();

    let exercise: ExerciseType = args.exercise.parse()?;
    let config = match &args.settings {
        Some(path) => SettingsStore::new(path.clone())?.engine(),
        None => EngineConfig::default(),
    };

    let db = Database::new(args.db_path.clone())?;
    let manager = SessionManager::new(Arc::new(db), config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, finishing session");
                cancel.cancel();
            }
        });
    }

    let mut diagnostics = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(diagnostic) = diagnostics.recv().await {
            if let Ok(line) = serde_json::to_string(&diagnostic) {
                eprintln!("{line}");
            }
        }
    });

    let session_id = manager.start_session(&args.user_id, exercise, None)?;
    let mut source = JsonLinesSource::open(&args.frames).await?;

    let mut last_count = 0;
    let outcome = replay_session(&manager, &session_id, &mut source, &cancel, |snapshot| {
        if snapshot.rep_count != last_count {
            last_count = snapshot.rep_count;
            if let Ok(line) = serde_json::to_string(snapshot) {
                println!("{line}");
            }
        }
    })
    .await;
    if let Ok(report) = &outcome.pump {
        info!("Replayed {} frames", report.frames);
    }

    let stored = match outcome.ended {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            info!("Performance: {:?}", summary.performance());
            Ok(())
        }
        Err(RepError::PersistenceUnavailable {
            attempts,
            reason,
            summary,
        }) => {
            warn!("Activity not stored after {attempts} attempts: {reason}");
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Err(anyhow::anyhow!("activity store unavailable: {reason}"))
        }
        Err(err) => Err(err.into()),
    };

    outcome.pump.context("failed to replay frames")?;
    stored
}
