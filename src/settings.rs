use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::{
    session::{AccuracyWeights, RetryPolicy},
    signal::{ProfileTable, Smoothing},
};

/// Engine-wide tuning. A session clones it at start and never sees later edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Keypoints below this confidence count as undetected.
    pub min_confidence: f64,
    /// Frames with fewer confident keypoints are dropped.
    pub min_keypoints: usize,
    /// Rolling buffer length used for smoothing and signal validity.
    pub buffer_len: usize,
    pub smoothing: Smoothing,
    /// Consecutive invalid frames before the session is presumed interrupted.
    pub max_invalid_frames: u32,
    pub retry: RetryPolicy,
    pub accuracy: AccuracyWeights,
    pub profiles: ProfileTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            min_keypoints: 4,
            buffer_len: 8,
            smoothing: Smoothing::default(),
            max_invalid_frames: 15,
            retry: RetryPolicy::default(),
            accuracy: AccuracyWeights::default(),
            profiles: ProfileTable::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            bail!("minConfidence {} must be within [0, 1]", self.min_confidence);
        }
        if self.buffer_len == 0 {
            bail!("bufferLen must be at least 1");
        }
        if let Smoothing::Exponential { alpha } = self.smoothing {
            if !(0.0..=1.0).contains(&alpha) || alpha == 0.0 {
                bail!("exponential smoothing alpha {alpha} must be within (0, 1]");
            }
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.maxAttempts must be at least 1");
        }
        self.profiles
            .validate()
            .map_err(|err| anyhow::anyhow!("invalid exercise profile: {err}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredSettings {
    engine: EngineConfig,
}

/// JSON-file backed settings. A missing or unreadable file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<StoredSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<StoredSettings>(&contents) {
                Ok(settings) if settings.engine.validate().is_ok() => settings,
                Ok(_) | Err(_) => {
                    warn!(
                        "Ignoring invalid settings at {}, using defaults",
                        path.display()
                    );
                    StoredSettings::default()
                }
            }
        } else {
            StoredSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineConfig {
        let guard = match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.engine.clone()
    }

    pub fn update_engine(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.engine = config;
        self.persist(&guard)
    }

    fn persist(&self, data: &StoredSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
