//! Queue settings
//!
//! Read from an optional file, then overridden by `LUMEN_*` environment
//! variables:
//!
//! ```text
//! repeat = "all"                      LUMEN_REPEAT=all
//! expand_to_siblings = true           LUMEN_EXPAND_TO_SIBLINGS=false
//! window_radius = 2                   LUMEN_WINDOW_RADIUS=3
//! sibling_batch_size = 64             LUMEN_SIBLING_BATCH_SIZE=128
//! previous_restart_threshold_ms = 5000
//! ```

use crate::error::{QueueError, Result};
use crate::expander::DEFAULT_BATCH_SIZE;
use crate::navigation::PREVIOUS_RESTART_THRESHOLD;
use crate::types::RepeatMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "LUMEN";

/// Largest accepted window radius
pub const MAX_WINDOW_RADIUS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueSettings {
    #[serde(default)]
    pub repeat: RepeatMode,

    /// Grow a single folder-backed entry into its folder
    #[serde(default = "default_expand_to_siblings")]
    pub expand_to_siblings: bool,

    /// Entries kept warm on each side of the current one
    #[serde(default = "default_window_radius")]
    pub window_radius: usize,

    /// Page size for sibling enumeration
    #[serde(default = "default_sibling_batch_size")]
    pub sibling_batch_size: usize,

    /// Played time after which "previous" restarts instead of moving back
    #[serde(default = "default_previous_restart_threshold_ms")]
    pub previous_restart_threshold_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            repeat: RepeatMode::default(),
            expand_to_siblings: default_expand_to_siblings(),
            window_radius: default_window_radius(),
            sibling_batch_size: default_sibling_batch_size(),
            previous_restart_threshold_ms: default_previous_restart_threshold_ms(),
        }
    }
}

impl QueueSettings {
    /// Load settings from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::build(path, None)
    }

    fn build(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(QueueError::Config(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Self = builder
            .build()
            .map_err(|e| QueueError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| QueueError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.window_radius > MAX_WINDOW_RADIUS {
            return Err(QueueError::Config(format!(
                "window_radius {} exceeds maximum of {}",
                self.window_radius, MAX_WINDOW_RADIUS
            )));
        }

        if self.sibling_batch_size == 0 {
            return Err(QueueError::Config(
                "sibling_batch_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn previous_restart_threshold(&self) -> Duration {
        Duration::from_millis(self.previous_restart_threshold_ms)
    }
}

// Default values
fn default_expand_to_siblings() -> bool {
    true
}

fn default_window_radius() -> usize {
    2
}

fn default_sibling_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_previous_restart_threshold_ms() -> u64 {
    u64::try_from(PREVIOUS_RESTART_THRESHOLD.as_millis()).unwrap_or(u64::MAX)
}
