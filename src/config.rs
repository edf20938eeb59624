//! TOML-based startup configuration.
//!
//! Holds everything the session treats as constant for its lifetime:
//! - Display size and boundary box geometry
//! - Punishment threshold and invalid-sample policy
//! - Tracker wait/idle timing and timestamp source
//! - Punishment sound
//!
//! Every field has a default; an empty file reproduces the stock setup
//! (full-screen box on a 3840x2160 display, 100 ms threshold).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::InvalidGazePolicy;
use crate::error::TrainerError;
use crate::geometry::BoundsResolver;
use crate::types::{BoundaryBox, DisplayConfig, NormalizedBounds};

/// Geometry validation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Reject boxes that fall outside the display or have no area
    #[serde(default = "default_true")]
    pub strict: bool,
}

/// Punishment trigger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunishmentConfig {
    /// Out-of-bounds time (ms) that must be exceeded before punishment starts
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: u64,
    /// Count invalid tracker data (e.g. closed eyes) as looking away
    #[serde(default = "default_true")]
    pub treat_invalid_as_out_of_bounds: bool,
}

/// Where sample arrival instants come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Stamp each sample when its callback is processed
    Arrival,
    /// Use the tracker's own timestamp (deterministic replays)
    Device,
}

/// Tracker polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Upper bound on a single wait for callbacks (ms)
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// Sleep after each processing pass (ms)
    #[serde(default)]
    pub idle_sleep_ms: u64,
    #[serde(default = "default_timestamp_source")]
    pub timestamps: TimestampSource,
}

/// Punishment sound settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// WAV file looped while punishing (requires the `audio` feature)
    #[serde(default)]
    pub sound_file: Option<PathBuf>,
    /// Ring the terminal bell when no sound file is played
    #[serde(default = "default_true")]
    pub bell: bool,
}

/// Complete startup configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub boundary_box: BoundaryBox,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub punishment: PunishmentConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_threshold_ms() -> u64 {
    100
}
fn default_wait_timeout_ms() -> u64 {
    100
}
fn default_timestamp_source() -> TimestampSource {
    TimestampSource::Arrival
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            strict: default_true(),
        }
    }
}

impl Default for PunishmentConfig {
    fn default() -> Self {
        Self {
            threshold_ms: default_threshold_ms(),
            treat_invalid_as_out_of_bounds: default_true(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout_ms(),
            idle_sleep_ms: 0,
            timestamps: default_timestamp_source(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sound_file: None,
            bell: default_true(),
        }
    }
}

impl TrainerConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, TrainerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TrainerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, TrainerError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, TrainerError> {
        let config: TrainerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the session meaningless.
    pub fn validate(&self) -> Result<(), TrainerError> {
        self.validate_settings()?;
        if self.geometry.strict {
            BoundsResolver::validate(&self.display, &self.boundary_box)?;
        }
        Ok(())
    }

    /// Display size and tracker timing, without the boundary box checks.
    pub fn validate_settings(&self) -> Result<(), TrainerError> {
        if !(self.display.width > 0.0 && self.display.height > 0.0) {
            return Err(TrainerError::Config(format!(
                "display size must be positive, got {}x{}",
                self.display.width, self.display.height
            )));
        }
        if self.tracker.wait_timeout_ms == 0 {
            return Err(TrainerError::Config(
                "tracker.wait_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Normalized bounds for the configured box.
    pub fn bounds(&self) -> NormalizedBounds {
        BoundsResolver::resolve(&self.display, &self.boundary_box)
    }

    pub fn invalid_policy(&self) -> InvalidGazePolicy {
        InvalidGazePolicy::from_flag(self.punishment.treat_invalid_as_out_of_bounds)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.tracker.wait_timeout_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.tracker.idle_sleep_ms)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, TrainerError> {
        toml::to_string_pretty(self).map_err(|e| TrainerError::Config(e.to_string()))
    }
}
