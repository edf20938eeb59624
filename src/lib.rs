//! Gaze Trainer - eye-tracker driven focus trainer
//!
//! Gaze Trainer watches where the user is looking and plays a looping
//! deterrent when gaze stays outside a configured screen region for too long.
//! Each gaze point flows through a small synchronous pipeline:
//! arrival stamping → classification against normalized bounds → distraction
//! timing → punishment actuator.
//!
//! ## Modules
//!
//! - **Geometry**: resolve the boundary box into normalized bounds
//! - **Classifier**: in bounds / out of bounds / ignored per sample
//! - **Distraction**: accumulate out-of-bounds time and drive the actuator
//! - **Tracker**: device abstraction plus an NDJSON replay device
//! - **Monitor**: the per-sample pipeline and the session loop

pub mod actuator;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod distraction;
pub mod error;
pub mod geometry;
pub mod monitor;
pub mod stats;
pub mod tracker;
pub mod types;

pub use actuator::{Actuator, ConsoleActuator};
pub use classifier::{classify, GazeClassifier, InvalidGazePolicy};
pub use clock::{Clock, MonotonicClock};
pub use config::TrainerConfig;
pub use distraction::{DistractionState, DistractionTimer};
pub use error::TrainerError;
pub use geometry::BoundsResolver;
pub use monitor::{GazeMonitor, Session, SessionOutcome};
pub use stats::{SessionStats, SessionSummary};
pub use tracker::{ReplaySource, ReplayTracker, TrackerApi, TrackerDevice, WaitOutcome};

#[cfg(feature = "audio")]
pub use actuator::LoopingSound;

/// Crate version reported by the CLI
pub const TRAINER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program name used in reports
pub const PROGRAM_NAME: &str = "gaze-trainer";
