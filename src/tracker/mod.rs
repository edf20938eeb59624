//! Eye tracker devices
//!
//! This module abstracts the tracker SDK behind two traits: an API handle that
//! enumerates and opens devices, and a device handle that delivers queued gaze
//! points to a handler. The session only ever talks to these traits.

mod replay;

pub use replay::{ReplaySource, ReplayTracker};

use std::time::Duration;

use crate::error::TrainerError;
use crate::types::GazePoint;

/// Result of waiting for tracker callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Data is ready to be processed
    Ready,
    /// Nothing arrived within the timeout; the expected idle case
    TimedOut,
    /// The device will never deliver more data
    Exhausted,
}

/// Entry point of a tracker SDK
pub trait TrackerApi {
    /// List connected device URLs (may be empty)
    fn enumerate_devices(&self) -> Result<Vec<String>, TrainerError>;

    /// Open a device by URL; fails with `Connection` for unknown or busy devices
    fn open_device(&self, url: &str) -> Result<Box<dyn TrackerDevice>, TrainerError>;
}

/// An opened tracker device
pub trait TrackerDevice {
    /// URL the device was opened with
    fn url(&self) -> &str;

    fn subscribe_gaze(&mut self) -> Result<(), TrainerError>;

    fn unsubscribe_gaze(&mut self) -> Result<(), TrainerError>;

    /// Block until data is available or `timeout` elapses
    fn wait_for_callbacks(&mut self, timeout: Duration) -> Result<WaitOutcome, TrainerError>;

    /// Deliver queued gaze points to `handler`, returning how many were delivered
    fn process_callbacks(
        &mut self,
        handler: &mut dyn FnMut(GazePoint),
    ) -> Result<usize, TrainerError>;

    /// Release the device; further calls fail
    fn close(&mut self) -> Result<(), TrainerError>;
}
