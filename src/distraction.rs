//! Distraction timing
//!
//! This module tracks how long gaze has been out of bounds and drives the
//! punishment actuator with hysteresis:
//! - punishment starts once accumulated out-of-bounds time exceeds the threshold
//! - punishment stops on the very next in-bounds sample, however long it ran
//!
//! Elapsed time is measured from the previous classified sample, not from the
//! last in-bounds sample. A bad sample right after a good one therefore counts
//! the whole gap between them as distraction time.

use std::time::Duration;

use tracing::{debug, info};

use crate::actuator::Actuator;
use crate::error::TrainerError;
use crate::types::{ActuatorCommand, GazeVerdict};

/// Mutable distraction state, one per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistractionState {
    /// Arrival instant of the previous classified sample (run start before the first)
    pub last_poll_time: Duration,
    /// Out-of-bounds time since the last in-bounds sample (ms)
    pub accumulated_bad_ms: u64,
    /// Whether the actuator is currently looping
    pub punishing: bool,
}

impl DistractionState {
    pub fn new(run_start: Duration) -> Self {
        Self {
            last_poll_time: run_start,
            accumulated_bad_ms: 0,
            punishing: false,
        }
    }
}

/// Two-state machine (calm / punishing) owning the state and the actuator
pub struct DistractionTimer<A: Actuator> {
    state: DistractionState,
    threshold_ms: u64,
    actuator: A,
}

impl<A: Actuator> DistractionTimer<A> {
    /// Create a timer whose first elapsed interval is measured from `run_start`
    pub fn new(threshold_ms: u64, actuator: A, run_start: Duration) -> Self {
        Self {
            state: DistractionState::new(run_start),
            threshold_ms,
            actuator,
        }
    }

    pub fn state(&self) -> &DistractionState {
        &self.state
    }

    pub fn is_punishing(&self) -> bool {
        self.state.punishing
    }

    /// Apply one classified sample that arrived at `now`.
    ///
    /// Returns the actuator command issued by this transition, if any. Ignored
    /// samples leave the state untouched, including `last_poll_time`.
    pub fn on_verdict(
        &mut self,
        verdict: GazeVerdict,
        now: Duration,
    ) -> Result<Option<ActuatorCommand>, TrainerError> {
        let command = match verdict {
            GazeVerdict::Ignored => return Ok(None),
            GazeVerdict::InBounds => self.handle_good_gaze()?,
            GazeVerdict::OutOfBounds => self.handle_bad_gaze(now)?,
        };

        self.state.last_poll_time = now;
        Ok(command)
    }

    /// Stop the actuator if it is running. Returns whether a stop was issued.
    pub fn release(&mut self) -> Result<bool, TrainerError> {
        if !self.state.punishing {
            return Ok(false);
        }

        self.actuator.stop_loop()?;
        self.state.punishing = false;
        info!("punishment released on shutdown");
        Ok(true)
    }

    fn handle_good_gaze(&mut self) -> Result<Option<ActuatorCommand>, TrainerError> {
        let mut command = None;

        if self.state.punishing {
            self.actuator.stop_loop()?;
            self.state.punishing = false;
            info!(
                "punishment stopped after {} ms out of bounds",
                self.state.accumulated_bad_ms
            );
            command = Some(ActuatorCommand::Stop);
        }

        self.state.accumulated_bad_ms = 0;
        Ok(command)
    }

    fn handle_bad_gaze(&mut self, now: Duration) -> Result<Option<ActuatorCommand>, TrainerError> {
        let elapsed = elapsed_ms(now, self.state.last_poll_time);
        self.state.accumulated_bad_ms = self.state.accumulated_bad_ms.saturating_add(elapsed);
        debug!(
            elapsed_ms = elapsed,
            accumulated_ms = self.state.accumulated_bad_ms,
            "gaze out of bounds"
        );

        if self.state.accumulated_bad_ms > self.threshold_ms && !self.state.punishing {
            self.actuator.start_loop()?;
            self.state.punishing = true;
            info!(
                "punishment started after {} ms out of bounds (threshold {} ms)",
                self.state.accumulated_bad_ms, self.threshold_ms
            );
            return Ok(Some(ActuatorCommand::Start));
        }

        Ok(None)
    }
}

/// Whole milliseconds between two arrival instants; zero if time went backwards
fn elapsed_ms(now: Duration, since: Duration) -> u64 {
    u64::try_from(now.saturating_sub(since).as_millis()).unwrap_or(u64::MAX)
}
