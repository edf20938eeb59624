//! Punishment actuators
//!
//! An actuator is the looping deterrent the distraction timer switches on and
//! off. Start and stop are never called twice in a row; the timer guards that
//! with its `punishing` flag, so implementations need not be idempotent.

#[cfg(feature = "audio")]
mod sound;

#[cfg(feature = "audio")]
pub use sound::LoopingSound;

use std::io::{self, Write};

use tracing::{info, warn};

use crate::error::TrainerError;

/// Trait for the looping punishment output
pub trait Actuator {
    /// Begin looping the deterrent
    fn start_loop(&mut self) -> Result<(), TrainerError>;

    /// Stop the deterrent
    fn stop_loop(&mut self) -> Result<(), TrainerError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn start_loop(&mut self) -> Result<(), TrainerError> {
        (**self).start_loop()
    }

    fn stop_loop(&mut self) -> Result<(), TrainerError> {
        (**self).stop_loop()
    }
}

/// Actuator that reports punishment on the console.
///
/// Rings the terminal bell once on start when `bell` is set. Used when no
/// sound file is configured or the `audio` feature is disabled.
pub struct ConsoleActuator<W: Write = io::Stderr> {
    out: W,
    bell: bool,
}

impl ConsoleActuator {
    pub fn new(bell: bool) -> Self {
        Self {
            out: io::stderr(),
            bell,
        }
    }
}

impl<W: Write> ConsoleActuator<W> {
    pub fn with_writer(out: W, bell: bool) -> Self {
        Self { out, bell }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Actuator for ConsoleActuator<W> {
    fn start_loop(&mut self) -> Result<(), TrainerError> {
        warn!("gaze left the boundary box, punishment started");
        if self.bell {
            self.out.write_all(b"\x07")?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn stop_loop(&mut self) -> Result<(), TrainerError> {
        info!("gaze back in bounds, punishment stopped");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_actuator_rings_bell_on_start_only() {
        let mut actuator = ConsoleActuator::with_writer(Vec::new(), true);
        actuator.start_loop().unwrap();
        actuator.stop_loop().unwrap();
        assert_eq!(actuator.into_inner(), b"\x07".to_vec());
    }

    #[test]
    fn test_console_actuator_quiet_without_bell() {
        let mut actuator = ConsoleActuator::with_writer(Vec::new(), false);
        actuator.start_loop().unwrap();
        assert!(actuator.into_inner().is_empty());
    }

    #[test]
    fn test_boxed_actuator_forwards() {
        let recorder = recording::RecordingActuator::new();
        let mut boxed: Box<dyn Actuator> = Box::new(recorder.clone());
        boxed.start_loop().unwrap();
        boxed.stop_loop().unwrap();
        assert_eq!(
            recorder.calls(),
            vec![
                crate::types::ActuatorCommand::Start,
                crate::types::ActuatorCommand::Stop
            ]
        );
    }
}
