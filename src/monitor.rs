//! Monitoring pipeline
//!
//! This module provides the public API for Gaze Trainer. It wires the stages
//! together for each incoming gaze point:
//!
//! 1. Stamp - assign the arrival instant on the receiving side
//! 2. GazeClassifier - in bounds, out of bounds, or ignored
//! 3. DistractionTimer - accumulate distraction time, drive the actuator
//! 4. SessionStats - count what happened
//!
//! [`Session`] owns the device lifecycle around that: enumerate, open,
//! subscribe, the wait/process loop, and cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::classifier::GazeClassifier;
use crate::clock::Clock;
use crate::config::{TimestampSource, TrainerConfig};
use crate::distraction::DistractionTimer;
use crate::error::TrainerError;
use crate::stats::{SessionStats, SessionSummary};
use crate::tracker::{TrackerApi, TrackerDevice, WaitOutcome};
use crate::types::{ActuatorCommand, GazePoint, GazeSample, GazeVerdict};

/// What a single sample did to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOutcome {
    pub verdict: GazeVerdict,
    pub command: Option<ActuatorCommand>,
}

/// Classifier and distraction timer composed over one actuator.
pub struct GazeMonitor<A: Actuator> {
    classifier: GazeClassifier,
    timer: DistractionTimer<A>,
    stats: SessionStats,
}

impl<A: Actuator> GazeMonitor<A> {
    pub fn new(
        classifier: GazeClassifier,
        threshold_ms: u64,
        actuator: A,
        run_start: Duration,
    ) -> Self {
        Self {
            classifier,
            timer: DistractionTimer::new(threshold_ms, actuator, run_start),
            stats: SessionStats::default(),
        }
    }

    /// Build a monitor from startup configuration
    pub fn from_config(config: &TrainerConfig, actuator: A, run_start: Duration) -> Self {
        let classifier = GazeClassifier::new(config.bounds(), config.invalid_policy());
        Self::new(
            classifier,
            config.punishment.threshold_ms,
            actuator,
            run_start,
        )
    }

    /// Classify one sample and apply it to the distraction timer
    pub fn process(&mut self, sample: &GazeSample) -> Result<SampleOutcome, TrainerError> {
        let verdict = self.classifier.classify(sample);
        let command = self.timer.on_verdict(verdict, sample.timestamp)?;
        if let Some(command) = command {
            debug!(
                "{:?} after {} sample, {} ms accumulated",
                command,
                verdict.as_str(),
                self.timer.state().accumulated_bad_ms
            );
        }
        self.stats.record(
            verdict,
            command,
            sample.timestamp,
            self.timer.state().accumulated_bad_ms,
        );

        Ok(SampleOutcome { verdict, command })
    }

    /// Stop any running punishment and return the final counters
    pub fn finish(&mut self, now: Duration) -> Result<SessionStats, TrainerError> {
        let released = self.timer.release();
        self.stats.end_punishment(now);
        released?;
        Ok(self.stats.clone())
    }

    pub fn classifier(&self) -> &GazeClassifier {
        &self.classifier
    }

    pub fn timer(&self) -> &DistractionTimer<A> {
        &self.timer
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

/// Assigns arrival instants to raw gaze points
struct Stamper {
    source: TimestampSource,
    run_start: Duration,
    first_device_us: Option<i64>,
    last: Option<Duration>,
}

impl Stamper {
    fn new(source: TimestampSource, run_start: Duration) -> Self {
        Self {
            source,
            run_start,
            first_device_us: None,
            last: None,
        }
    }

    fn stamp(&mut self, point: &GazePoint, clock: &dyn Clock) -> Result<Duration, TrainerError> {
        let now = match self.source {
            TimestampSource::Arrival => clock.now(),
            TimestampSource::Device => {
                let timestamp_us = point.timestamp_us.ok_or_else(|| {
                    TrainerError::Device("gaze point has no device timestamp".to_string())
                })?;
                let first_us = *self.first_device_us.get_or_insert(timestamp_us);
                let offset_us = timestamp_us.saturating_sub(first_us).max(0);
                self.run_start + Duration::from_micros(offset_us as u64)
            }
        };
        self.last = Some(now);
        Ok(now)
    }

    /// Session end instant on the same time base as the samples
    fn end(&self, clock: &dyn Clock) -> Duration {
        match (self.source, self.last) {
            (TimestampSource::Device, Some(last)) => last,
            _ => clock.now(),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// No tracker was found; nothing ran
    NoDevice,
    Completed(SessionSummary),
}

/// One monitoring run against the first available tracker.
pub struct Session {
    config: TrainerConfig,
}

impl Session {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run until `running` is cleared or the device runs out of data.
    ///
    /// Device errors other than a wait timeout end the session. Cleanup
    /// (stopping punishment, unsubscribing, closing) is attempted regardless,
    /// and the first error encountered is returned.
    pub fn run<A: Actuator>(
        &self,
        api: &dyn TrackerApi,
        actuator: A,
        clock: &dyn Clock,
        running: &AtomicBool,
    ) -> Result<SessionOutcome, TrainerError> {
        self.config.validate()?;
        let bounds = self.config.bounds();
        info!(
            "bounds configured: X[{}-{}], Y[{}-{}]",
            bounds.x_min, bounds.x_max, bounds.y_min, bounds.y_max
        );

        let urls = api.enumerate_devices()?;
        let Some(url) = urls.first() else {
            warn!("no eye tracker found");
            return Ok(SessionOutcome::NoDevice);
        };
        info!("eye tracker found: {}", url);

        let mut device = api.open_device(url)?;
        info!("connected to eye tracker {}", device.url());

        if let Err(e) = device.subscribe_gaze() {
            let _ = device.close();
            return Err(e);
        }
        info!("subscribed to gaze data");

        let started_at = Utc::now();
        let run_start = clock.now();
        let mut monitor = GazeMonitor::from_config(&self.config, actuator, run_start);
        let mut stamper = Stamper::new(self.config.tracker.timestamps, run_start);

        let pumped = self.pump(device.as_mut(), &mut monitor, &mut stamper, clock, running);

        let stats = monitor.finish(stamper.end(clock));
        let unsubscribed = device.unsubscribe_gaze();
        let closed = device.close();
        pumped?;
        let stats = stats?;
        unsubscribed?;
        closed?;

        info!(
            "session finished: {} samples, {} punishments",
            stats.samples, stats.punishments
        );
        Ok(SessionOutcome::Completed(SessionSummary::new(
            url.clone(),
            started_at,
            bounds,
            self.config.punishment.threshold_ms,
            stats,
        )))
    }

    fn pump<A: Actuator>(
        &self,
        device: &mut dyn TrackerDevice,
        monitor: &mut GazeMonitor<A>,
        stamper: &mut Stamper,
        clock: &dyn Clock,
        running: &AtomicBool,
    ) -> Result<(), TrainerError> {
        let timeout = self.config.wait_timeout();
        let idle = self.config.idle_sleep();

        while running.load(Ordering::SeqCst) {
            match device.wait_for_callbacks(timeout)? {
                WaitOutcome::Ready => {}
                WaitOutcome::TimedOut => {
                    debug!("no gaze data within {:?}", timeout);
                    continue;
                }
                WaitOutcome::Exhausted => {
                    info!("gaze stream ended");
                    break;
                }
            }

            let mut failure = None;
            device.process_callbacks(&mut |point| {
                if failure.is_some() {
                    return;
                }
                let outcome = stamper
                    .stamp(&point, clock)
                    .and_then(|now| monitor.process(&GazeSample::stamped(point, now)));
                if let Err(e) = outcome {
                    failure = Some(e);
                }
            })?;
            if let Some(e) = failure {
                return Err(e);
            }

            if !idle.is_zero() {
                thread::sleep(idle);
            }
        }

        Ok(())
    }
}
