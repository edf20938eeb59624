//! NDJSON replay tracker
//!
//! Replays recorded gaze points, one JSON object per line:
//!
//! ```text
//! {"x":0.51,"y":0.48,"validity":"valid","timestamp_us":0}
//! {"x":0.0,"y":0.0,"validity":"invalid","timestamp_us":11000}
//! ```
//!
//! In paced mode a point becomes deliverable only once its offset from the
//! first recorded timestamp has elapsed, so waits block like a live device.
//! Unpaced replays deliver as fast as the session drains them.

use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{TrackerApi, TrackerDevice, WaitOutcome};
use crate::error::TrainerError;
use crate::types::GazePoint;

/// Maximum points handed to the handler per processing pass
const MAX_BATCH: usize = 256;

/// Where recorded gaze points are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaySource {
    File(PathBuf),
    Stdin,
    Memory(String),
}

impl ReplaySource {
    /// Interpret a CLI argument; `-` means stdin
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            ReplaySource::Stdin
        } else {
            ReplaySource::File(PathBuf::from(arg))
        }
    }

    pub fn url(&self) -> String {
        match self {
            ReplaySource::File(path) => format!("replay://{}", path.display()),
            ReplaySource::Stdin => "replay://stdin".to_string(),
            ReplaySource::Memory(_) => "replay://memory".to_string(),
        }
    }

    fn is_present(&self) -> bool {
        match self {
            ReplaySource::File(path) => path.is_file(),
            ReplaySource::Stdin | ReplaySource::Memory(_) => true,
        }
    }

    fn open_reader(&self) -> io::Result<Box<dyn BufRead>> {
        let reader: Box<dyn BufRead> = match self {
            ReplaySource::File(path) => Box::new(BufReader::new(File::open(path)?)),
            ReplaySource::Stdin => Box::new(io::stdin().lock()),
            ReplaySource::Memory(text) => Box::new(Cursor::new(text.clone().into_bytes())),
        };
        Ok(reader)
    }
}

/// Tracker API backed by a single recorded stream
pub struct ReplayTracker {
    source: ReplaySource,
    paced: bool,
    busy: Rc<Cell<bool>>,
}

impl ReplayTracker {
    pub fn new(source: ReplaySource, paced: bool) -> Self {
        Self {
            source,
            paced,
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn source(&self) -> &ReplaySource {
        &self.source
    }
}

impl TrackerApi for ReplayTracker {
    fn enumerate_devices(&self) -> Result<Vec<String>, TrainerError> {
        if self.source.is_present() {
            Ok(vec![self.source.url()])
        } else {
            Ok(Vec::new())
        }
    }

    fn open_device(&self, url: &str) -> Result<Box<dyn TrackerDevice>, TrainerError> {
        if url != self.source.url() {
            return Err(TrainerError::Connection(format!("unknown device {}", url)));
        }
        if self.busy.get() {
            return Err(TrainerError::Connection(format!("device {} is busy", url)));
        }

        let lines = self
            .source
            .open_reader()
            .map_err(|e| TrainerError::Connection(format!("{}: {}", url, e)))?;
        self.busy.set(true);
        info!("opened replay device {} (paced: {})", url, self.paced);

        Ok(Box::new(ReplayDevice {
            url: url.to_string(),
            lines,
            line_no: 0,
            pending: None,
            eof: false,
            paced: self.paced,
            origin: None,
            subscribed: false,
            closed: false,
            busy: Rc::clone(&self.busy),
        }))
    }
}

struct ReplayDevice {
    url: String,
    lines: Box<dyn BufRead>,
    line_no: usize,
    pending: Option<GazePoint>,
    eof: bool,
    paced: bool,
    /// Wall-clock instant matched to the first recorded timestamp
    origin: Option<(Instant, i64)>,
    subscribed: bool,
    closed: bool,
    busy: Rc<Cell<bool>>,
}

impl ReplayDevice {
    fn ensure_open(&self) -> Result<(), TrainerError> {
        if self.closed {
            return Err(TrainerError::Device(format!("device {} is closed", self.url)));
        }
        Ok(())
    }

    /// Next recorded point without consuming it
    fn peek(&mut self) -> Result<Option<GazePoint>, TrainerError> {
        let mut line = String::new();
        while self.pending.is_none() && !self.eof {
            line.clear();
            if self.lines.read_line(&mut line)? == 0 {
                self.eof = true;
                debug!("replay {} reached end of stream", self.url);
                break;
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let point: GazePoint = serde_json::from_str(trimmed).map_err(|e| {
                TrainerError::Device(format!("{} line {}: {}", self.url, self.line_no, e))
            })?;
            self.pending = Some(point);
        }
        Ok(self.pending)
    }

    /// Time left until `point` may be delivered
    fn due_in(&mut self, point: &GazePoint) -> Duration {
        let timestamp_us = match (self.paced, point.timestamp_us) {
            (true, Some(ts)) => ts,
            _ => return Duration::ZERO,
        };

        let (origin, first_us) = *self.origin.get_or_insert((Instant::now(), timestamp_us));
        let offset_us = timestamp_us.saturating_sub(first_us);
        if offset_us <= 0 {
            return Duration::ZERO;
        }
        let due = origin + Duration::from_micros(offset_us as u64);
        due.saturating_duration_since(Instant::now())
    }
}

impl TrackerDevice for ReplayDevice {
    fn url(&self) -> &str {
        &self.url
    }

    fn subscribe_gaze(&mut self) -> Result<(), TrainerError> {
        self.ensure_open()?;
        if self.subscribed {
            return Err(TrainerError::Device("already subscribed to gaze data".to_string()));
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe_gaze(&mut self) -> Result<(), TrainerError> {
        self.ensure_open()?;
        if !self.subscribed {
            return Err(TrainerError::Device("not subscribed to gaze data".to_string()));
        }
        self.subscribed = false;
        Ok(())
    }

    fn wait_for_callbacks(&mut self, timeout: Duration) -> Result<WaitOutcome, TrainerError> {
        self.ensure_open()?;
        if !self.subscribed {
            thread::sleep(timeout);
            return Ok(WaitOutcome::TimedOut);
        }

        let point = match self.peek()? {
            Some(point) => point,
            None => return Ok(WaitOutcome::Exhausted),
        };

        let wait = self.due_in(&point);
        if wait.is_zero() {
            Ok(WaitOutcome::Ready)
        } else if wait <= timeout {
            thread::sleep(wait);
            Ok(WaitOutcome::Ready)
        } else {
            thread::sleep(timeout);
            Ok(WaitOutcome::TimedOut)
        }
    }

    fn process_callbacks(
        &mut self,
        handler: &mut dyn FnMut(GazePoint),
    ) -> Result<usize, TrainerError> {
        self.ensure_open()?;
        if !self.subscribed {
            return Ok(0);
        }

        let mut delivered = 0;
        while delivered < MAX_BATCH {
            let Some(point) = self.peek()? else {
                break;
            };
            if !self.due_in(&point).is_zero() {
                break;
            }
            self.pending = None;
            handler(point);
            delivered += 1;
        }
        Ok(delivered)
    }

    fn close(&mut self) -> Result<(), TrainerError> {
        self.ensure_open()?;
        self.closed = true;
        self.busy.set(false);
        Ok(())
    }
}

impl Drop for ReplayDevice {
    fn drop(&mut self) {
        if !self.closed {
            self.busy.set(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GazeValidity;
    use pretty_assertions::assert_eq;

    fn memory(lines: &[&str]) -> ReplaySource {
        ReplaySource::Memory(lines.join("\n"))
    }

    fn open(tracker: &ReplayTracker) -> Box<dyn TrackerDevice> {
        let urls = tracker.enumerate_devices().unwrap();
        tracker.open_device(&urls[0]).unwrap()
    }

    fn drain(device: &mut dyn TrackerDevice) -> Vec<GazePoint> {
        let mut points = Vec::new();
        device.process_callbacks(&mut |p| points.push(p)).unwrap();
        points
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(ReplaySource::from_arg("-"), ReplaySource::Stdin);
        assert_eq!(
            ReplaySource::from_arg("gaze.ndjson"),
            ReplaySource::File(PathBuf::from("gaze.ndjson"))
        );
        assert_eq!(ReplaySource::Stdin.url(), "replay://stdin");
    }

    #[test]
    fn test_missing_file_enumerates_nothing() {
        let tracker = ReplayTracker::new(
            ReplaySource::File(PathBuf::from("/nonexistent/gaze.ndjson")),
            false,
        );
        assert!(tracker.enumerate_devices().unwrap().is_empty());
    }

    #[test]
    fn test_unpaced_replay_delivers_everything() {
        let tracker = ReplayTracker::new(
            memory(&[
                r#"{"x":0.5,"y":0.5,"validity":"valid","timestamp_us":0}"#,
                "",
                r#"{"x":0.0,"y":0.0,"validity":"invalid","timestamp_us":50000}"#,
            ]),
            false,
        );
        let mut device = open(&tracker);
        device.subscribe_gaze().unwrap();

        assert_eq!(
            device.wait_for_callbacks(Duration::from_millis(10)).unwrap(),
            WaitOutcome::Ready
        );
        let points = drain(device.as_mut());
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].validity, GazeValidity::Invalid);
        assert_eq!(points[1].timestamp_us, Some(50_000));

        assert_eq!(
            device.wait_for_callbacks(Duration::from_millis(10)).unwrap(),
            WaitOutcome::Exhausted
        );
    }

    #[test]
    fn test_paced_replay_holds_future_points() {
        let tracker = ReplayTracker::new(
            memory(&[
                r#"{"x":0.5,"y":0.5,"validity":"valid","timestamp_us":0}"#,
                r#"{"x":0.5,"y":0.5,"validity":"valid","timestamp_us":5000000}"#,
            ]),
            true,
        );
        let mut device = open(&tracker);
        device.subscribe_gaze().unwrap();

        assert_eq!(
            device.wait_for_callbacks(Duration::from_millis(5)).unwrap(),
            WaitOutcome::Ready
        );
        assert_eq!(drain(device.as_mut()).len(), 1);
        assert_eq!(
            device.wait_for_callbacks(Duration::from_millis(5)).unwrap(),
            WaitOutcome::TimedOut
        );
        assert!(drain(device.as_mut()).is_empty());
    }

    #[test]
    fn test_unsubscribed_device_delivers_nothing() {
        let tracker = ReplayTracker::new(
            memory(&[r#"{"x":0.5,"y":0.5,"validity":"valid"}"#]),
            false,
        );
        let mut device = open(&tracker);

        assert_eq!(
            device.wait_for_callbacks(Duration::from_millis(1)).unwrap(),
            WaitOutcome::TimedOut
        );
        assert!(drain(device.as_mut()).is_empty());
        assert!(device.unsubscribe_gaze().is_err());

        device.subscribe_gaze().unwrap();
        assert!(device.subscribe_gaze().is_err());
        assert_eq!(drain(device.as_mut()).len(), 1);
    }

    #[test]
    fn test_busy_and_unknown_devices() {
        let tracker = ReplayTracker::new(memory(&[]), false);
        let mut device = open(&tracker);

        assert!(matches!(
            tracker.open_device("replay://memory"),
            Err(TrainerError::Connection(_))
        ));
        assert!(matches!(
            tracker.open_device("tobii-ttp://IS4_13M"),
            Err(TrainerError::Connection(_))
        ));

        device.close().unwrap();
        assert!(device.close().is_err());
        assert!(tracker.open_device("replay://memory").is_ok());
    }

    #[test]
    fn test_dropping_closed_handle_keeps_new_handle_busy() {
        let tracker = ReplayTracker::new(memory(&[]), false);
        let mut first = open(&tracker);
        first.close().unwrap();

        let second = tracker.open_device("replay://memory").unwrap();
        drop(first);
        assert!(matches!(
            tracker.open_device("replay://memory"),
            Err(TrainerError::Connection(_))
        ));

        drop(second);
        assert!(tracker.open_device("replay://memory").is_ok());
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let tracker = ReplayTracker::new(
            memory(&[r#"{"x":0.5,"y":0.5,"validity":"valid"}"#, "{not json"]),
            false,
        );
        let mut device = open(&tracker);
        device.subscribe_gaze().unwrap();

        let mut seen = 0;
        let err = device.process_callbacks(&mut |_| seen += 1).unwrap_err();
        assert_eq!(seen, 1);
        assert!(err.to_string().contains("line 2"));
    }
}
