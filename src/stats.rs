//! Session statistics
//!
//! Counters for the current run only. They are reported when the session ends
//! and never written anywhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::types::{ActuatorCommand, GazeVerdict, NormalizedBounds};

/// Running counters updated once per sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Gaze points received from the tracker
    pub samples: u64,
    pub in_bounds: u64,
    pub out_of_bounds: u64,
    /// Invalid samples dropped under the ignore policy
    pub ignored: u64,
    /// Number of times the actuator was started
    pub punishments: u64,
    /// Total time spent punishing (ms)
    pub punished_ms: u64,
    /// Longest accumulated out-of-bounds streak (ms)
    pub longest_streak_ms: u64,
    #[serde(skip)]
    punishing_since: Option<Duration>,
}

impl SessionStats {
    /// Record one processed sample and the command it caused, if any
    pub fn record(
        &mut self,
        verdict: GazeVerdict,
        command: Option<ActuatorCommand>,
        now: Duration,
        accumulated_bad_ms: u64,
    ) {
        self.samples += 1;
        match verdict {
            GazeVerdict::InBounds => self.in_bounds += 1,
            GazeVerdict::OutOfBounds => self.out_of_bounds += 1,
            GazeVerdict::Ignored => self.ignored += 1,
        }
        self.longest_streak_ms = self.longest_streak_ms.max(accumulated_bad_ms);

        match command {
            Some(ActuatorCommand::Start) => {
                self.punishments += 1;
                self.punishing_since = Some(now);
            }
            Some(ActuatorCommand::Stop) => self.end_punishment(now),
            None => {}
        }
    }

    /// Account for a punishment still running when the session ends
    pub fn end_punishment(&mut self, now: Duration) {
        if let Some(since) = self.punishing_since.take() {
            let elapsed = now.saturating_sub(since).as_millis();
            self.punished_ms += u64::try_from(elapsed).unwrap_or(u64::MAX);
        }
    }

    /// Share of classified samples that were in bounds (0-1)
    pub fn focus_ratio(&self) -> Option<f64> {
        let classified = self.in_bounds + self.out_of_bounds;
        if classified == 0 {
            None
        } else {
            Some(self.in_bounds as f64 / classified as f64)
        }
    }
}

/// Report printed when a session ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub device_url: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub bounds: NormalizedBounds,
    pub threshold_ms: u64,
    pub focus_ratio: Option<f64>,
    pub stats: SessionStats,
}

impl SessionSummary {
    pub fn new(
        device_url: String,
        started_at: DateTime<Utc>,
        bounds: NormalizedBounds,
        threshold_ms: u64,
        stats: SessionStats,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            device_url,
            started_at,
            ended_at: Utc::now(),
            bounds,
            threshold_ms,
            focus_ratio: stats.focus_ratio(),
            stats,
        }
    }
}
