//! Core types for the Gaze Trainer pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: display geometry, normalized bounds, raw gaze points from the
//! tracker, stamped gaze samples, and the verdicts derived from them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Physical display size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display width (pixels)
    pub width: f64,
    /// Display height (pixels)
    pub height: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 3840.0,
            height: 2160.0,
        }
    }
}

/// On-screen rectangle where gaze is considered acceptable, in display pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryBox {
    /// Distance from the left edge of the display to the left edge of the box
    pub x: f64,
    /// Distance from the top edge of the display to the top edge of the box
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
    /// Ignore `x`/`y` and center the box on the display
    pub auto_center: bool,
}

impl Default for BoundaryBox {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 3840.0,
            height: 2160.0,
            auto_center: false,
        }
    }
}

/// Boundary box expressed in the tracker's normalized screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl NormalizedBounds {
    /// Inclusive containment check on both axes
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min <= x && x <= self.x_max) && (self.y_min <= y && y <= self.y_max)
    }
}

/// Validity flag reported by the tracker for each gaze point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeValidity {
    Valid,
    Invalid,
}

/// Raw gaze point as delivered by a tracker callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    /// Normalized horizontal position (nominally 0-1, unbounded in practice)
    pub x: f64,
    /// Normalized vertical position (nominally 0-1, unbounded in practice)
    pub y: f64,
    pub validity: GazeValidity,
    /// Device clock timestamp (microseconds), when the tracker provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_us: Option<i64>,
}

impl GazePoint {
    pub fn valid(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            validity: GazeValidity::Valid,
            timestamp_us: None,
        }
    }

    pub fn invalid() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            validity: GazeValidity::Invalid,
            timestamp_us: None,
        }
    }

    pub fn at_us(mut self, timestamp_us: i64) -> Self {
        self.timestamp_us = Some(timestamp_us);
        self
    }
}

/// Gaze point stamped with its arrival instant on the receiving side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub valid: bool,
    /// Arrival instant, measured from the session clock origin
    pub timestamp: Duration,
}

impl GazeSample {
    pub fn stamped(point: GazePoint, timestamp: Duration) -> Self {
        Self {
            x: point.x,
            y: point.y,
            valid: point.validity == GazeValidity::Valid,
            timestamp,
        }
    }
}

/// Classification of a single gaze sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeVerdict {
    InBounds,
    OutOfBounds,
    /// Invalid sample under the ignore policy; must not touch distraction state
    Ignored,
}

impl GazeVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeVerdict::InBounds => "in_bounds",
            GazeVerdict::OutOfBounds => "out_of_bounds",
            GazeVerdict::Ignored => "ignored",
        }
    }
}

/// Command issued to the punishment actuator by a timer transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorCommand {
    Start,
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaze_point_json_shape() {
        let point: GazePoint =
            serde_json::from_str(r#"{"x":0.5,"y":0.25,"validity":"valid","timestamp_us":1500}"#)
                .unwrap();
        assert_eq!(point, GazePoint::valid(0.5, 0.25).at_us(1500));

        let point: GazePoint =
            serde_json::from_str(r#"{"x":0.0,"y":0.0,"validity":"invalid"}"#).unwrap();
        assert_eq!(point.validity, GazeValidity::Invalid);
        assert_eq!(point.timestamp_us, None);
    }

    #[test]
    fn test_stamped_sample_carries_validity() {
        let sample = GazeSample::stamped(GazePoint::invalid(), Duration::from_millis(7));
        assert!(!sample.valid);
        assert_eq!(sample.timestamp, Duration::from_millis(7));
    }

    #[test]
    fn test_bounds_contains_edges() {
        let bounds = NormalizedBounds {
            x_min: 0.25,
            x_max: 0.75,
            y_min: 0.25,
            y_max: 0.75,
        };
        assert!(bounds.contains(0.25, 0.75));
        assert!(!bounds.contains(0.2499, 0.5));
        assert!(!bounds.contains(0.5, 0.7501));
    }

    #[test]
    fn test_verdict_names_match_serialized_form() {
        for verdict in [
            GazeVerdict::InBounds,
            GazeVerdict::OutOfBounds,
            GazeVerdict::Ignored,
        ] {
            let json = serde_json::to_string(&verdict).unwrap();
            assert_eq!(json, format!("\"{}\"", verdict.as_str()));
        }
    }
}
