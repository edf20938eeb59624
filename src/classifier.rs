//! Gaze classification
//!
//! Decides whether a single gaze sample falls inside the normalized bounds.
//! - Valid samples are checked against the bounds, inclusive on both ends
//! - Invalid samples (closed eyes, lost tracking) follow the configured policy

use serde::{Deserialize, Serialize};

use crate::types::{GazeSample, GazeVerdict, NormalizedBounds};

/// What to do with samples the tracker flags as invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidGazePolicy {
    /// Count invalid samples as looking away
    OutOfBounds,
    /// Drop invalid samples without touching any state
    Ignore,
}

impl InvalidGazePolicy {
    pub fn from_flag(treat_invalid_as_out_of_bounds: bool) -> Self {
        if treat_invalid_as_out_of_bounds {
            InvalidGazePolicy::OutOfBounds
        } else {
            InvalidGazePolicy::Ignore
        }
    }
}

/// Classify one sample against the bounds.
pub fn classify(
    sample: &GazeSample,
    bounds: &NormalizedBounds,
    treat_invalid_as_out_of_bounds: bool,
) -> GazeVerdict {
    if !sample.valid {
        return if treat_invalid_as_out_of_bounds {
            GazeVerdict::OutOfBounds
        } else {
            GazeVerdict::Ignored
        };
    }

    if bounds.contains(sample.x, sample.y) {
        GazeVerdict::InBounds
    } else {
        GazeVerdict::OutOfBounds
    }
}

/// Classifier bound to a fixed set of bounds and an invalid-sample policy
#[derive(Debug, Clone, Copy)]
pub struct GazeClassifier {
    bounds: NormalizedBounds,
    policy: InvalidGazePolicy,
}

impl GazeClassifier {
    pub fn new(bounds: NormalizedBounds, policy: InvalidGazePolicy) -> Self {
        Self { bounds, policy }
    }

    pub fn bounds(&self) -> &NormalizedBounds {
        &self.bounds
    }

    pub fn policy(&self) -> InvalidGazePolicy {
        self.policy
    }

    pub fn classify(&self, sample: &GazeSample) -> GazeVerdict {
        classify(
            sample,
            &self.bounds,
            self.policy == InvalidGazePolicy::OutOfBounds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GazePoint;
    use std::time::Duration;

    fn center_box() -> NormalizedBounds {
        NormalizedBounds {
            x_min: 0.25,
            x_max: 0.75,
            y_min: 0.25,
            y_max: 0.75,
        }
    }

    fn sample(point: GazePoint) -> GazeSample {
        GazeSample::stamped(point, Duration::ZERO)
    }

    #[test]
    fn test_inside_and_outside() {
        let bounds = center_box();
        assert_eq!(
            classify(&sample(GazePoint::valid(0.5, 0.5)), &bounds, true),
            GazeVerdict::InBounds
        );
        assert_eq!(
            classify(&sample(GazePoint::valid(0.1, 0.5)), &bounds, true),
            GazeVerdict::OutOfBounds
        );
        assert_eq!(
            classify(&sample(GazePoint::valid(0.5, 0.9)), &bounds, true),
            GazeVerdict::OutOfBounds
        );
    }

    #[test]
    fn test_boundary_corners_are_inclusive() {
        let bounds = center_box();
        let min_corner = sample(GazePoint::valid(bounds.x_min, bounds.y_min));
        let max_corner = sample(GazePoint::valid(bounds.x_max, bounds.y_max));

        assert_eq!(classify(&min_corner, &bounds, true), GazeVerdict::InBounds);
        assert_eq!(classify(&max_corner, &bounds, true), GazeVerdict::InBounds);
    }

    #[test]
    fn test_coordinates_outside_unit_range() {
        let bounds = NormalizedBounds {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        };
        assert_eq!(
            classify(&sample(GazePoint::valid(-0.01, 0.5)), &bounds, true),
            GazeVerdict::OutOfBounds
        );
        assert_eq!(
            classify(&sample(GazePoint::valid(0.5, 1.2)), &bounds, true),
            GazeVerdict::OutOfBounds
        );
    }

    #[test]
    fn test_invalid_sample_policy() {
        let bounds = center_box();
        // Coordinates of an invalid sample are meaningless, even if inside
        let invalid = sample(GazePoint {
            x: 0.5,
            y: 0.5,
            ..GazePoint::invalid()
        });

        assert_eq!(classify(&invalid, &bounds, true), GazeVerdict::OutOfBounds);
        assert_eq!(classify(&invalid, &bounds, false), GazeVerdict::Ignored);
    }

    #[test]
    fn test_inverted_bounds_never_match() {
        let inverted = NormalizedBounds {
            x_min: 0.75,
            x_max: 0.25,
            y_min: 0.0,
            y_max: 1.0,
        };
        for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(
                classify(&sample(GazePoint::valid(x, 0.5)), &inverted, true),
                GazeVerdict::OutOfBounds
            );
        }
    }

    #[test]
    fn test_classifier_uses_policy() {
        let ignoring = GazeClassifier::new(center_box(), InvalidGazePolicy::from_flag(false));
        assert_eq!(ignoring.policy(), InvalidGazePolicy::Ignore);
        assert_eq!(
            ignoring.classify(&sample(GazePoint::invalid())),
            GazeVerdict::Ignored
        );

        let strict = GazeClassifier::new(center_box(), InvalidGazePolicy::from_flag(true));
        assert_eq!(
            strict.classify(&sample(GazePoint::invalid())),
            GazeVerdict::OutOfBounds
        );
        assert_eq!(
            strict.classify(&sample(GazePoint::valid(0.3, 0.3))),
            GazeVerdict::InBounds
        );
    }
}
