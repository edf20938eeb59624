//! Boundary box resolution
//!
//! Converts the configured boundary box (display pixels) into the normalized
//! coordinate space the tracker reports in. Runs once at startup.

use crate::error::TrainerError;
use crate::types::{BoundaryBox, DisplayConfig, NormalizedBounds};

/// Resolver for converting pixel geometry into normalized bounds
pub struct BoundsResolver;

impl BoundsResolver {
    /// Resolve the boundary box into normalized bounds.
    ///
    /// No validation happens here: a box outside the display yields bounds
    /// outside `[0, 1]`, and an inverted box yields bounds nothing falls into.
    /// Use [`BoundsResolver::validate`] to reject such boxes up front.
    pub fn resolve(display: &DisplayConfig, bbox: &BoundaryBox) -> NormalizedBounds {
        let placed = Self::place(display, bbox);

        NormalizedBounds {
            x_min: placed.x / display.width,
            x_max: (placed.x + placed.width) / display.width,
            y_min: placed.y / display.height,
            y_max: (placed.y + placed.height) / display.height,
        }
    }

    /// Apply auto-centering, returning the box with its effective origin
    pub fn place(display: &DisplayConfig, bbox: &BoundaryBox) -> BoundaryBox {
        if !bbox.auto_center {
            return *bbox;
        }

        BoundaryBox {
            x: (display.width - bbox.width) / 2.0,
            y: (display.height - bbox.height) / 2.0,
            ..*bbox
        }
    }

    /// Check that the placed box has a positive size and lies within the display
    pub fn validate(display: &DisplayConfig, bbox: &BoundaryBox) -> Result<(), TrainerError> {
        if !(display.width > 0.0 && display.height > 0.0) {
            return Err(TrainerError::InvalidGeometry(format!(
                "display size must be positive, got {}x{}",
                display.width, display.height
            )));
        }

        let placed = Self::place(display, bbox);

        if !(placed.width > 0.0 && placed.height > 0.0) {
            return Err(TrainerError::InvalidGeometry(format!(
                "box size must be positive, got {}x{}",
                placed.width, placed.height
            )));
        }

        let fits_x = placed.x >= 0.0 && placed.x + placed.width <= display.width;
        let fits_y = placed.y >= 0.0 && placed.y + placed.height <= display.height;
        if !(fits_x && fits_y) {
            return Err(TrainerError::InvalidGeometry(format!(
                "box at ({}, {}) sized {}x{} does not fit a {}x{} display",
                placed.x, placed.y, placed.width, placed.height, display.width, display.height
            )));
        }

        Ok(())
    }
}
