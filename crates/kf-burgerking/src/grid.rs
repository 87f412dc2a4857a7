use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Kilometres per degree of latitude, also per degree of longitude at the equator.
const KM_PER_DEGREE: f64 = 111.32;

/// Absorbs float error when a step divides the span exactly (9.1 / 0.7).
const STEP_EPSILON: f64 = 1e-9;

/// Upper bound on windows in one grid.
pub const MAX_GRID_POINTS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

/// A search center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Bounds {
    fn validate(&self) -> Result<(), GridError> {
        let finite = [self.lat_min, self.lat_max, self.lng_min, self.lng_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.lat_min > self.lat_max || self.lng_min > self.lng_max {
            return Err(GridError::InvalidBounds);
        }
        Ok(())
    }

    /// The latitude inside the bounds closest to the equator, where a degree of
    /// longitude is widest.
    pub fn widest_latitude(&self) -> f64 {
        if self.lat_min <= 0.0 && self.lat_max >= 0.0 {
            0.0
        } else if self.lat_min.abs() < self.lat_max.abs() {
            self.lat_min
        } else {
            self.lat_max
        }
    }
}

/// Points along one axis, `None` past [`MAX_GRID_POINTS`].
fn steps_in(span: f64, step: f64) -> Option<usize> {
    let steps = (span / step + STEP_EPSILON).floor();
    if steps >= MAX_GRID_POINTS as f64 {
        return None;
    }
    Some(steps as usize + 1)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generate search centers row by row (every longitude of a latitude before the
/// next latitude), starting at the minimum corner and stepping up to and
/// including the maximum.
///
/// Coordinates are rounded to two decimals and clamped to the bounds. Values are
/// computed as `min + i * step` so long rows do not accumulate float drift.
pub fn generate(bounds: &Bounds, lat_step: f64, lng_step: f64) -> Result<Vec<Coordinate>, GridError> {
    if !(lat_step.is_finite() && lng_step.is_finite() && lat_step > 0.0 && lng_step > 0.0) {
        return Err(GridError::InvalidStep { lat_step, lng_step });
    }
    bounds.validate()?;

    let rows = steps_in(bounds.lat_max - bounds.lat_min, lat_step).ok_or(GridError::TooManyPoints)?;
    let cols = steps_in(bounds.lng_max - bounds.lng_min, lng_step).ok_or(GridError::TooManyPoints)?;
    let total = rows
        .checked_mul(cols)
        .filter(|&total| total <= MAX_GRID_POINTS)
        .ok_or(GridError::TooManyPoints)?;
    let mut coordinates = Vec::with_capacity(total);
    for row in 0..rows {
        let lat = round_to_hundredths(bounds.lat_min + row as f64 * lat_step)
            .clamp(bounds.lat_min, bounds.lat_max);
        for col in 0..cols {
            let lng = round_to_hundredths(bounds.lng_min + col as f64 * lng_step)
                .clamp(bounds.lng_min, bounds.lng_max);
            coordinates.push(Coordinate { lat, lng });
        }
    }
    Ok(coordinates)
}

/// Whether a window of `radius_m` reaches every point of a grid cell at `latitude`.
///
/// The farthest point from any center is the middle of the cell, half a diagonal
/// away.
pub fn covers(radius_m: f64, lat_step: f64, lng_step: f64, latitude: f64) -> bool {
    let lat_km = lat_step * KM_PER_DEGREE;
    let lng_km = lng_step * KM_PER_DEGREE * latitude.to_radians().cos();
    let half_diagonal_m = (lat_km.hypot(lng_km) / 2.0) * 1000.0;
    half_diagonal_m <= radius_m
}
