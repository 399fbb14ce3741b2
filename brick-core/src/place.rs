//! Validated coordinates and resolved place names.

use std::fmt;

use geo::Coord;
use thiserror::Error;

/// A WGS84 position reported by the device.
///
/// Latitude is kept in `[-90, 90]` and longitude in `[-180, 180]` degrees.
/// Converting into [`geo::Coord`] follows the `geo` axis order
/// (`x = longitude`, `y = latitude`).
///
/// # Examples
///
/// ```
/// use brick_core::Coordinate;
/// use geo::Coord;
///
/// # fn main() -> Result<(), brick_core::CoordinateError> {
/// let madison = Coordinate::new(43.0731, -89.4012)?;
/// let coord: Coord<f64> = madison.into();
/// assert_eq!(coord.x, -89.4012);
/// assert_eq!(coord.y, 43.0731);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

/// Errors returned by [`Coordinate::new`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    /// Latitude was outside `[-90, 90]` or not a finite number.
    #[error("latitude {value} is outside [-90, 90]")]
    Latitude {
        /// Rejected value.
        value: f64,
    },
    /// Longitude was outside `[-180, 180]` or not a finite number.
    #[error("longitude {value} is outside [-180, 180]")]
    Longitude {
        /// Rejected value.
        value: f64,
    },
}

impl Coordinate {
    /// Validate and construct a [`Coordinate`].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude { value: latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(value: Coordinate) -> Self {
        Self {
            x: value.longitude,
            y: value.latitude,
        }
    }
}

impl TryFrom<Coord<f64>> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: Coord<f64>) -> Result<Self, Self::Error> {
        Self::new(value.y, value.x)
    }
}

/// Human-readable place name produced by reverse geocoding.
///
/// Never empty: blank provider values are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceName(String);

impl PlaceName {
    /// Wrap `raw` when it contains anything besides whitespace.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PlaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
