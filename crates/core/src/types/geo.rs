//! Geographic coordinates with a search radius.

use serde::{Deserialize, Serialize};

/// A resolved city center and the radius to search around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Search radius in kilometres.
    pub radius: f64,
}

impl Coordinates {
    /// Geographic centroid of metropolitan France, used when nothing else
    /// resolves a city name.
    pub const NATIONAL_CENTER: Self = Self::new(46.603_354, 1.888_334, 10.0);

    /// Radius used for cities located by geocoding or by stored rows.
    pub const DEFAULT_RADIUS_KM: f64 = 10.0;

    /// Create coordinates from latitude, longitude and radius (km).
    #[must_use]
    pub const fn new(lat: f64, lon: f64, radius: f64) -> Self {
        Self { lat, lon, radius }
    }

    /// Create coordinates with [`Coordinates::DEFAULT_RADIUS_KM`].
    #[must_use]
    pub const fn with_default_radius(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, Self::DEFAULT_RADIUS_KM)
    }

    /// Search radius in metres.
    #[must_use]
    pub fn radius_meters(&self) -> f64 {
        self.radius * 1000.0
    }

    /// Whether both latitude and longitude are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_meters() {
        let coords = Coordinates::new(43.6045, 1.4440, 20.0);
        assert!((coords.radius_meters() - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_valid() {
        assert!(Coordinates::NATIONAL_CENTER.is_valid());
        assert!(!Coordinates::with_default_radius(91.0, 0.0).is_valid());
        assert!(!Coordinates::with_default_radius(0.0, f64::NAN).is_valid());
    }
}
