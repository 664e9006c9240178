//! Coordinate model for validated geographic positions

use serde::{Deserialize, Serialize};

use crate::error::RouteAiError;

/// A validated WGS84 position
///
/// Out-of-range values are rejected at construction, never clamped.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    /// Latitude in decimal degrees
    latitude: f64,
    /// Longitude in decimal degrees
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = RouteAiError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a new coordinate, validating both axes
    pub fn new(latitude: f64, longitude: f64) -> crate::Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(RouteAiError::validation(
                "latitude",
                format!("must be within [-90, 90], got {latitude}"),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(RouteAiError::validation(
                "longitude",
                format!("must be within [-180, 180], got {longitude}"),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build from values already known to be in range (means of valid coordinates)
    pub(crate) fn from_valid(latitude: f64, longitude: f64) -> Self {
        debug_assert!((-90.0..=90.0).contains(&latitude));
        debug_assert!((-180.0..=180.0).contains(&longitude));
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format as a coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_coordinate() {
        let coordinate = Coordinate::new(33.2382, 131.6126).unwrap();
        assert_eq!(coordinate.latitude(), 33.2382);
        assert_eq!(coordinate.longitude(), 131.6126);
        assert_eq!(coordinate.format_coordinates(), "33.2382, 131.6126");
    }

    #[rstest]
    #[case(90.5, 0.0, "latitude")]
    #[case(-91.0, 0.0, "latitude")]
    #[case(0.0, 180.1, "longitude")]
    #[case(0.0, -181.0, "longitude")]
    #[case(f64::NAN, 0.0, "latitude")]
    fn test_out_of_range_rejected(#[case] lat: f64, #[case] lon: f64, #[case] field: &str) {
        let err = Coordinate::new(lat, lon).unwrap_err();
        assert!(matches!(err, RouteAiError::Validation { field: ref f, .. } if f == field));
    }

    #[test]
    fn test_boundaries_accepted() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude": 35.0, "longitude": 139.0}"#).unwrap();
        assert_eq!(ok.latitude(), 35.0);

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 135.0, "longitude": 139.0}"#);
        assert!(bad.is_err());
    }
}
