//! Clustering options and cluster shapes

use serde::{Deserialize, Serialize};

use super::{Coordinate, TouristSpot};
use crate::error::RouteAiError;
use crate::geo;

/// Largest proximity radius accepted, in km
pub const MAX_PROXIMITY_RADIUS_KM: f64 = 200.0;

/// Bounds for the proximity clusterer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptions {
    pub proximity_radius_km: f64,
    pub min_spots_per_cluster: usize,
    pub max_spots_per_cluster: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            proximity_radius_km: 50.0,
            min_spots_per_cluster: 2,
            max_spots_per_cluster: 8,
        }
    }
}

impl ClusterOptions {
    /// Reject out-of-range bounds before any clustering work starts
    pub fn validate(&self) -> crate::Result<()> {
        let radius = self.proximity_radius_km;
        if !radius.is_finite() || radius <= 0.0 || radius > MAX_PROXIMITY_RADIUS_KM {
            return Err(RouteAiError::validation(
                "proximityRadiusKm",
                format!("must be in (0, {MAX_PROXIMITY_RADIUS_KM}], got {radius}"),
            ));
        }
        if self.min_spots_per_cluster < 1 {
            return Err(RouteAiError::validation(
                "minSpotsPerCluster",
                "must be at least 1",
            ));
        }
        if self.max_spots_per_cluster < self.min_spots_per_cluster {
            return Err(RouteAiError::validation(
                "maxSpotsPerCluster",
                format!(
                    "must be at least minSpotsPerCluster ({}), got {}",
                    self.min_spots_per_cluster, self.max_spots_per_cluster
                ),
            ));
        }
        Ok(())
    }
}

/// A proximity-bounded group of spots, the unit of route synthesis
///
/// `average_distance_km` is the mean distance from each member to the
/// centroid (0 for a single spot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpotCluster {
    spots: Vec<TouristSpot>,
    centroid: Coordinate,
    average_distance_km: f64,
    spot_count: usize,
}

impl SpotCluster {
    /// Build a cluster and its derived attributes; `None` for an empty list
    #[must_use]
    pub fn from_spots(spots: Vec<TouristSpot>) -> Option<Self> {
        let coordinates: Vec<Coordinate> = spots.iter().map(|s| s.coordinate).collect();
        let centroid = geo::centroid(&coordinates)?;
        let total: f64 = coordinates
            .iter()
            .map(|c| geo::distance_km(c, &centroid))
            .sum();
        let spot_count = spots.len();
        Some(Self {
            spots,
            centroid,
            average_distance_km: total / spot_count as f64,
            spot_count,
        })
    }

    #[must_use]
    pub fn spots(&self) -> &[TouristSpot] {
        &self.spots
    }

    #[must_use]
    pub fn centroid(&self) -> Coordinate {
        self.centroid
    }

    #[must_use]
    pub fn average_distance_km(&self) -> f64 {
        self.average_distance_km
    }

    #[must_use]
    pub fn spot_count(&self) -> usize {
        self.spot_count
    }
}
