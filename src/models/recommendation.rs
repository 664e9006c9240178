//! Public recommendation response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A spot as presented inside a returned route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpotView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub hashtags: Vec<String>,
    /// The request's query keywords, not a per-spot match
    pub matched_keywords: Vec<String>,
}

/// Where a generated route's text came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Ai,
    Fallback,
}

/// A route synthesized from one cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRoute {
    pub route_name: String,
    pub region_desc: String,
    pub recommendations: Vec<String>,
    pub estimated_duration: String,
    pub confidence_score: f64,
    pub is_ai_generated: bool,
    pub content_source: ContentSource,
    pub spot_count: usize,
    pub centroid: Coordinate,
    pub average_distance_km: f64,
    pub spots: Vec<RouteSpotView>,
}

/// A stored route that survived filtering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilteredRoute {
    pub id: String,
    pub route_name: String,
    pub region_desc: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    pub is_ai_generated: bool,
    pub spot_count: usize,
    pub spots: Vec<RouteSpotView>,
}

/// Aggregates over both route lists
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub existing_routes_found: usize,
    pub generated_routes_count: usize,
    pub total_routes_returned: usize,
    pub total_spots: usize,
    pub ai_available: bool,
    pub keywords: Vec<String>,
    pub region: Option<String>,
}

/// The single response of a recommendation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRecommendationResult {
    pub generated_routes: Vec<GeneratedRoute>,
    pub existing_routes: Vec<FilteredRoute>,
    pub summary: RecommendationSummary,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}
