//! Data models for the RouteAI library
//!
//! This module contains the core domain models organized by concern:
//! - Coordinate: validated geographic positions
//! - Spot: tourist spots and stored routes
//! - Keyword: boundary validation of search terms
//! - Cluster: clustering options and clusters
//! - Content: generated route text and its contract
//! - Recommendation: the public response shapes

pub mod cluster;
pub mod content;
pub mod coordinate;
pub mod keyword;
pub mod recommendation;
pub mod spot;

// Re-export all public types for convenient access
pub use cluster::{ClusterOptions, SpotCluster};
pub use content::GeneratedRouteContent;
pub use coordinate::Coordinate;
pub use keyword::{Keyword, keyword_strings, parse_keywords};
pub use recommendation::{
    ContentSource, FilteredRoute, GeneratedRoute, RecommendationSummary, RouteSpotView,
    UnifiedRecommendationResult,
};
pub use spot::{ExistingRoute, TouristSpot};
