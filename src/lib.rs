//! `RouteAI` - Keyword driven travel route recommendations
//!
//! This library turns a handful of keywords into route suggestions: it finds
//! matching tourist spots, groups them into geographic clusters, describes
//! each cluster through an optional content provider (with a deterministic
//! fallback), and merges the result with curated routes that match the same
//! keywords.

pub mod assembler;
pub mod cache;
pub mod clustering;
pub mod config;
pub mod error;
pub mod filter;
pub mod geo;
pub mod hashtags;
pub mod models;
pub mod recommendation;
pub mod search;
pub mod synthesis;

// Re-export core types for public API
pub use assembler::{AssemblyInput, ResultAssembler};
pub use cache::{CacheStore, FetchOnceCache, FjallCacheStore, MemoryCacheStore};
pub use clustering::GeographicClusterer;
pub use config::RouteAiConfig;
pub use error::{ErrorCode, RouteAiError};
pub use filter::{MatchMode, RouteFilter, RouteFilterOptions};
pub use models::{
    ClusterOptions, Coordinate, ExistingRoute, GeneratedRouteContent, SpotCluster, TouristSpot,
    UnifiedRecommendationResult,
};
pub use recommendation::{RecommendationRequest, RecommendationService};
pub use search::{Catalog, JsonCatalogRepository, SpotRepository, TouristSpotSearch};
pub use synthesis::{ContentProvider, OpenAiContentProvider, RouteContentSynthesizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RouteAiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
