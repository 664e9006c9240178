//! Tourist spot search
//!
//! Resolves a keyword list to candidate spots through a [`SpotRepository`],
//! memoized per normalized keyword set in the fetch-once cache.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::FetchOnceCache;
use crate::error::RouteAiError;
use crate::hashtags::{HashtagSet, normalize};
use crate::models::{ExistingRoute, Keyword, TouristSpot};

/// Read access to spots and stored routes owned by the persistence layer
#[async_trait]
pub trait SpotRepository: Send + Sync {
    async fn find_spots_by_keywords(&self, keywords: &[String]) -> Result<Vec<TouristSpot>>;

    /// Stored routes, optionally narrowed to a region by the backend
    async fn find_routes_by_region(&self, region: Option<&str>) -> Result<Vec<ExistingRoute>>;
}

/// On-disk catalog format read by [`JsonCatalogRepository`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub spots: Vec<TouristSpot>,
    #[serde(default)]
    pub routes: Vec<ExistingRoute>,
}

/// Repository over an in-memory catalog, optionally loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct JsonCatalogRepository {
    catalog: Catalog,
}

impl JsonCatalogRepository {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load a catalog file of the form `{"spots": [...], "routes": [...]}`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        debug!(
            "Loaded {} spots and {} routes from {}",
            catalog.spots.len(),
            catalog.routes.len(),
            path.display()
        );
        Ok(Self { catalog })
    }
}

#[async_trait]
impl SpotRepository for JsonCatalogRepository {
    async fn find_spots_by_keywords(&self, keywords: &[String]) -> Result<Vec<TouristSpot>> {
        let lowered: Vec<String> = keywords.iter().map(|k| normalize(k)).collect();
        Ok(self
            .catalog
            .spots
            .iter()
            .filter(|spot| {
                let tags = HashtagSet::from_spots([*spot]);
                let name = spot.name.to_lowercase();
                lowered
                    .iter()
                    .any(|k| tags.matches(k) || name.contains(k.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn find_routes_by_region(&self, region: Option<&str>) -> Result<Vec<ExistingRoute>> {
        let needle = region.map(str::to_lowercase);
        Ok(self
            .catalog
            .routes
            .iter()
            .filter(|route| match &needle {
                Some(needle) => route.region.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }
}

/// Cache key of a keyword set; order and case do not matter
#[must_use]
pub fn spot_cache_key(keywords: &[Keyword]) -> String {
    let mut normalized: Vec<String> = keywords.iter().map(|k| normalize(k.as_str())).collect();
    normalized.sort();
    normalized.dedup();
    format!("spots:{}", normalized.join(","))
}

/// Cache key of an existing-route lookup
#[must_use]
pub fn route_cache_key(region: Option<&str>) -> String {
    match region {
        Some(region) => format!("routes:{}", region.trim().to_lowercase()),
        None => "routes:*all".to_string(),
    }
}

/// Spread expiries so entries written together do not all lapse together
pub(crate) fn jittered(ttl: Duration) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f64(jitter)
}

/// Keyword-to-spot resolution with caching
pub struct TouristSpotSearch {
    repository: Arc<dyn SpotRepository>,
    cache: FetchOnceCache,
    ttl: Duration,
}

impl TouristSpotSearch {
    pub fn new(repository: Arc<dyn SpotRepository>, cache: FetchOnceCache, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }

    /// Candidate spots for `keywords`, at least `min_spots` of them.
    ///
    /// Returns a Search error when nothing (or too little) is found and a
    /// Persistence error when the repository lookup degraded.
    pub async fn search(&self, keywords: &[Keyword], min_spots: usize) -> crate::Result<Vec<TouristSpot>> {
        let key = spot_cache_key(keywords);
        let repository = Arc::clone(&self.repository);
        let query: Vec<String> = keywords.iter().map(|k| k.as_str().to_string()).collect();

        let spots: Option<Vec<TouristSpot>> = self
            .cache
            .get_or_set(
                &key,
                move || async move { repository.find_spots_by_keywords(&query).await },
                jittered(self.ttl),
            )
            .await?;

        let Some(mut spots) = spots else {
            return Err(RouteAiError::persistence("Spot lookup is currently unavailable"));
        };

        // repositories may return the same spot once per matching keyword
        spots.sort_by(|a, b| a.id.cmp(&b.id));
        spots.dedup_by(|a, b| a.id == b.id);

        let joined = keywords
            .iter()
            .map(Keyword::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if spots.is_empty() {
            return Err(RouteAiError::search(format!("No spots found for keywords: {joined}")));
        }
        if spots.len() < min_spots {
            return Err(RouteAiError::search(format!(
                "Only {} spots found for keywords: {joined}, at least {min_spots} are needed to build a route",
                spots.len()
            )));
        }

        info!("Found {} candidate spots for [{}]", spots.len(), joined);
        Ok(spots)
    }
}
