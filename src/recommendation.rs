//! Request orchestration
//!
//! One request runs two independent branches concurrently: stored routes
//! (cached lookup by region, then keyword filtering) and generated routes
//! (cached spot search, clustering, then per-cluster content synthesis).
//! Both are joined under a single request timeout before assembly.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembler::{AssemblyInput, ResultAssembler};
use crate::cache::{CacheStatsSnapshot, FetchOnceCache, store_from_config};
use crate::clustering::GeographicClusterer;
use crate::config::{RecommendationConfig, RouteAiConfig};
use crate::error::RouteAiError;
use crate::filter::{MatchMode, RouteFilter, RouteFilterOptions};
use crate::models::{
    ClusterOptions, ContentSource, ExistingRoute, Keyword, UnifiedRecommendationResult, keyword_strings,
    parse_keywords,
};
use crate::search::{SpotRepository, TouristSpotSearch, jittered, route_cache_key, spot_cache_key};
use crate::synthesis::{ContentProvider, OpenAiContentProvider, RouteContentSynthesizer, SynthesizedRoute};

/// Largest fraction of the request timeout one provider call may take
const PROVIDER_SHARE_OF_REQUEST: f64 = 0.8;

/// A keyword query for route recommendations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub mode: MatchMode,
    /// Cap on returned existing routes; the configured default when absent
    #[serde(default)]
    pub max_routes: Option<usize>,
    /// Overrides the configured clustering options
    #[serde(default)]
    pub cluster_options: Option<ClusterOptions>,
}

impl RecommendationRequest {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }
}

pub struct RecommendationService {
    repository: Arc<dyn SpotRepository>,
    cache: FetchOnceCache,
    search: TouristSpotSearch,
    synthesizer: RouteContentSynthesizer,
    clustering: ClusterOptions,
    settings: RecommendationConfig,
    route_ttl: Duration,
}

impl RecommendationService {
    pub fn new(
        repository: Arc<dyn SpotRepository>,
        cache: FetchOnceCache,
        synthesizer: RouteContentSynthesizer,
        config: &RouteAiConfig,
    ) -> Self {
        // provider calls must end while the request still has time to fall back
        let synthesizer = synthesizer.with_timeout_cap(
            config
                .recommendation
                .request_timeout()
                .mul_f64(PROVIDER_SHARE_OF_REQUEST),
        );
        let search = TouristSpotSearch::new(
            Arc::clone(&repository),
            cache.clone(),
            Duration::from_secs(config.cache.spot_ttl_seconds),
        );
        Self {
            repository,
            cache,
            search,
            synthesizer,
            clustering: config.clustering.options(),
            settings: config.recommendation.clone(),
            route_ttl: Duration::from_secs(config.cache.route_ttl_seconds),
        }
    }

    /// Wire the configured cache backend and content provider
    pub fn from_config(repository: Arc<dyn SpotRepository>, config: &RouteAiConfig) -> anyhow::Result<Self> {
        let store = store_from_config(&config.cache)?;

        let provider = OpenAiContentProvider::new(&config.provider)?;
        let provider: Option<Arc<dyn ContentProvider>> = if provider.is_configured() {
            info!("Content provider configured ({})", config.provider.model);
            Some(Arc::new(provider))
        } else {
            info!("No content provider API key, generated routes use template content");
            None
        };

        let synthesizer = RouteContentSynthesizer::new(provider, config.provider.timeout());
        Ok(Self::new(repository, FetchOnceCache::new(store), synthesizer, config))
    }

    /// Build the recommendation for `request`.
    ///
    /// Validation, search and clustering failures are returned; content
    /// provider failures are absorbed into template content.
    #[tracing::instrument(name = "recommend", skip_all, fields(keywords = ?request.keywords, region = ?request.region))]
    pub async fn recommend(&self, request: &RecommendationRequest) -> crate::Result<UnifiedRecommendationResult> {
        let keywords = parse_keywords(&request.keywords)?;
        let options = request.cluster_options.unwrap_or(self.clustering);
        options.validate()?;
        let max_routes = request.max_routes.unwrap_or(self.settings.default_max_routes);
        if max_routes == 0 {
            return Err(RouteAiError::validation("maxRoutes", "must be at least 1"));
        }

        let query = keyword_strings(&keywords);
        let region = request
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let existing = self.existing_routes(&query, region.as_deref(), request.mode, max_routes);
        let generated = self.generated_routes(&keywords, &query, &options);

        let timeout = self.settings.request_timeout();
        let (existing, generated) = tokio::time::timeout(timeout, async { tokio::try_join!(existing, generated) })
            .await
            .map_err(|_| RouteAiError::general(format!("Recommendation timed out after {}s", timeout.as_secs())))??;

        let ai_available = self.synthesizer.is_ai_available()
            && generated.iter().any(|route| route.source == ContentSource::Ai);

        info!(
            "Returning {} existing and {} generated routes",
            existing.len(),
            generated.len()
        );

        Ok(ResultAssembler::assemble(AssemblyInput {
            keywords: query,
            region,
            generated,
            existing,
            ai_available,
        }))
    }

    /// Like [`recommend`](Self::recommend) but never fails; errors become a
    /// zero-valued result carrying the error text.
    pub async fn recommend_or_degrade(&self, request: &RecommendationRequest) -> UnifiedRecommendationResult {
        match self.recommend(request).await {
            Ok(result) => result,
            Err(error) => ResultAssembler::build_error_response(&error, &request.keywords, request.region.as_deref()),
        }
    }

    async fn existing_routes(
        &self,
        keywords: &[String],
        region: Option<&str>,
        mode: MatchMode,
        max_routes: usize,
    ) -> crate::Result<Vec<ExistingRoute>> {
        let repository = Arc::clone(&self.repository);
        let lookup_region = region.map(str::to_string);

        let routes: Option<Vec<ExistingRoute>> = self
            .cache
            .get_or_set(
                &route_cache_key(region),
                move || async move { repository.find_routes_by_region(lookup_region.as_deref()).await },
                jittered(self.route_ttl),
            )
            .await?;

        let Some(routes) = routes else {
            warn!("Existing route lookup degraded, continuing with generated routes only");
            return Ok(Vec::new());
        };

        Ok(RouteFilter::filter(
            &routes,
            &RouteFilterOptions {
                keywords: keywords.to_vec(),
                mode,
                region: region.map(str::to_string),
                max_routes,
            },
        ))
    }

    async fn generated_routes(
        &self,
        keywords: &[Keyword],
        query: &[String],
        options: &ClusterOptions,
    ) -> crate::Result<Vec<SynthesizedRoute>> {
        let spots = self.search.search(keywords, options.min_spots_per_cluster).await?;
        let clusters = GeographicClusterer::cluster(&spots, options)?;

        let selected: Vec<_> = clusters
            .into_iter()
            .take(self.settings.max_generated_routes)
            .collect();
        info!("Synthesizing content for {} clusters", selected.len());

        Ok(join_all(
            selected
                .into_iter()
                .map(|cluster| self.synthesizer.synthesize(cluster, query)),
        )
        .await)
    }

    /// Drop the cached spot search for a keyword set
    pub async fn invalidate_spots(&self, keywords: &[Keyword]) -> crate::Result<()> {
        self.cache.invalidate(&spot_cache_key(keywords)).await
    }

    /// Drop the cached stored-route lookup for a region
    pub async fn invalidate_routes(&self, region: Option<&str>) -> crate::Result<()> {
        self.cache.invalidate(&route_cache_key(region)).await
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::models::{Coordinate, GeneratedRouteContent, SpotCluster, TouristSpot};
    use crate::search::{Catalog, JsonCatalogRepository};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spot(id: &str, name: &str, lat: f64, lon: f64, tags: &[&str]) -> TouristSpot {
        TouristSpot::new(id, name, Coordinate::new(lat, lon).unwrap())
            .with_hashtags(tags.iter().copied())
            .with_region("Oita")
    }

    fn oita_catalog() -> Catalog {
        Catalog {
            spots: vec![
                spot("harajiri", "Harajiri Falls", 32.9514, 131.4258, &["waterfall", "nature"]),
                spot("chinda", "Chinda Falls", 33.1700, 131.5600, &["waterfall"]),
                spot("ryumon", "Ryumon Falls", 33.1636, 131.2480, &["waterfall", "nature"]),
            ],
            routes: vec![
                ExistingRoute {
                    id: "kuju".to_string(),
                    route_name: "Kuju Highlands".to_string(),
                    region_desc: "Plateau walks".to_string(),
                    region: "Oita".to_string(),
                    estimated_duration: Some("3-4 hours".to_string()),
                    is_ai_generated: false,
                    spots: vec![spot("chojabaru", "Chojabaru", 33.12, 131.24, &["nature", "hiking"])],
                },
                ExistingRoute {
                    id: "beppu".to_string(),
                    route_name: "Beppu Hells".to_string(),
                    region_desc: "Hot spring tour".to_string(),
                    region: "Oita".to_string(),
                    estimated_duration: None,
                    is_ai_generated: false,
                    spots: vec![spot("umi", "Umi Jigoku", 33.3160, 131.4750, &["onsen"])],
                },
                ExistingRoute {
                    id: "old-ai".to_string(),
                    route_name: "Generated Falls".to_string(),
                    region_desc: String::new(),
                    region: "Oita".to_string(),
                    estimated_duration: None,
                    is_ai_generated: true,
                    spots: vec![spot("x", "Somewhere", 33.0, 131.5, &["waterfall"])],
                },
            ],
        }
    }

    struct ThrowingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentProvider for ThrowingProvider {
        fn is_configured(&self) -> bool {
            true
        }

        async fn generate(&self, _cluster: &SpotCluster, _keywords: &[String]) -> anyhow::Result<GeneratedRouteContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("provider exploded"))
        }
    }

    fn service(synthesizer: RouteContentSynthesizer) -> RecommendationService {
        RecommendationService::new(
            Arc::new(JsonCatalogRepository::new(oita_catalog())),
            FetchOnceCache::new(Arc::new(MemoryCacheStore::new())),
            synthesizer,
            &RouteAiConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_oita_waterfall_scenario() {
        let service = service(RouteContentSynthesizer::fallback_only());
        let request = RecommendationRequest::new(["waterfall", "nature"]).with_region("Oita");

        let result = service.recommend(&request).await.unwrap();

        assert_eq!(result.summary.existing_routes_found, 1);
        assert_eq!(result.existing_routes[0].id, "kuju");
        assert_eq!(result.generated_routes.len(), 1);

        let generated = &result.generated_routes[0];
        assert_eq!(generated.spot_count, 3);
        assert!((0.0..=1.0).contains(&generated.confidence_score));
        assert!(result.message.contains("Oita"));
        assert!(result.message.contains("waterfall, nature"));
        assert!(!result.summary.ai_available);
    }

    #[tokio::test]
    async fn test_throwing_provider_still_yields_routes() {
        let provider = Arc::new(ThrowingProvider {
            calls: AtomicUsize::new(0),
        });
        let service = service(RouteContentSynthesizer::new(
            Some(provider.clone()),
            Duration::from_secs(1),
        ));

        let result = service
            .recommend_or_degrade(&RecommendationRequest::new(["waterfall"]))
            .await;

        assert!(!result.generated_routes.is_empty());
        assert!(!result.summary.ai_available);
        assert!(result.generated_routes.iter().all(|r| r.content_source == ContentSource::Fallback));
        assert_eq!(provider.calls.load(Ordering::SeqCst), result.generated_routes.len());
    }

    #[tokio::test]
    async fn test_invalid_request_degrades_to_error_response() {
        let service = service(RouteContentSynthesizer::fallback_only());

        let empty = RecommendationRequest::new(Vec::<String>::new());
        assert!(matches!(
            service.recommend(&empty).await,
            Err(RouteAiError::Validation { .. })
        ));

        let result = service
            .recommend_or_degrade(&RecommendationRequest::new(["castle"]))
            .await;
        assert!(result.generated_routes.is_empty());
        assert_eq!(result.summary.total_routes_returned, 0);
        assert!(result.message.contains("castle"));
    }

    #[tokio::test]
    async fn test_out_of_range_radius_is_rejected() {
        let service = service(RouteContentSynthesizer::fallback_only());
        let mut request = RecommendationRequest::new(["waterfall"]);
        request.cluster_options = Some(ClusterOptions {
            proximity_radius_km: 500.0,
            ..ClusterOptions::default()
        });

        assert!(matches!(
            service.recommend(&request).await,
            Err(RouteAiError::Validation { .. })
        ));
    }

    struct SleepyProvider;

    #[async_trait]
    impl ContentProvider for SleepyProvider {
        fn is_configured(&self) -> bool {
            true
        }

        async fn generate(&self, _cluster: &SpotCluster, _keywords: &[String]) -> anyhow::Result<GeneratedRouteContent> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(anyhow::anyhow!("woke up too late"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_falls_back_before_request_deadline() {
        // the synthesizer alone would wait longer than the whole request
        let service = service(RouteContentSynthesizer::new(
            Some(Arc::new(SleepyProvider)),
            Duration::from_secs(3600),
        ));
        let request = RecommendationRequest::new(["waterfall", "nature"]).with_region("Oita");

        let started = tokio::time::Instant::now();
        let result = service.recommend(&request).await.unwrap();

        assert!(started.elapsed() < RouteAiConfig::default().recommendation.request_timeout());
        assert_eq!(result.generated_routes.len(), 1);
        assert_eq!(result.generated_routes[0].content_source, ContentSource::Fallback);
        assert_eq!(result.summary.existing_routes_found, 1);
    }

    /// Answers spot searches after a delay and never answers route lookups
    struct StalledRepository {
        inner: JsonCatalogRepository,
    }

    #[async_trait]
    impl SpotRepository for StalledRepository {
        async fn find_spots_by_keywords(&self, keywords: &[String]) -> anyhow::Result<Vec<TouristSpot>> {
            tokio::time::sleep(Duration::from_secs(20)).await;
            self.inner.find_spots_by_keywords(keywords).await
        }

        async fn find_routes_by_region(&self, _region: Option<&str>) -> anyhow::Result<Vec<ExistingRoute>> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct HangingProvider {
        started: AtomicUsize,
        dropped: Arc<AtomicUsize>,
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ContentProvider for HangingProvider {
        fn is_configured(&self) -> bool {
            true
        }

        async fn generate(&self, _cluster: &SpotCluster, _keywords: &[String]) -> anyhow::Result<GeneratedRouteContent> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _guard = DropCounter(Arc::clone(&self.dropped));
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_abandons_pending_work() {
        let provider = Arc::new(HangingProvider::default());
        let service = RecommendationService::new(
            Arc::new(StalledRepository {
                inner: JsonCatalogRepository::new(oita_catalog()),
            }),
            FetchOnceCache::new(Arc::new(MemoryCacheStore::new())),
            RouteContentSynthesizer::new(Some(provider.clone()), Duration::from_secs(3600)),
            &RouteAiConfig::default(),
        );
        let request = RecommendationRequest::new(["waterfall", "nature"]).with_region("Oita");

        let err = service.recommend(&request).await.unwrap_err();
        assert!(matches!(err, RouteAiError::General { ref message } if message.contains("timed out after 45s")));
        assert!(provider.started.load(Ordering::SeqCst) >= 1);
        assert_eq!(
            provider.dropped.load(Ordering::SeqCst),
            provider.started.load(Ordering::SeqCst)
        );

        let degraded = service.recommend_or_degrade(&request).await;
        assert!(degraded.generated_routes.is_empty());
        assert!(degraded.existing_routes.is_empty());
        assert_eq!(degraded.summary.total_routes_returned, 0);
        assert!(!degraded.summary.ai_available);
        assert!(degraded.message.contains("timed out"));
        assert_eq!(
            provider.dropped.load(Ordering::SeqCst),
            provider.started.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_repeated_requests_hit_the_cache() {
        let service = service(RouteContentSynthesizer::fallback_only());
        let request = RecommendationRequest::new(["waterfall", "nature"]).with_region("Oita");

        service.recommend(&request).await.unwrap();
        service.recommend(&request).await.unwrap();

        let stats = service.cache_stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);

        service.invalidate_routes(Some("Oita")).await.unwrap();
        service
            .invalidate_spots(&parse_keywords(&["nature", "waterfall"]).unwrap())
            .await
            .unwrap();
        service.recommend(&request).await.unwrap();
        assert_eq!(service.cache_stats().misses, 4);
    }
}
