//! Route content synthesis
//!
//! Every cluster gets valid content: the provider answer when it arrives in
//! time and passes validation, otherwise the deterministic template.

pub mod fallback;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::{ContentSource, GeneratedRouteContent, SpotCluster};

pub use fallback::{FALLBACK_CONFIDENCE, estimated_duration, fallback_content};
pub use openai::OpenAiContentProvider;

/// Generative backend producing route content for a cluster
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Whether credentials are present; unconfigured providers are never called
    fn is_configured(&self) -> bool;

    async fn generate(&self, cluster: &SpotCluster, keywords: &[String]) -> Result<GeneratedRouteContent>;
}

/// A cluster paired with the content describing it
#[derive(Debug, Clone)]
pub struct SynthesizedRoute {
    pub cluster: SpotCluster,
    pub content: GeneratedRouteContent,
    pub source: ContentSource,
}

pub struct RouteContentSynthesizer {
    provider: Option<Arc<dyn ContentProvider>>,
    timeout: Duration,
}

impl RouteContentSynthesizer {
    pub fn new(provider: Option<Arc<dyn ContentProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Bound the per-cluster provider wait to at most `cap`
    #[must_use]
    pub fn with_timeout_cap(mut self, cap: Duration) -> Self {
        self.timeout = self.timeout.min(cap);
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Synthesizer that only ever uses the template
    #[must_use]
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    #[must_use]
    pub fn is_ai_available(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_configured())
    }

    /// Content for one cluster. Never fails.
    pub async fn synthesize(&self, cluster: SpotCluster, keywords: &[String]) -> SynthesizedRoute {
        if let Some(provider) = self.provider.as_ref().filter(|p| p.is_configured()) {
            match tokio::time::timeout(self.timeout, provider.generate(&cluster, keywords)).await {
                Ok(Ok(content)) => match content.validate() {
                    Ok(()) => {
                        debug!("Provider content accepted for '{}'", content.route_name);
                        return SynthesizedRoute {
                            cluster,
                            content,
                            source: ContentSource::Ai,
                        };
                    }
                    Err(e) => warn!("Provider content rejected, using fallback: {e}"),
                },
                Ok(Err(e)) => warn!("Content provider failed, using fallback: {e:#}"),
                Err(_) => warn!(
                    "Content provider timed out after {:?}, using fallback",
                    self.timeout
                ),
            }
        }

        let content = fallback_content(&cluster, keywords);
        debug_assert!(
            content.validate().is_ok(),
            "fallback content must satisfy the content contract"
        );
        SynthesizedRoute {
            cluster,
            content,
            source: ContentSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, TouristSpot};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cluster() -> SpotCluster {
        SpotCluster::from_spots(vec![
            TouristSpot::new("a", "Harajiri Falls", Coordinate::new(32.95, 131.42).unwrap())
                .with_hashtags(["waterfall"]),
            TouristSpot::new("b", "Chinda Falls", Coordinate::new(33.0, 131.45).unwrap())
                .with_hashtags(["waterfall"]),
        ])
        .unwrap()
    }

    fn keywords() -> Vec<String> {
        vec!["waterfall".to_string()]
    }

    fn good_content() -> GeneratedRouteContent {
        GeneratedRouteContent {
            route_name: "Bungo-ono Falls Walk".to_string(),
            region_desc: "Two waterfalls south of Oita".to_string(),
            recommendations: vec!["Bring a towel".to_string()],
            estimated_duration: "2-3 hours".to_string(),
            confidence_score: 0.9,
        }
    }

    enum Behaviour {
        Good,
        Fail,
        Invalid,
        Slow,
    }

    struct StubProvider {
        behaviour: Behaviour,
        configured: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                configured: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ContentProvider for StubProvider {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(&self, _cluster: &SpotCluster, _keywords: &[String]) -> Result<GeneratedRouteContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Good => Ok(good_content()),
                Behaviour::Fail => Err(anyhow::anyhow!("503 Service Unavailable")),
                Behaviour::Invalid => Ok(GeneratedRouteContent {
                    estimated_duration: "about an hour".to_string(),
                    ..good_content()
                }),
                Behaviour::Slow => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(good_content())
                }
            }
        }
    }

    #[tokio::test]
    async fn test_provider_content_is_used_when_valid() {
        let synthesizer = RouteContentSynthesizer::new(Some(StubProvider::new(Behaviour::Good)), Duration::from_secs(1));
        let route = synthesizer.synthesize(cluster(), &keywords()).await;
        assert_eq!(route.source, ContentSource::Ai);
        assert_eq!(route.content, good_content());
    }

    #[tokio::test]
    async fn test_failing_provider_falls_back() {
        let synthesizer = RouteContentSynthesizer::new(Some(StubProvider::new(Behaviour::Fail)), Duration::from_secs(1));
        let route = synthesizer.synthesize(cluster(), &keywords()).await;
        assert_eq!(route.source, ContentSource::Fallback);
        assert_eq!(route.content, fallback_content(&cluster(), &keywords()));
    }

    #[tokio::test]
    async fn test_invalid_provider_content_falls_back() {
        let synthesizer =
            RouteContentSynthesizer::new(Some(StubProvider::new(Behaviour::Invalid)), Duration::from_secs(1));
        let route = synthesizer.synthesize(cluster(), &keywords()).await;
        assert_eq!(route.source, ContentSource::Fallback);
        assert!(route.content.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let synthesizer =
            RouteContentSynthesizer::new(Some(StubProvider::new(Behaviour::Slow)), Duration::from_millis(100));
        let route = synthesizer.synthesize(cluster(), &keywords()).await;
        assert_eq!(route.source, ContentSource::Fallback);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_never_called() {
        let provider = Arc::new(StubProvider {
            behaviour: Behaviour::Good,
            configured: false,
            calls: AtomicUsize::new(0),
        });
        let synthesizer = RouteContentSynthesizer::new(Some(provider.clone()), Duration::from_secs(1));

        assert!(!synthesizer.is_ai_available());
        let route = synthesizer.synthesize(cluster(), &keywords()).await;
        assert_eq!(route.source, ContentSource::Fallback);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(!RouteContentSynthesizer::fallback_only().is_ai_available());
    }

    #[rstest::rstest]
    #[case(vec![])]
    #[case(vec!["waterfall".to_string()])]
    #[case(vec!["   ".to_string(), "".to_string()])]
    #[tokio::test]
    async fn test_fallback_content_always_validates(#[case] keywords: Vec<String>) {
        let route = RouteContentSynthesizer::fallback_only()
            .synthesize(cluster(), &keywords)
            .await;
        assert_eq!(route.source, ContentSource::Fallback);
        assert!(route.content.validate().is_ok());
    }

    #[test]
    fn test_timeout_cap_only_shortens() {
        let capped = RouteContentSynthesizer::new(None, Duration::from_secs(60)).with_timeout_cap(Duration::from_secs(36));
        assert_eq!(capped.timeout(), Duration::from_secs(36));

        let untouched = RouteContentSynthesizer::new(None, Duration::from_secs(20)).with_timeout_cap(Duration::from_secs(36));
        assert_eq!(untouched.timeout(), Duration::from_secs(20));
    }
}
