//! Merging generated and stored routes into the public response

use chrono::Utc;
use tracing::{info, warn};

use crate::error::RouteAiError;
use crate::models::{
    ContentSource, ExistingRoute, FilteredRoute, GeneratedRoute, RecommendationSummary, RouteSpotView,
    TouristSpot, UnifiedRecommendationResult,
};
use crate::synthesis::SynthesizedRoute;

/// Everything a successful response is built from
#[derive(Debug, Clone)]
pub struct AssemblyInput {
    pub keywords: Vec<String>,
    pub region: Option<String>,
    pub generated: Vec<SynthesizedRoute>,
    pub existing: Vec<ExistingRoute>,
    pub ai_available: bool,
}

pub struct ResultAssembler;

impl ResultAssembler {
    #[must_use]
    pub fn assemble(input: AssemblyInput) -> UnifiedRecommendationResult {
        let AssemblyInput {
            keywords,
            region,
            generated,
            existing,
            ai_available,
        } = input;

        let generated_routes: Vec<GeneratedRoute> = generated
            .into_iter()
            .map(|route| generated_route(route, &keywords))
            .collect();
        let existing_routes: Vec<FilteredRoute> = existing
            .into_iter()
            .map(|route| filtered_route(route, &keywords))
            .collect();

        let total_spots = generated_routes.iter().map(|r| r.spot_count).sum::<usize>()
            + existing_routes.iter().map(|r| r.spot_count).sum::<usize>();

        let message = summary_message(
            existing_routes.len(),
            generated_routes.len(),
            &keywords,
            region.as_deref(),
        );

        UnifiedRecommendationResult {
            summary: RecommendationSummary {
                existing_routes_found: existing_routes.len(),
                generated_routes_count: generated_routes.len(),
                total_routes_returned: existing_routes.len() + generated_routes.len(),
                total_spots,
                ai_available,
                keywords,
                region,
            },
            generated_routes,
            existing_routes,
            message,
            generated_at: Utc::now(),
        }
    }

    /// Zero-valued response carrying the error text
    #[must_use]
    pub fn build_error_response(
        error: &RouteAiError,
        keywords: &[String],
        region: Option<&str>,
    ) -> UnifiedRecommendationResult {
        let code = error.code();
        if code.is_client_error() {
            info!("Returning empty recommendation after {} failure: {error}", code.as_str());
        } else {
            warn!("Returning empty recommendation after {} failure: {error}", code.as_str());
        }
        UnifiedRecommendationResult {
            generated_routes: Vec::new(),
            existing_routes: Vec::new(),
            summary: RecommendationSummary {
                keywords: keywords.to_vec(),
                region: region.map(str::to_string),
                ..RecommendationSummary::default()
            },
            message: format!("Could not build recommendations: {}", error.user_message()),
            generated_at: Utc::now(),
        }
    }
}

fn summary_message(existing: usize, generated: usize, keywords: &[String], region: Option<&str>) -> String {
    format!(
        "Found {existing} existing and generated {generated} new routes for \"{}\" in {}",
        keywords.join(", "),
        region.unwrap_or("all regions")
    )
}

fn spot_view(spot: TouristSpot, keywords: &[String]) -> RouteSpotView {
    RouteSpotView {
        latitude: spot.coordinate.latitude(),
        longitude: spot.coordinate.longitude(),
        id: spot.id,
        name: spot.name,
        description: spot.description,
        hashtags: spot.hashtags,
        matched_keywords: keywords.to_vec(),
    }
}

fn generated_route(route: SynthesizedRoute, keywords: &[String]) -> GeneratedRoute {
    let SynthesizedRoute {
        cluster,
        content,
        source,
    } = route;
    GeneratedRoute {
        route_name: content.route_name,
        region_desc: content.region_desc,
        recommendations: content.recommendations,
        estimated_duration: content.estimated_duration,
        confidence_score: content.confidence_score,
        is_ai_generated: source == ContentSource::Ai,
        content_source: source,
        spot_count: cluster.spot_count(),
        centroid: cluster.centroid(),
        average_distance_km: cluster.average_distance_km(),
        spots: cluster
            .spots()
            .iter()
            .cloned()
            .map(|spot| spot_view(spot, keywords))
            .collect(),
    }
}

fn filtered_route(route: ExistingRoute, keywords: &[String]) -> FilteredRoute {
    FilteredRoute {
        spot_count: route.spots.len(),
        id: route.id,
        route_name: route.route_name,
        region_desc: route.region_desc,
        region: route.region,
        estimated_duration: route.estimated_duration,
        is_ai_generated: route.is_ai_generated,
        spots: route
            .spots
            .into_iter()
            .map(|spot| spot_view(spot, keywords))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, SpotCluster};
    use crate::synthesis::fallback_content;

    fn keywords() -> Vec<String> {
        vec!["waterfall".to_string(), "nature".to_string()]
    }

    fn synthesized() -> SynthesizedRoute {
        let cluster = SpotCluster::from_spots(vec![
            TouristSpot::new("a", "Harajiri Falls", Coordinate::new(32.95, 131.42).unwrap())
                .with_hashtags(["waterfall"]),
            TouristSpot::new("b", "Chinda Falls", Coordinate::new(33.0, 131.45).unwrap())
                .with_hashtags(["waterfall", "nature"]),
        ])
        .unwrap();
        let content = fallback_content(&cluster, &keywords());
        SynthesizedRoute {
            cluster,
            content,
            source: ContentSource::Fallback,
        }
    }

    fn existing() -> ExistingRoute {
        ExistingRoute {
            id: "r1".to_string(),
            route_name: "Kuju Highlands".to_string(),
            region_desc: "Plateau walks".to_string(),
            region: "Oita".to_string(),
            estimated_duration: Some("3-4 hours".to_string()),
            is_ai_generated: false,
            spots: vec![
                TouristSpot::new("k1", "Kuju Flower Park", Coordinate::new(33.05, 131.25).unwrap()),
                TouristSpot::new("k2", "Chojabaru", Coordinate::new(33.12, 131.24).unwrap()),
                TouristSpot::new("k3", "Tadewara Marsh", Coordinate::new(33.11, 131.22).unwrap()),
            ],
        }
    }

    #[test]
    fn test_assemble_aggregates_both_lists() {
        let result = ResultAssembler::assemble(AssemblyInput {
            keywords: keywords(),
            region: Some("Oita".to_string()),
            generated: vec![synthesized()],
            existing: vec![existing()],
            ai_available: false,
        });

        assert_eq!(result.summary.existing_routes_found, 1);
        assert_eq!(result.summary.generated_routes_count, 1);
        assert_eq!(result.summary.total_routes_returned, 2);
        assert_eq!(result.summary.total_spots, 5);
        assert!(!result.summary.ai_available);
        assert_eq!(
            result.message,
            "Found 1 existing and generated 1 new routes for \"waterfall, nature\" in Oita"
        );

        let generated = &result.generated_routes[0];
        assert!(!generated.is_ai_generated);
        assert_eq!(generated.content_source, ContentSource::Fallback);
        assert_eq!(generated.spot_count, 2);
        assert!(generated.spots.iter().all(|s| s.matched_keywords == keywords()));

        let filtered = &result.existing_routes[0];
        assert_eq!(filtered.spot_count, 3);
        assert_eq!(filtered.spots[0].latitude, 33.05);
    }

    #[test]
    fn test_message_without_region() {
        let result = ResultAssembler::assemble(AssemblyInput {
            keywords: vec!["onsen".to_string()],
            region: None,
            generated: vec![],
            existing: vec![],
            ai_available: true,
        });
        assert_eq!(
            result.message,
            "Found 0 existing and generated 0 new routes for \"onsen\" in all regions"
        );
        assert_eq!(result.summary.total_spots, 0);
    }

    #[test]
    fn test_error_response_is_zero_valued() {
        let error = RouteAiError::clustering("no viable clusters formed", "widen the proximity radius");
        let result = ResultAssembler::build_error_response(&error, &keywords(), Some("Oita"));

        assert!(result.generated_routes.is_empty());
        assert!(result.existing_routes.is_empty());
        assert_eq!(result.summary.total_routes_returned, 0);
        assert!(!result.summary.ai_available);
        assert_eq!(result.summary.region.as_deref(), Some("Oita"));
        assert!(result.message.contains("no viable clusters formed"));
    }

    #[test]
    fn test_client_error_response_carries_user_message() {
        let error = RouteAiError::search("no spots match castle");
        assert!(error.code().is_client_error());

        let result = ResultAssembler::build_error_response(&error, &["castle".to_string()], None);
        assert!(result.generated_routes.is_empty());
        assert_eq!(result.summary.region, None);
        assert_eq!(
            result.message,
            "Could not build recommendations: Nothing found: no spots match castle"
        );
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let result = ResultAssembler::assemble(AssemblyInput {
            keywords: keywords(),
            region: None,
            generated: vec![synthesized()],
            existing: vec![],
            ai_available: false,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["generatedRoutes"][0]["spots"][0]["matchedKeywords"].is_array());
        assert_eq!(json["generatedRoutes"][0]["contentSource"], "fallback");
        assert_eq!(json["summary"]["existingRoutesFound"], 0);
        assert!(json["generatedAt"].is_string());
    }
}
