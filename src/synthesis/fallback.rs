//! Deterministic route content used when no provider answer is usable

use crate::models::{GeneratedRouteContent, SpotCluster};

/// Baseline score of unverified template content
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const MAX_RECOMMENDATIONS: usize = 5;
const MAX_TAGS_PER_RECOMMENDATION: usize = 3;

/// Duration bucket by number of stops
#[must_use]
pub fn estimated_duration(spot_count: usize) -> &'static str {
    match spot_count {
        0..=3 => "1-2 hours",
        4..=6 => "3-4 hours",
        _ => "1-2 days",
    }
}

/// Template content; a pure function of the cluster and keywords
#[must_use]
pub fn fallback_content(cluster: &SpotCluster, keywords: &[String]) -> GeneratedRouteContent {
    let n = cluster.spot_count();

    let theme = match keywords {
        [] => "Local Highlights".to_string(),
        [only] => title_case(only),
        [first, second, ..] => format!("{} & {}", title_case(first), title_case(second)),
    };
    let route_name = format!("{theme} Route ({n} spots)");

    let anchor = cluster
        .spots()
        .first()
        .map_or("the area", |spot| spot.name.as_str());
    let region_desc = if keywords.is_empty() {
        format!("A {n}-stop route starting at {anchor}")
    } else {
        format!(
            "A {n}-stop route starting at {anchor}, themed around {}",
            keywords.join(", ")
        )
    };

    let recommendations = cluster
        .spots()
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|spot| {
            let tags: Vec<String> = spot
                .hashtags
                .iter()
                .filter(|t| !t.trim().is_empty())
                .take(MAX_TAGS_PER_RECOMMENDATION)
                .map(|t| format!("#{}", t.trim().trim_start_matches('#')))
                .collect();
            if tags.is_empty() {
                format!("Visit {}", spot.name)
            } else {
                format!("Visit {} ({})", spot.name, tags.join(" "))
            }
        })
        .collect();

    GeneratedRouteContent {
        route_name,
        region_desc,
        recommendations,
        estimated_duration: estimated_duration(n).to_string(),
        confidence_score: FALLBACK_CONFIDENCE,
    }
}

fn title_case(word: &str) -> String {
    word.split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
