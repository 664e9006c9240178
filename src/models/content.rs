//! Generated route content and its contract

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RouteAiError;

static DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+-[0-9]+ (hours|days)$").expect("valid duration pattern"));

/// Content produced for one cluster, by the provider or the fallback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRouteContent {
    pub route_name: String,
    pub region_desc: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// "<int>-<int> (hours|days)"
    pub estimated_duration: String,
    /// Heuristic trust in [0, 1]
    pub confidence_score: f64,
}

impl GeneratedRouteContent {
    /// Check the content contract shared by both synthesis paths
    pub fn validate(&self) -> crate::Result<()> {
        if self.route_name.trim().is_empty() {
            return Err(RouteAiError::content_generation("routeName must not be empty"));
        }
        if self.region_desc.trim().is_empty() {
            return Err(RouteAiError::content_generation("regionDesc must not be empty"));
        }
        if !DURATION_PATTERN.is_match(&self.estimated_duration) {
            return Err(RouteAiError::content_generation(format!(
                "estimatedDuration '{}' does not match '<int>-<int> (hours|days)'",
                self.estimated_duration
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(RouteAiError::content_generation(format!(
                "confidenceScore {} outside [0, 1]",
                self.confidence_score
            )));
        }
        Ok(())
    }
}
