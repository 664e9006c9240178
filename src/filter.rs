//! Keyword and region filtering of stored routes

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hashtags::{HashtagSet, normalize};
use crate::models::ExistingRoute;

pub const DEFAULT_MAX_ROUTES: usize = 5;

/// How multiple keywords combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every keyword must match
    All,
    /// At least one keyword must match
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteFilterOptions {
    pub keywords: Vec<String>,
    pub mode: MatchMode,
    pub region: Option<String>,
    pub max_routes: usize,
}

impl Default for RouteFilterOptions {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            mode: MatchMode::default(),
            region: None,
            max_routes: DEFAULT_MAX_ROUTES,
        }
    }
}

pub struct RouteFilter;

impl RouteFilter {
    /// Routes relevant to the keywords, in input order, at most `max_routes`
    #[must_use]
    pub fn filter(routes: &[ExistingRoute], options: &RouteFilterOptions) -> Vec<ExistingRoute> {
        let region = options
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_lowercase);

        let keywords: Vec<String> = options
            .keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .collect();

        let selected: Vec<ExistingRoute> = routes
            .iter()
            .filter(|route| !route.is_ai_generated)
            .filter(|route| match &region {
                Some(region) => route.region.to_lowercase().contains(region.as_str()),
                None => true,
            })
            .map(|route| (route, HashtagSet::from_spots(&route.spots)))
            .filter(|(_, tags)| match options.mode {
                MatchMode::All => keywords.iter().all(|k| tags.matches(k)),
                MatchMode::Any => keywords.iter().any(|k| tags.matches(k)),
            })
            .take(options.max_routes)
            .map(|(route, _)| route.clone())
            .collect();

        debug!(
            "Kept {} of {} existing routes ({:?} mode)",
            selected.len(),
            routes.len(),
            options.mode
        );
        selected
    }
}
