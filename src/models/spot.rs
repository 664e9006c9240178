//! Tourist spot and existing route models

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A point of interest owned by the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TouristSpot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub coordinate: Coordinate,
    /// Free-text tags, matched case-insensitively
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
}

impl TouristSpot {
    /// Create a spot with the required fields only
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            coordinate,
            hashtags: Vec::new(),
            address: None,
            region: None,
            opening_hours: None,
        }
    }

    #[must_use]
    pub fn with_hashtags<I, S>(mut self, hashtags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashtags = hashtags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// A curated route already stored by the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExistingRoute {
    pub id: String,
    pub route_name: String,
    #[serde(default)]
    pub region_desc: String,
    /// Region label used by the region pre-filter
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    /// Routes previously produced by the generator
    #[serde(default)]
    pub is_ai_generated: bool,
    #[serde(default)]
    pub spots: Vec<TouristSpot>,
}
