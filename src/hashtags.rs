//! Lowercased hashtag sets and the bidirectional substring match

use std::collections::HashSet;

use crate::models::TouristSpot;

/// Lowercase, deduplicated tags of one or more spots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashtagSet {
    tags: HashSet<String>,
}

impl HashtagSet {
    /// Flatten the tags of every spot, lowercasing each once
    pub fn from_spots<'a, I>(spots: I) -> Self
    where
        I: IntoIterator<Item = &'a TouristSpot>,
    {
        let tags = spots
            .into_iter()
            .flat_map(|spot| spot.hashtags.iter())
            .map(|tag| normalize(tag))
            .filter(|tag| !tag.is_empty())
            .collect();
        Self { tags }
    }

    /// `keyword` must already be lowercased
    #[must_use]
    pub fn matches(&self, keyword: &str) -> bool {
        if self.tags.contains(keyword) {
            return true;
        }
        self.tags
            .iter()
            .any(|tag| tag.contains(keyword) || keyword.contains(tag.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Lowercase and drop a leading '#'
#[must_use]
pub fn normalize(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}
