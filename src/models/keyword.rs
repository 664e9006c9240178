//! Keyword validation

use serde::{Deserialize, Serialize};

use crate::error::RouteAiError;

/// Maximum keyword length in characters
pub const MAX_KEYWORD_CHARS: usize = 50;

/// Maximum number of keywords in a single request
pub const MAX_KEYWORDS: usize = 10;

/// A validated, trimmed search keyword
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Keyword(String);

impl Keyword {
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let trimmed = raw.trim().trim_start_matches('#').trim();
        if trimmed.is_empty() {
            return Err(RouteAiError::validation("keyword", "must not be empty"));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_KEYWORD_CHARS {
            return Err(RouteAiError::validation(
                "keyword",
                format!("must be at most {MAX_KEYWORD_CHARS} characters, got {chars}"),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Keyword {
    type Error = RouteAiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Keyword::parse(&value)
    }
}

impl From<Keyword> for String {
    fn from(keyword: Keyword) -> Self {
        keyword.0
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a keyword list at the boundary, keeping the caller's order
pub fn parse_keywords<S: AsRef<str>>(raw: &[S]) -> crate::Result<Vec<Keyword>> {
    if raw.is_empty() {
        return Err(RouteAiError::validation("keywords", "must contain at least one keyword"));
    }
    if raw.len() > MAX_KEYWORDS {
        return Err(RouteAiError::validation(
            "keywords",
            format!("must contain at most {MAX_KEYWORDS} keywords, got {}", raw.len()),
        ));
    }
    raw.iter().map(|k| Keyword::parse(k.as_ref())).collect()
}

/// Plain strings for downstream consumers
#[must_use]
pub fn keyword_strings(keywords: &[Keyword]) -> Vec<String> {
    keywords.iter().map(|k| k.as_str().to_string()).collect()
}
