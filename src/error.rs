//! Error types and handling for `RouteAI`

use serde::Serialize;
use thiserror::Error;

/// Main error type for the `RouteAI` library
///
/// This is also the "known application error" of the fetch-once cache: a
/// producer that fails with a `RouteAiError` has it handed back to the
/// caller, every other producer failure degrades to a missing value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteAiError {
    /// Malformed caller input
    #[error("Invalid input: {field} {constraint}")]
    Validation { field: String, constraint: String },

    /// No usable spots for the requested keywords
    #[error("Search error: {message}")]
    Search { message: String },

    /// Clustering produced nothing usable
    #[error("Clustering error: {message}")]
    Clustering {
        message: String,
        hint: Option<String>,
    },

    /// Content provider unavailable or failing
    #[error("Content generation error: {message}")]
    ContentGeneration { message: String },

    /// Downstream storage failure
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

/// Stable, machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Validation,
    Search,
    Clustering,
    ContentGeneration,
    Persistence,
    Config,
    Cache,
    General,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Search => "SEARCH_ERROR",
            ErrorCode::Clustering => "CLUSTERING_ERROR",
            ErrorCode::ContentGeneration => "CONTENT_GENERATION_ERROR",
            ErrorCode::Persistence => "PERSISTENCE_ERROR",
            ErrorCode::Config => "CONFIG_ERROR",
            ErrorCode::Cache => "CACHE_ERROR",
            ErrorCode::General => "GENERAL_ERROR",
        }
    }

    /// Whether the caller, rather than the system, is at fault
    #[must_use]
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorCode::Validation | ErrorCode::Search)
    }
}

impl RouteAiError {
    /// Create a new validation error for `field`
    pub fn validation<F: Into<String>, C: Into<String>>(field: F, constraint: C) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a new search error
    pub fn search<S: Into<String>>(message: S) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    /// Create a new clustering error with an operator hint
    pub fn clustering<S: Into<String>, H: Into<String>>(message: S, hint: H) -> Self {
        Self::Clustering {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Create a new content generation error
    pub fn content_generation<S: Into<String>>(message: S) -> Self {
        Self::ContentGeneration {
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            RouteAiError::Validation { .. } => ErrorCode::Validation,
            RouteAiError::Search { .. } => ErrorCode::Search,
            RouteAiError::Clustering { .. } => ErrorCode::Clustering,
            RouteAiError::ContentGeneration { .. } => ErrorCode::ContentGeneration,
            RouteAiError::Persistence { .. } => ErrorCode::Persistence,
            RouteAiError::Config { .. } => ErrorCode::Config,
            RouteAiError::Cache { .. } => ErrorCode::Cache,
            RouteAiError::General { .. } => ErrorCode::General,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            RouteAiError::Validation { field, constraint } => {
                format!("Invalid input: {field} {constraint}")
            }
            RouteAiError::Search { message } => format!("Nothing found: {message}"),
            RouteAiError::Clustering { message, hint } => match hint {
                Some(hint) => format!("Could not build routes ({message}). Try to {hint}."),
                None => format!("Could not build routes ({message})."),
            },
            RouteAiError::ContentGeneration { .. } => {
                "Route descriptions are temporarily unavailable.".to_string()
            }
            RouteAiError::Persistence { .. } => {
                "Stored routes could not be read. Please try again later.".to_string()
            }
            RouteAiError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            RouteAiError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            RouteAiError::General { message } => message.clone(),
        }
    }
}
