//! Configuration management for `RouteAI`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::RouteAiError;
use crate::models::ClusterOptions;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `RouteAI`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteAiConfig {
    /// Content provider configuration
    pub provider: ProviderConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// Default clustering bounds
    pub clustering: ClusteringConfig,
    /// Recommendation request limits
    pub recommendation: RecommendationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Content provider (OpenAI-compatible chat completion API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key; the provider counts as unconfigured without one
    pub api_key: Option<String>,
    /// Base URL of the chat completion API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Per-call timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store backend: "memory" or "fjall"
    pub backend: String,
    /// Directory of the fjall store (defaults to the user cache dir)
    pub location: Option<String>,
    /// TTL of spot search results in seconds
    pub spot_ttl_seconds: u64,
    /// TTL of existing-route lookups in seconds
    pub route_ttl_seconds: u64,
}

/// Default clustering bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub proximity_radius_km: f64,
    pub min_spots_per_cluster: usize,
    pub max_spots_per_cluster: usize,
}

/// Recommendation request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Existing routes returned when the request does not say
    pub default_max_routes: usize,
    /// Upper bound on clusters sent to content synthesis
    pub max_generated_routes: usize,
    /// Whole-request timeout in seconds
    pub request_timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_provider_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_provider_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_provider_timeout() -> u32 {
    20
}

fn default_provider_max_retries() -> u32 {
    2
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_spot_ttl() -> u64 {
    60 * 60
}

fn default_route_ttl() -> u64 {
    10 * 60
}

fn default_max_routes() -> usize {
    5
}

fn default_max_generated_routes() -> usize {
    3
}

fn default_request_timeout() -> u32 {
    45
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_provider_base_url(),
            model: default_provider_model(),
            timeout_seconds: default_provider_timeout(),
            max_retries: default_provider_max_retries(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            location: None,
            spot_ttl_seconds: default_spot_ttl(),
            route_ttl_seconds: default_route_ttl(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let options = ClusterOptions::default();
        Self {
            proximity_radius_km: options.proximity_radius_km,
            min_spots_per_cluster: options.min_spots_per_cluster,
            max_spots_per_cluster: options.max_spots_per_cluster,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_max_routes: default_max_routes(),
            max_generated_routes: default_max_generated_routes(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ProviderConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds))
    }
}

impl ClusteringConfig {
    #[must_use]
    pub fn options(&self) -> ClusterOptions {
        ClusterOptions {
            proximity_radius_km: self.proximity_radius_km,
            min_spots_per_cluster: self.min_spots_per_cluster,
            max_spots_per_cluster: self.max_spots_per_cluster,
        }
    }
}

impl RecommendationConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_timeout_seconds))
    }
}

impl RouteAiConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // ROUTEAI_PROVIDER__API_KEY, ROUTEAI_CACHE__BACKEND, ...
        builder = builder.add_source(
            Environment::with_prefix("ROUTEAI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: RouteAiConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("routeai").join("config.toml"))
    }

    /// Apply default values to zeroed or empty fields
    pub fn apply_defaults(&mut self) {
        if self.provider.base_url.is_empty() {
            self.provider.base_url = default_provider_base_url();
        }
        if self.provider.model.is_empty() {
            self.provider.model = default_provider_model();
        }
        if self.provider.timeout_seconds == 0 {
            self.provider.timeout_seconds = default_provider_timeout();
        }
        if self.cache.backend.is_empty() {
            self.cache.backend = default_cache_backend();
        }
        if self.cache.spot_ttl_seconds == 0 {
            self.cache.spot_ttl_seconds = default_spot_ttl();
        }
        if self.cache.route_ttl_seconds == 0 {
            self.cache.route_ttl_seconds = default_route_ttl();
        }
        if self.recommendation.default_max_routes == 0 {
            self.recommendation.default_max_routes = default_max_routes();
        }
        if self.recommendation.request_timeout_seconds == 0 {
            self.recommendation.request_timeout_seconds = default_request_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.provider.api_key {
            if api_key.is_empty() {
                return Err(RouteAiError::config(
                    "Provider API key cannot be empty if provided. Either remove it or provide a valid key."
                ).into());
            }

            if api_key.len() < 8 {
                return Err(RouteAiError::config(
                    "Provider API key appears to be invalid (too short). Please check your API key."
                ).into());
            }
        }

        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds > 120 {
            return Err(RouteAiError::config("Provider timeout cannot exceed 120 seconds").into());
        }

        if self.provider.max_retries > 10 {
            return Err(RouteAiError::config("Provider max retries cannot exceed 10").into());
        }

        if self.cache.spot_ttl_seconds > 7 * 24 * 60 * 60 {
            return Err(RouteAiError::config("Spot cache TTL cannot exceed one week").into());
        }

        if self.recommendation.max_generated_routes > 10 {
            return Err(RouteAiError::config("Maximum generated routes cannot exceed 10").into());
        }

        if self.recommendation.request_timeout_seconds > 300 {
            return Err(RouteAiError::config("Request timeout cannot exceed 300 seconds").into());
        }

        if self.provider.timeout_seconds >= self.recommendation.request_timeout_seconds {
            return Err(RouteAiError::config(
                "Provider timeout must be shorter than the request timeout",
            )
            .into());
        }

        self.clustering
            .options()
            .validate()
            .map_err(|e| RouteAiError::config(format!("Invalid clustering defaults: {e}")))?;

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RouteAiError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RouteAiError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_backends = ["memory", "fjall"];
        if !valid_backends.contains(&self.cache.backend.as_str()) {
            return Err(RouteAiError::config(format!(
                "Invalid cache backend '{}'. Must be one of: {}",
                self.cache.backend,
                valid_backends.join(", ")
            ))
            .into());
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(RouteAiError::config(
                "Provider base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
