use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::ContentProvider;
use crate::config::ProviderConfig;
use crate::models::{GeneratedRouteContent, SpotCluster};

const SYSTEM_PROMPT: &str = "You write short travel route descriptions. \
Answer with a single JSON object with the fields routeName (string), regionDesc (string), \
recommendations (array of strings), estimatedDuration (string of the form \"N-M hours\" or \"N-M days\") \
and confidenceScore (number between 0 and 1). Do not add any other text.";

/// Chat-completions client for OpenAI-compatible endpoints
pub struct OpenAiContentProvider {
    http: ClientWithMiddleware,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiContentProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("RouteAI/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let http = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// User prompt listing the stops of a cluster
pub(crate) fn build_prompt(cluster: &SpotCluster, keywords: &[String]) -> String {
    let mut prompt = format!(
        "Create a route themed around: {}\nThe route has {} stops around {}:\n",
        keywords.join(", "),
        cluster.spot_count(),
        cluster.centroid().format_coordinates()
    );
    for spot in cluster.spots() {
        prompt.push_str(&format!("- {}", spot.name));
        if !spot.hashtags.is_empty() {
            prompt.push_str(&format!(" [{}]", spot.hashtags.join(", ")));
        }
        if !spot.description.is_empty() {
            prompt.push_str(&format!(": {}", spot.description));
        }
        prompt.push('\n');
    }
    prompt
}

/// Parse a completion body into route content, tolerating fenced JSON
pub(crate) fn parse_content(raw: &str) -> Result<GeneratedRouteContent> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).context("Provider answer is not route content JSON")
}

#[async_trait]
impl ContentProvider for OpenAiContentProvider {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[tracing::instrument(name = "generate_route_content", level = "debug", skip_all, fields(model = %self.model))]
    async fn generate(&self, cluster: &SpotCluster, keywords: &[String]) -> Result<GeneratedRouteContent> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Content provider has no API key"))?;

        let request = json!({
            "model": self.model,
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(cluster, keywords) },
            ],
        });

        debug!(model = %self.model, spots = cluster.spot_count(), "Route content request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers(api_key)?)
            .body(serde_json::to_string(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Content provider error ({status}): {error_text}"));
        }

        let chat: ChatResponse = response.json().await?;
        let raw = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Content provider returned no choices"))?;

        parse_content(&raw)
    }
}
