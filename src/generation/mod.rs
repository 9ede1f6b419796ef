pub mod dto;
pub mod payload;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GenerationConfig;

pub use payload::{CourseOutline, LessonPayload, ModuleOutline, clean_json_payload};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service is not configured")]
    Unavailable,

    #[error("request to generation service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("generation service returned no text")]
    EmptyResponse,

    #[error("malformed generation output: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Short label shown to users in fallback warnings.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Unavailable => "Unavailable",
            GenerationError::Http(e) if e.is_timeout() => "Timeout",
            GenerationError::Http(_) => "ConnectionError",
            GenerationError::Status { .. } => "ServiceError",
            GenerationError::EmptyResponse => "EmptyResponse",
            GenerationError::Malformed(_) => "MalformedResponse",
        }
    }
}

/// The external text-generation service, treated as a black box.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerationError>;
}

pub struct GeminiHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiHttpClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = config.api_key.clone().ok_or(GenerationError::Unavailable)?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiHttpClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        debug!("requesting generation from model {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&dto::GenerateContentRequest::from_prompt(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("generation service error {}: {}", status, body);
            return Err(GenerationError::Status { status, body });
        }

        let parsed: dto::GenerateContentResponse = response.json().await?;
        parsed.text().ok_or(GenerationError::EmptyResponse)
    }
}

/// Stand-in used when no API key is configured; every call fails.
pub struct UnavailableGenerationClient;

#[async_trait]
impl GenerationClient for UnavailableGenerationClient {
    async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable)
    }
}

/// Picks the HTTP client when a key is configured, the unavailable stand-in otherwise.
pub fn client_from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerationClient>, GenerationError> {
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; content generation is disabled");
        return Ok(Arc::new(UnavailableGenerationClient));
    }
    Ok(Arc::new(GeminiHttpClient::new(config)?))
}
