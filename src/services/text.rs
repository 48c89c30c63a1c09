use async_trait::async_trait;
use thiserror::Error;

/// Reasons a text generator produced nothing usable.
///
/// Callers treat every variant as "unavailable" and apply their own fallback policy.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("completion was empty")]
    EmptyCompletion,

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// One system+user prompt pair and its sampling options
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.7,
            max_output_tokens: 256,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// External text generator used for self-descriptions and match messages
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// Generator that is never available
///
/// `OpenAiClient::into_generator` hands this out when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
        Err(GenerationError::MissingCredential)
    }
}
