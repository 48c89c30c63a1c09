use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use crate::services::text::{CompletionRequest, DisabledGenerator, GenerationError, TextGenerator};

/// OpenAI-compatible chat completions client
///
/// Without an API key every call returns `GenerationError::MissingCredential`
/// and no request is sent.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            // A blank key counts as missing
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            client,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// This client, or `DisabledGenerator` when no API key is set
    pub fn into_generator(self) -> Arc<dyn TextGenerator> {
        if self.has_credential() {
            Arc::new(self)
        } else {
            Arc::new(DisabledGenerator)
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("OpenAI API key not set - skipping text generation");
            return Err(GenerationError::MissingCredential);
        };

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Text generation failed: {} - {}", status, text);
            return Err(GenerationError::ApiError(format!("status {}", status)));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyCompletion)?;

        tracing::debug!(
            "Completion finished (reason: {})",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        );

        choice
            .message
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(GenerationError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: String, api_key: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(base_url, api_key.map(String::from), "gpt-4o".to_string(), 5).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let client = client("http://127.0.0.1:9".to_string(), Some("  "));
        assert!(!client.has_credential());

        let result = client.generate(&CompletionRequest::new("sys", "user")).await;
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_keyless_client_never_calls_the_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let generator = client(server.url(), None).into_generator();
        let result = generator.generate(&CompletionRequest::new("sys", "user")).await;

        assert!(matches!(result, Err(GenerationError::MissingCredential)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_keyed_client_stays_live() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"Hi"}}]}"#)
            .create_async()
            .await;

        let generator = client(server.url(), Some("sk-test")).into_generator();
        let text = generator.generate(&CompletionRequest::new("sys", "user")).await.unwrap();

        assert_eq!(text, "Hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "max_tokens": 200,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"  Juicy news!  "},"finish_reason":"stop"}]}"#)
            .create_async()
            .await;

        let client = client(server.url(), Some("sk-test"));
        let request = CompletionRequest::new("sys", "user").with_max_output_tokens(200);
        let text = client.generate(&request).await.unwrap();

        assert_eq!(text, "Juicy news!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client(server.url(), Some("sk-test"));
        let result = client.generate(&CompletionRequest::new("sys", "user")).await;

        assert!(matches!(result, Err(GenerationError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_empty_choices_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = client(server.url(), Some("sk-test"));
        let result = client.generate(&CompletionRequest::new("sys", "user")).await;

        assert!(matches!(result, Err(GenerationError::EmptyCompletion)));
    }
}
