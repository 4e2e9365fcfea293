use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::ai::parse::CollaboratorParseError;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// A single prompt sent to the text generation service. Every
/// collaborator-backed operation sends exactly one of these.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRequest {
    pub system_message: String,
    pub user_message: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system_message: &str, user_message: String) -> Self {
        Self {
            system_message: system_message.to_string(),
            user_message,
            max_output_tokens: 256,
            temperature: 0.3,
        }
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("text generation request failed: {0}")]
    Request(String),
    #[error("text generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("text generation response had no content: {0}")]
    MissingContent(String),
    #[error(transparent)]
    Parse(#[from] CollaboratorParseError),
    #[error("failed to render prompt: {0}")]
    Prompt(String),
}

impl CollaboratorError {
    /// The raw collaborator output, when there was one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            CollaboratorError::Status { body, .. } => Some(body),
            CollaboratorError::MissingContent(raw) => Some(raw),
            CollaboratorError::Parse(e) => Some(&e.raw_response),
            CollaboratorError::Request(_) | CollaboratorError::Prompt(_) => None,
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        CollaboratorError::Request(err.to_string())
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CollaboratorError>;
}

pub async fn completion(
    messages: &[Message],
    max_tokens: u32,
    temperature: f32,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Value, CollaboratorError> {
    let payload = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
        "temperature": temperature,
    });
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60))
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(CollaboratorError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|_| CollaboratorError::MissingContent(text))
}

/// Chat completions client for any OpenAI compatible API (OpenAI,
/// Groq, a local llama.cpp server, etc).
#[derive(Clone, Debug)]
pub struct OpenAiGenerator {
    api_hostname: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        let messages = vec![
            Message::new(Role::System, &request.system_message),
            Message::new(Role::User, &request.user_message),
        ];
        let resp = completion(
            &messages,
            request.max_output_tokens,
            request.temperature,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;

        tracing::debug!("Completion response: {}", resp);

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CollaboratorError::MissingContent(resp.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "test-model",
                "max_tokens": 128,
                "messages": [
                    {"role": "system", "content": "You are a test."},
                    {"role": "user", "content": "Hello"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Hi there"}}]}"#)
            .create_async()
            .await;

        let generator = OpenAiGenerator::new(&server.url(), "test-key", "test-model");
        let request = CompletionRequest::new("You are a test.", String::from("Hello"))
            .max_output_tokens(128);
        let text = generator.generate(&request).await.unwrap();

        assert_eq!(text, "Hi there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid API Key"}}"#)
            .create_async()
            .await;

        let generator = OpenAiGenerator::new(&server.url(), "bad-key", "test-model");
        let request = CompletionRequest::new("system", String::from("user"));
        let err = generator.generate(&request).await.unwrap_err();

        assert!(matches!(err, CollaboratorError::Status { status: 401, .. }));
        assert!(err.raw_response().unwrap().contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn test_generate_fails_without_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let generator = OpenAiGenerator::new(&server.url(), "key", "model");
        let request = CompletionRequest::new("system", String::from("user"));
        let err = generator.generate(&request).await.unwrap_err();

        assert!(matches!(err, CollaboratorError::MissingContent(_)));
    }

    #[test]
    fn test_temperature_is_clamped() {
        let request = CompletionRequest::new("s", String::from("u")).temperature(1.7);
        assert_eq!(request.temperature, 1.0);
    }
}
