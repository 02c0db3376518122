use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::prompt::ChatMessage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("model endpoint unreachable: {0}")]
    Transport(String),
    #[error("model endpoint rejected the credential ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("model quota exceeded: {0}")]
    Quota(String),
    #[error("model endpoint returned {status}: {message}")]
    Endpoint { status: u16, message: String },
}

/// A remote chat model that answers a message list with free text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (Groq by default).
pub struct ChatCompletionsModel {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    credential: String,
    temperature: f32,
}

impl ChatCompletionsModel {
    pub fn new(base_url: &str, model: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            credential: credential.into(),
            temperature: 0.7,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "timeout_secs",
                reason: e.to_string(),
            })?;

        let mut model = Self::new(&config.base_url, config.model.clone(), config.credential()?);
        model.http = http;
        model.temperature = config.temperature;
        Ok(model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.credential)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text).map_err(|e| ModelError::Endpoint {
            status: status.as_u16(),
            message: format!("unreadable completion envelope: {e}"),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ModelError::Endpoint {
                status: status.as_u16(),
                message: "completion contained no message content".to_string(),
            })
    }
}

fn transport_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Transport(format!("request timed out: {e}"))
    } else {
        ModelError::Transport(e.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> ModelError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().chars().take(300).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Auth {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => ModelError::Quota(message),
        _ => ModelError::Endpoint {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        let model = ChatCompletionsModel::new("https://api.groq.com/openai/v1/", "m", "k");
        assert_eq!(model.endpoint(), "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(model.name(), "m");
    }

    #[test]
    fn statuses_map_to_categories() {
        let body = r#"{"error":{"message":"Invalid API Key"}}"#;
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, body),
            ModelError::Auth { status: 401, message: "Invalid API Key".to_string() }
        );
        assert!(matches!(status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"), ModelError::Quota(m) if m == "slow down"));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            ModelError::Endpoint { status: 502, .. }
        ));
    }
}
