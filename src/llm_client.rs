// LLM text generation over the OpenAI chat-completions and Anthropic messages APIs
use crate::config::Settings;
use crate::error::LlmError;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub provider: Provider,
    pub name: &'static str,
    pub description: &'static str,
}

pub const AVAILABLE_MODELS: [ModelInfo; 6] = [
    ModelInfo {
        id: "gpt-4o-mini",
        provider: Provider::OpenAi,
        name: "GPT-4o Mini",
        description: "Fast, cost-effective model for most tasks",
    },
    ModelInfo {
        id: "gpt-4o",
        provider: Provider::OpenAi,
        name: "GPT-4o",
        description: "Most capable OpenAI model",
    },
    ModelInfo {
        id: "gpt-4-turbo",
        provider: Provider::OpenAi,
        name: "GPT-4 Turbo",
        description: "Advanced reasoning and longer context",
    },
    ModelInfo {
        id: "gpt-3.5-turbo",
        provider: Provider::OpenAi,
        name: "GPT-3.5 Turbo",
        description: "Legacy fast model",
    },
    ModelInfo {
        id: "claude-3-5-sonnet-20241022",
        provider: Provider::Anthropic,
        name: "Claude 3.5 Sonnet",
        description: "Anthropic's most capable model",
    },
    ModelInfo {
        id: "claude-3-haiku-20240307",
        provider: Provider::Anthropic,
        name: "Claude 3 Haiku",
        description: "Fast and efficient Anthropic model",
    },
];

pub fn find_model(model: &str) -> Result<&'static ModelInfo, LlmError> {
    AVAILABLE_MODELS
        .iter()
        .find(|m| m.id == model)
        .ok_or_else(|| LlmError::UnknownModel {
            model: model.to_string(),
            available: AVAILABLE_MODELS
                .iter()
                .map(|m| m.id)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[async_trait]
pub trait LlmService: Send + Sync {
    fn model(&self) -> &str;

    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Build the client for `model`. Fails on an unknown model or a missing provider key.
pub fn create_llm_client(model: &str, settings: &Settings) -> Result<Arc<dyn LlmService>, LlmError> {
    let info = find_model(model)?;
    let key = match info.provider {
        Provider::OpenAi => settings.openai_api_key.clone(),
        Provider::Anthropic => settings.anthropic_api_key.clone(),
    };
    let api_key = key.ok_or_else(|| LlmError::MissingApiKey(format!("{:?}", info.provider)))?;
    Ok(Arc::new(HttpLlmClient::new(info, api_key, settings.request_timeout)))
}

#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    client: Client,
    api_key: String,
    model: &'static ModelInfo,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl HttpLlmClient {
    pub fn new(model: &'static ModelInfo, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            timeout,
        }
    }

    fn backoff_config(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            multiplier: 2.0,
            max_elapsed_time: Some(self.timeout),
            ..Default::default()
        }
    }

    /// POST with retries on connection errors, timeouts, 429 and 5xx.
    async fn post_with_retry(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<String, LlmError> {
        let operation = || async {
            let mut request = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .timeout(self.timeout)
                .json(&body);

            request = match self.model.provider {
                Provider::OpenAi => request.bearer_auth(&self.api_key),
                Provider::Anthropic => request
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01"),
            };

            let response = request.send().await.map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    tracing::warn!("{} connection error (retrying): {}", self.model.id, e);
                    backoff::Error::transient(LlmError::Request(e.to_string()))
                } else {
                    backoff::Error::permanent(LlmError::Request(e.to_string()))
                }
            })?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| backoff::Error::permanent(LlmError::Request(e.to_string())))?;

            tracing::debug!("{} response (status {}): {} bytes", self.model.id, status, text.len());

            if status.as_u16() == 429 || status.is_server_error() {
                tracing::warn!("{} returned {} (retrying)", self.model.id, status);
                return Err(backoff::Error::transient(LlmError::Request(format!(
                    "API error ({}): {}",
                    status, text
                ))));
            }
            if !status.is_success() {
                tracing::error!("{} permanent error ({}): {}", self.model.id, status, text);
                return Err(backoff::Error::permanent(LlmError::Request(format!(
                    "API error ({}): {}",
                    status, text
                ))));
            }
            Ok(text)
        };

        retry(self.backoff_config(), operation).await
    }
}

#[async_trait]
impl LlmService for HttpLlmClient {
    fn model(&self) -> &str {
        self.model.id
    }

    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let content = match self.model.provider {
            Provider::OpenAi => {
                let body = json!({
                    "model": self.model.id,
                    "messages": [{"role": "user", "content": prompt}],
                    "max_tokens": max_tokens,
                    "temperature": 0.7,
                });
                let text = self
                    .post_with_retry("https://api.openai.com/v1/chat/completions", body)
                    .await?;
                let parsed: OpenAiResponse = serde_json::from_str(&text)
                    .map_err(|e| LlmError::Request(format!("Failed to parse response: {}", e)))?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
            Provider::Anthropic => {
                let body = json!({
                    "model": self.model.id,
                    "max_tokens": max_tokens,
                    "messages": [{"role": "user", "content": prompt}],
                });
                let text = self
                    .post_with_retry("https://api.anthropic.com/v1/messages", body)
                    .await?;
                let parsed: AnthropicResponse = serde_json::from_str(&text)
                    .map_err(|e| LlmError::Request(format!("Failed to parse response: {}", e)))?;
                parsed.content.into_iter().find_map(|block| match block {
                    AnthropicContent::Text { text } => Some(text),
                    AnthropicContent::Other => None,
                })
            }
        };

        match content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_lookup() {
        assert_eq!(find_model("gpt-4o-mini").unwrap().provider, Provider::OpenAi);
        assert_eq!(
            find_model("claude-3-haiku-20240307").unwrap().provider,
            Provider::Anthropic
        );
        match find_model("llama-2") {
            Err(LlmError::UnknownModel { model, available }) => {
                assert_eq!(model, "llama-2");
                assert!(available.contains("gpt-4o"));
            }
            other => panic!("unexpected: {:?}", other.map(|m| m.id)),
        }
    }

    #[test]
    fn test_missing_key_is_reported() {
        let settings = Settings::default();
        assert!(matches!(
            create_llm_client("gpt-4o", &settings),
            Err(LlmError::MissingApiKey(_))
        ));

        let settings = Settings {
            anthropic_api_key: Some("sk-ant".into()),
            ..Settings::default()
        };
        let client = create_llm_client("claude-3-5-sonnet-20241022", &settings).unwrap();
        assert_eq!(client.model(), "claude-3-5-sonnet-20241022");
    }
}
