//! OpenAI-compatible provider implementation.
//!
//! Defaults to OpenRouter, but works with any endpoint exposing
//! `/chat/completions` in the OpenAI format (OpenAI, Ollama, vLLM, ...).
//!
//! Requests carry OpenRouter's attribution headers (`X-Title`, and
//! `HTTP-Referer` when an app URL is configured).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stakeholder_config::ProviderConfig;
use stakeholder_core::error::ProviderError;
use stakeholder_core::message::Message;
use stakeholder_core::provider::*;
use tracing::{debug, warn};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// An OpenAI-compatible completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    default_max_tokens: u32,
    default_temperature: f32,
    app_title: Option<String>,
    app_url: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: "anthropic/claude-3-haiku".into(),
            default_max_tokens: 8192,
            default_temperature: 0.7,
            app_title: None,
            app_url: None,
            client,
        })
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key)
    }

    /// Build from the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured(
                "OPENROUTER_API_KEY environment variable is required".into(),
            )
        })?;

        let name = if config.base_url.contains("openrouter.ai") {
            "openrouter"
        } else {
            "openai-compatible"
        };

        Ok(Self::new(name, &config.base_url, api_key)?
            .with_defaults(
                &config.default_model,
                config.default_max_tokens,
                config.default_temperature,
            )
            .with_attribution(Some(config.app_title.clone()), config.app_url.clone()))
    }

    /// Values applied when a request leaves them unset.
    pub fn with_defaults(mut self, model: &str, max_tokens: u32, temperature: f32) -> Self {
        self.default_model = model.to_string();
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    pub fn with_attribution(mut self, title: Option<String>, url: Option<String>) -> Self {
        self.app_title = title.filter(|t| !t.is_empty());
        self.app_url = url.filter(|u| !u.is_empty());
        self
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    /// Build the JSON body, filling unset fields from the defaults.
    fn request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model.as_deref().unwrap_or(&self.default_model),
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature.unwrap_or(self.default_temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.default_max_tokens),
            "stream": false,
        })
    }

    /// Turn a parsed API response into our domain response.
    fn into_response(api_response: ApiResponse, requested_model: &str) -> ProviderResponse {
        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let model = api_response
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| requested_model.to_string());

        ProviderResponse {
            content,
            usage,
            model,
        }
    }
}

#[async_trait]
impl stakeholder_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);
        let model = body["model"].as_str().unwrap_or(&self.default_model).to_string();

        debug!(
            provider = %self.name,
            model = %model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");

        if let Some(title) = &self.app_title {
            builder = builder.header("X-Title", title);
        }
        if let Some(referer) = &self.app_url {
            builder = builder.header("HTTP-Referer", referer);
        }

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(Self::into_response(api_response, &model))
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeholder_core::Provider;

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test").unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("local", "http://localhost:11434/v1/", "x").unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("You are Dana"),
            Message::user("Earlier question"),
            Message::assistant("Earlier answer"),
            Message::user("Hello"),
        ];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        let roles: Vec<&str> = api_messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn body_uses_defaults_when_unset() {
        let provider = OpenAiCompatProvider::openrouter("k")
            .unwrap()
            .with_defaults("openai/gpt-4o-mini", 2048, 0.3);
        let body = provider.request_body(&ProviderRequest::new("sys", vec![], "hi"));
        assert_eq!(body["model"], "openai/gpt-4o-mini");
        assert_eq!(body["max_tokens"], 2048);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn body_prefers_request_values() {
        let provider = OpenAiCompatProvider::openrouter("k").unwrap();
        let request = ProviderRequest::new("sys", vec![], "hi")
            .with_model(Some("mistral/large".into()))
            .with_temperature(Some(1.5))
            .with_max_tokens(Some(100));
        let body = provider.request_body(&request);
        assert_eq!(body["model"], "mistral/large");
        assert_eq!(body["max_tokens"], 100);
        assert!((body["temperature"].as_f64().unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn response_parsing_reports_server_model() {
        let data = r#"{"model":"anthropic/claude-3-haiku-20240307","choices":[{"message":{"role":"assistant","content":"Too costly."}}],"usage":{"prompt_tokens":40,"completion_tokens":3,"total_tokens":43}}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let response = OpenAiCompatProvider::into_response(parsed, "anthropic/claude-3-haiku");
        assert_eq!(response.content, "Too costly.");
        assert_eq!(response.model, "anthropic/claude-3-haiku-20240307");
        assert_eq!(response.usage.prompt_tokens, 40);
        assert_eq!(response.usage.completion_tokens, 3);
    }

    #[test]
    fn response_parsing_falls_back() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let response = OpenAiCompatProvider::into_response(parsed, "requested/model");
        assert_eq!(response.content, "");
        assert_eq!(response.model, "requested/model");
        assert_eq!(response.usage, Usage::default());
    }

    #[test]
    fn from_config_requires_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            OpenAiCompatProvider::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn from_config_carries_attribution() {
        let config = ProviderConfig {
            api_key: Some("k".into()),
            app_url: Some("https://example.test".into()),
            ..ProviderConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.app_title.as_deref(), Some("Stakeholder MCP Server"));
        assert_eq!(provider.app_url.as_deref(), Some("https://example.test"));
    }
}
