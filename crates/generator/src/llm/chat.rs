//! OpenAI-compatible chat completions provider

use super::{ChatRequest, LlmProvider};
use abapify_common::{AbapifyError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Endpoint and defaults of a chat-completions service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
}

pub const GROQ: ProviderProfile = ProviderProfile {
    name: "groq",
    base_url: "https://api.groq.com/openai/v1",
    default_model: "meta-llama/llama-4-maverick-17b-128e-instruct",
};

pub const OPENAI: ProviderProfile = ProviderProfile {
    name: "openai",
    base_url: "https://api.openai.com/v1",
    default_model: "gpt-4o",
};

pub const ARCEE: ProviderProfile = ProviderProfile {
    name: "arcee",
    base_url: "https://conductor.arcee.ai/v1",
    default_model: "auto",
};

/// Known profiles, in default-selection order
pub const PROFILES: [ProviderProfile; 3] = [GROQ, OPENAI, ARCEE];

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Provider speaking `POST {base}/chat/completions`
pub struct ChatCompletionsProvider {
    profile: ProviderProfile,
    base_url: String,
    credential: Option<String>,
    client: Client,
}

impl ChatCompletionsProvider {
    pub fn new(profile: ProviderProfile, credential: Option<String>) -> Result<Self> {
        if credential.is_none() {
            warn!("No credential configured for provider {}", profile.name);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AbapifyError::LlmApi(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            profile,
            base_url: profile.base_url.to_string(),
            credential,
            client,
        })
    }

    /// Point the provider at another endpoint
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn api_error(&self, message: impl std::fmt::Display) -> AbapifyError {
        let message = format!("{} API error: {}", self.profile.name, message);
        error!("{}", message);
        AbapifyError::LlmApi(message)
    }
}

impl LlmProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn default_model(&self) -> &'static str {
        self.profile.default_model
    }

    fn generate(&self, request: &ChatRequest) -> Result<String> {
        let model = request.model.as_deref().unwrap_or(self.profile.default_model);
        info!("Using {} model: {}", self.profile.name, model);

        let body = CompletionRequest {
            model,
            messages: [
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
            max_tokens: request.max_tokens,
        };

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(credential) = &self.credential {
            builder = builder.bearer_auth(credential);
        }

        let response = builder
            .send()
            .map_err(|e| self.api_error(format!("network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(self.api_error(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .map_err(|e| self.api_error(format!("failed to read response: {}", e)))?;
        extract_content(&text).map_err(|message| self.api_error(message))
    }
}

/// Content of the first choice of a completion response body
fn extract_content(body: &str) -> std::result::Result<String, String> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {}", e))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| "response contains no choices".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"REPORT z_demo."}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "REPORT z_demo.");
    }

    #[test]
    fn test_extract_content_failures() {
        assert!(extract_content(r#"{"choices":[]}"#).is_err());
        assert!(extract_content(r#"{"id":"x"}"#).is_err());
        assert!(extract_content(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
        assert!(extract_content("<html>").unwrap_err().starts_with("malformed"));
    }

    #[test]
    fn test_unreachable_endpoint_is_api_error() {
        let provider = ChatCompletionsProvider::new(GROQ, Some("secret".to_string()))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/v1/");
        assert_eq!(provider.endpoint(), "http://127.0.0.1:9/v1/chat/completions");

        let request = ChatRequest::new("system", "user", 0.7, 16);
        let err = provider.generate(&request).unwrap_err();
        assert!(matches!(err, AbapifyError::LlmApi(ref m) if m.starts_with("groq API error")));
    }

    #[test]
    fn test_profiles() {
        assert_eq!(PROFILES.map(|p| p.name), ["groq", "openai", "arcee"]);
        assert_eq!(OPENAI.default_model, "gpt-4o");
    }
}
