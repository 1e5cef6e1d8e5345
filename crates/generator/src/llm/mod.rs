//! LLM providers and provider routing

pub mod chat;

pub use chat::{ChatCompletionsProvider, ProviderProfile, PROFILES};

use abapify_common::{AbapifyError, LlmSettings, Result};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One system + user exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Provider default when unset
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system_prompt: &str, user_prompt: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            model: None,
            temperature,
            max_tokens,
        }
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(str::to_string);
        self
    }
}

/// A text-generation backend
pub trait LlmProvider {
    fn name(&self) -> &'static str;

    fn default_model(&self) -> &'static str;

    /// Complete the request, returning the response text verbatim
    fn generate(&self, request: &ChatRequest) -> Result<String>;
}

/// Registry of providers with a default
pub struct LlmClient {
    providers: BTreeMap<String, Box<dyn LlmProvider>>,
    models: BTreeMap<String, String>,
    default_provider: String,
}

impl LlmClient {
    /// Register every known chat-completions profile
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let providers = PROFILES
            .iter()
            .map(|profile| {
                let credential = settings.credential(profile.name).map(str::to_string);
                ChatCompletionsProvider::new(*profile, credential)
                    .map(|p| Box::new(p) as Box<dyn LlmProvider>)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::with_providers(providers, settings))
    }

    pub fn with_providers(providers: Vec<Box<dyn LlmProvider>>, settings: &LlmSettings) -> Self {
        let providers: BTreeMap<String, Box<dyn LlmProvider>> = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        let default_provider =
            select_default_provider(settings, |name| providers.contains_key(name));

        Self {
            providers,
            models: settings.models.clone(),
            default_provider,
        }
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Generate with the named provider, or the default one
    pub fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        provider: Option<&str>,
        model: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let name = provider.unwrap_or(&self.default_provider);
        let instance = self
            .providers
            .get(name)
            .ok_or_else(|| AbapifyError::LlmProviderNotFound(name.to_string()))?;

        info!("Using provider: {}", name);

        let model = model.or_else(|| self.models.get(name).map(String::as_str));
        let request =
            ChatRequest::new(system_prompt, user_prompt, temperature, max_tokens).with_model(model);
        instance.generate(&request)
    }
}

/// Configured provider when registered, else the first profile holding a
/// credential, else groq
fn select_default_provider(settings: &LlmSettings, registered: impl Fn(&str) -> bool) -> String {
    if let Some(configured) = settings.default_provider.as_deref() {
        if registered(configured) {
            return configured.to_string();
        }
        warn!("Configured default provider '{}' is not available", configured);
    }

    PROFILES
        .iter()
        .map(|p| p.name)
        .find(|name| registered(name) && settings.credential(name).is_some())
        .unwrap_or_else(|| {
            warn!("No API key found. Configure GROQ_API_KEY, OPENAI_API_KEY or ARCEE_TOKEN.");
            chat::GROQ.name
        })
        .to_string()
}
