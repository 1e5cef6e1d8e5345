//! Settings and the `KEY=value` configuration store
//!
//! The configuration file is a flat dotenv-style file. [`Settings`] is built
//! once from the file plus environment overrides and then passed by reference
//! to every component that needs configuration.

use crate::{AbapifyError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Header written at the top of every saved configuration file
const FILE_HEADER: &str = "# ABAPify configuration";

/// Keys shown by `config show`, in display order
pub const DISPLAY_KEYS: [&str; 11] = [
    "ARCEE_TOKEN",
    "GROQ_API_KEY",
    "OPENAI_API_KEY",
    "DEFAULT_PROVIDER",
    "DEFAULT_MODEL_ARCEE",
    "DEFAULT_MODEL_GROQ",
    "DEFAULT_MODEL_OPENAI",
    "OUTPUT_DIR",
    "DEFAULT_TEMPERATURE",
    "DEFAULT_MAX_TOKENS",
    "LOG_LEVEL",
];

const DEFAULT_OUTPUT_DIR: &str = "./output";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Reads and writes the flat configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all key/value pairs. A missing file is an empty configuration.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            debug!("No configuration file at {}", self.path.display());
            return Ok(BTreeMap::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| {
            AbapifyError::Config(format!(
                "Failed to read configuration {}: {}",
                self.path.display(),
                e
            ))
        })?;
        info!("Loaded configuration from {}", self.path.display());
        Ok(parse_config(&text))
    }

    /// Merge `updates` into the stored values and write the file back
    pub fn update(&self, updates: &BTreeMap<String, String>) -> Result<()> {
        let mut values = self.load()?;
        values.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut text = String::from(FILE_HEADER);
        text.push('\n');
        for (key, value) in &values {
            text.push_str(key);
            text.push('=');
            text.push_str(value);
            text.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, text).map_err(|e| {
            AbapifyError::Config(format!(
                "Failed to write configuration {}: {}",
                self.path.display(),
                e
            ))
        })?;
        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }
}

/// Parse `KEY=value` lines, skipping blanks and `#` comments
pub fn parse_config(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Whether a key holds a secret that must never be printed in full
pub fn is_secret_key(key: &str) -> bool {
    key.contains("TOKEN") || key.contains("KEY") || key.contains("PASSWD")
}

/// Mask a value for display
pub fn mask_value(key: &str, value: Option<&str>) -> String {
    match value.filter(|v| !v.is_empty()) {
        None => "not configured".to_string(),
        Some(value) if is_secret_key(key) => {
            if value.chars().count() > 8 {
                format!("{}...", value.chars().take(8).collect::<String>())
            } else {
                "***".to_string()
            }
        }
        Some(value) => value.to_string(),
    }
}

/// SAP landscape tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SapEnvironment {
    Dev,
    Qas,
    Prd,
}

impl SapEnvironment {
    pub const ALL: [SapEnvironment; 3] = [
        SapEnvironment::Dev,
        SapEnvironment::Qas,
        SapEnvironment::Prd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SapEnvironment::Dev => "DEV",
            SapEnvironment::Qas => "QAS",
            SapEnvironment::Prd => "PRD",
        }
    }

    /// Settings key for one connection field of this environment
    pub fn key(&self, field: &str) -> String {
        format!("SAP_{}_{}", self.as_str(), field)
    }
}

impl fmt::Display for SapEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SapEnvironment {
    type Err = AbapifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEV" => Ok(SapEnvironment::Dev),
            "QAS" => Ok(SapEnvironment::Qas),
            "PRD" => Ok(SapEnvironment::Prd),
            other => Err(AbapifyError::Config(format!(
                "Unknown SAP environment '{}' (expected DEV, QAS or PRD)",
                other
            ))),
        }
    }
}

/// LLM-related settings
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    /// Provider name → API credential
    pub credentials: BTreeMap<String, String>,
    pub default_provider: Option<String>,
    /// Provider name → model override
    pub models: BTreeMap<String, String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            credentials: BTreeMap::new(),
            default_provider: None,
            models: BTreeMap::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmSettings {
    pub fn credential(&self, provider: &str) -> Option<&str> {
        self.credentials.get(provider).map(String::as_str)
    }

    pub fn model(&self, provider: &str) -> Option<&str> {
        self.models.get(provider).map(String::as_str)
    }
}

/// Environment variable holding each provider's credential
const CREDENTIAL_KEYS: [(&str, &str); 3] = [
    ("arcee", "ARCEE_TOKEN"),
    ("groq", "GROQ_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
];

/// Resolved application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub output_dir: PathBuf,
    pub log_level: Option<String>,
    pub encryption_key: Option<String>,
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Load from the configuration store, letting recognised environment
    /// variables override file values
    pub fn load(store: &ConfigStore) -> Result<Self> {
        let mut values = store.load()?;

        for (key, value) in std::env::vars() {
            if is_recognised_key(&key) {
                debug!("Environment override for {}", key);
                values.insert(key, value);
            }
        }

        Self::from_values(values)
    }

    /// Build settings from raw key/value pairs
    pub fn from_values(values: BTreeMap<String, String>) -> Result<Self> {
        let lookup = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut llm = LlmSettings::default();
        for (provider, key) in CREDENTIAL_KEYS {
            if let Some(credential) = lookup(key) {
                llm.credentials.insert(provider.to_string(), credential);
            }
            let model_key = format!("DEFAULT_MODEL_{}", provider.to_ascii_uppercase());
            if let Some(model) = lookup(&model_key) {
                llm.models.insert(provider.to_string(), model);
            }
        }
        llm.default_provider = lookup("DEFAULT_PROVIDER").map(|p| p.to_ascii_lowercase());

        if let Some(raw) = lookup("DEFAULT_TEMPERATURE") {
            let temperature: f32 = raw.parse().map_err(|_| {
                AbapifyError::Config(format!("DEFAULT_TEMPERATURE is not a number: {}", raw))
            })?;
            if !(0.0..=1.0).contains(&temperature) {
                return Err(AbapifyError::Config(format!(
                    "DEFAULT_TEMPERATURE must be between 0.0 and 1.0, got {}",
                    temperature
                )));
            }
            llm.temperature = temperature;
        }

        if let Some(raw) = lookup("DEFAULT_MAX_TOKENS") {
            llm.max_tokens = raw.parse().map_err(|_| {
                AbapifyError::Config(format!(
                    "DEFAULT_MAX_TOKENS is not a positive integer: {}",
                    raw
                ))
            })?;
        }

        if llm.credentials.is_empty() {
            warn!("No LLM API key configured (ARCEE_TOKEN, GROQ_API_KEY or OPENAI_API_KEY)");
        }

        Ok(Self {
            llm,
            output_dir: PathBuf::from(
                lookup("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            log_level: lookup("LOG_LEVEL"),
            encryption_key: lookup("SAP_ENCRYPTION_KEY"),
            values,
        })
    }

    /// Raw value for a key; empty strings count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Raw value of `SAP_<ENV>_<FIELD>`
    pub fn sap_value(&self, environment: SapEnvironment, field: &str) -> Option<&str> {
        self.get(&environment.key(field))
    }

    /// Displayable listing of the well-known keys with secrets masked
    pub fn masked(&self) -> Vec<(String, String)> {
        DISPLAY_KEYS
            .iter()
            .map(|key| (key.to_string(), mask_value(key, self.get(key))))
            .collect()
    }
}

fn is_recognised_key(key: &str) -> bool {
    DISPLAY_KEYS.contains(&key) || key.starts_with("SAP_")
}
