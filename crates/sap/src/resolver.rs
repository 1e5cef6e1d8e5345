//! Per-environment connection descriptors
//!
//! Connection parameters are read from settings keys of the form
//! `SAP_<ENV>_<FIELD>`, e.g. `SAP_DEV_ASHOST` or `SAP_QAS_BASE_URL`.

use crate::auth::PasswordCipher;
use abapify_common::{AbapifyError, Result, SapEnvironment, Settings};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

const DEFAULT_LANGUAGE: &str = "EN";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How the system is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionType {
    #[default]
    Rfc,
    Http,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionType::Rfc => write!(f, "RFC"),
            ConnectionType::Http => write!(f, "HTTP"),
        }
    }
}

impl FromStr for ConnectionType {
    type Err = AbapifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RFC" => Ok(ConnectionType::Rfc),
            "HTTP" => Ok(ConnectionType::Http),
            other => Err(AbapifyError::Config(format!(
                "Unknown connection type '{}' (expected RFC or HTTP)",
                other
            ))),
        }
    }
}

/// Connection parameters for one SAP environment
#[derive(Clone)]
pub struct ConnectionConfig {
    pub environment: SapEnvironment,
    pub connection_type: ConnectionType,

    // RFC
    pub ashost: Option<String>,
    pub sysnr: Option<String>,
    pub client: Option<String>,
    pub user: Option<String>,
    pub passwd: Option<String>,
    pub saprouter: Option<String>,
    pub mshost: Option<String>,
    pub msserv: Option<String>,
    pub group: Option<String>,

    // HTTP
    pub base_url: Option<String>,
    pub use_ssl: bool,
    pub verify_ssl: bool,

    pub language: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("environment", &self.environment)
            .field("connection_type", &self.connection_type)
            .field("ashost", &self.ashost)
            .field("sysnr", &self.sysnr)
            .field("client", &self.client)
            .field("user", &self.user)
            .field("passwd", &self.passwd.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    /// Empty descriptor with defaults applied
    pub fn new(environment: SapEnvironment) -> Self {
        Self {
            environment,
            connection_type: ConnectionType::default(),
            ashost: None,
            sysnr: None,
            client: None,
            user: None,
            passwd: None,
            saprouter: None,
            mshost: None,
            msserv: None,
            group: None,
            base_url: None,
            use_ssl: true,
            verify_ssl: true,
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Check that the fields required by the connection type are present
    pub fn validate(&self) -> Result<()> {
        let required: Vec<(&str, &Option<String>)> = match self.connection_type {
            ConnectionType::Rfc => vec![
                ("ashost", &self.ashost),
                ("sysnr", &self.sysnr),
                ("client", &self.client),
                ("user", &self.user),
                ("passwd", &self.passwd),
            ],
            ConnectionType::Http => vec![
                ("base_url", &self.base_url),
                ("user", &self.user),
                ("passwd", &self.passwd),
            ],
        };

        for (name, value) in required {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                error!("Missing required SAP connection field: {}", name);
                return Err(AbapifyError::SapConnection(format!(
                    "Invalid configuration for environment {}: missing required field '{}'",
                    self.environment, name
                )));
            }
        }
        Ok(())
    }

    /// Base URL with a scheme, honouring `use_ssl` when none was given
    pub fn effective_base_url(&self) -> Option<String> {
        self.base_url.as_deref().map(|url| {
            let url = url.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else if self.use_ssl {
                format!("https://{}", url)
            } else {
                format!("http://{}", url)
            }
        })
    }

    /// Whether basic credentials are available
    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.passwd.is_some()
    }
}

/// Builds connection descriptors from settings
pub struct ConnectionResolver<'a> {
    settings: &'a Settings,
    cipher: PasswordCipher,
}

impl<'a> ConnectionResolver<'a> {
    pub fn new(settings: &'a Settings) -> Result<Self> {
        Ok(Self {
            settings,
            cipher: PasswordCipher::from_settings(settings)?,
        })
    }

    pub fn cipher(&self) -> &PasswordCipher {
        &self.cipher
    }

    /// Resolve the descriptor for an environment without validating it
    pub fn resolve(&self, environment: SapEnvironment) -> Result<ConnectionConfig> {
        let value = |field: &str| {
            self.settings
                .sap_value(environment, field)
                .map(str::to_string)
        };
        let flag = |field: &str| {
            value(field)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true)
        };

        let mut config = ConnectionConfig::new(environment);
        config.ashost = value("ASHOST");
        config.sysnr = value("SYSNR");
        config.client = value("CLIENT");
        config.user = value("USER");
        config.saprouter = value("SAPROUTER");
        config.mshost = value("MSHOST");
        config.msserv = value("MSSERV");
        config.group = value("GROUP");
        config.base_url = value("BASE_URL");
        config.use_ssl = flag("USE_SSL");
        config.verify_ssl = flag("VERIFY_SSL");

        if let Some(language) = value("LANGUAGE") {
            config.language = language;
        }
        if let Some(kind) = value("CONNECTION_TYPE") {
            config.connection_type = kind.parse()?;
        }
        if let Some(timeout) = value("TIMEOUT") {
            config.timeout = timeout.parse().map_err(|_| {
                AbapifyError::Config(format!(
                    "{} is not a number of seconds: {}",
                    environment.key("TIMEOUT"),
                    timeout
                ))
            })?;
        }

        config.passwd = match value("PASSWD_ENCRYPTED") {
            Some(encrypted) => match self.cipher.decrypt(&encrypted) {
                Ok(password) => Some(password),
                Err(e) => {
                    error!("Failed to decrypt SAP password for {}: {}", environment, e);
                    None
                }
            },
            None => value("PASSWD"),
        };

        debug!("Resolved SAP connection {:?}", config);
        Ok(config)
    }

    /// Resolve and validate the descriptor for an environment
    pub fn resolve_valid(&self, environment: SapEnvironment) -> Result<ConnectionConfig> {
        let config = self.resolve(environment)?;
        config.validate()?;
        Ok(config)
    }
}
