//! Password encryption for stored SAP credentials
//!
//! Passwords are encrypted with Fernet. Both the key stored in
//! `SAP_ENCRYPTION_KEY` and the encrypted password are wrapped in an extra
//! layer of URL-safe base64.

use abapify_common::{AbapifyError, Result, Settings};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use fernet::Fernet;
use tracing::{error, info, warn};

/// Encrypts and decrypts SAP passwords
pub struct PasswordCipher {
    fernet: Fernet,
    key: String,
}

impl PasswordCipher {
    /// Build a cipher from a wrapped key as stored in `SAP_ENCRYPTION_KEY`
    pub fn new(wrapped_key: &str) -> Result<Self> {
        let raw = URL_SAFE
            .decode(wrapped_key.trim().as_bytes())
            .map_err(|e| AbapifyError::Config(format!("Invalid encryption key encoding: {}", e)))?;
        let fernet_key = String::from_utf8(raw)
            .map_err(|_| AbapifyError::Config("Encryption key is not valid UTF-8".to_string()))?;
        let fernet = Fernet::new(&fernet_key).ok_or_else(|| {
            AbapifyError::Config("Encryption key is not a valid Fernet key".to_string())
        })?;

        Ok(Self {
            fernet,
            key: wrapped_key.trim().to_string(),
        })
    }

    /// Use the configured key, or generate a fresh one when it is missing or invalid
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if let Some(key) = settings.encryption_key.as_deref() {
            match Self::new(key) {
                Ok(cipher) => return Ok(cipher),
                Err(e) => warn!("Invalid SAP_ENCRYPTION_KEY, generating a new key: {}", e),
            }
        }
        let cipher = Self::generated()?;
        info!(
            "Generated a new encryption key; \
             store it as SAP_ENCRYPTION_KEY to reuse encrypted passwords"
        );
        Ok(cipher)
    }

    /// Fresh cipher with a random key
    pub fn generated() -> Result<Self> {
        Self::new(&Self::generate_key())
    }

    /// Generate a wrapped key suitable for `SAP_ENCRYPTION_KEY`
    pub fn generate_key() -> String {
        URL_SAFE.encode(Fernet::generate_key().as_bytes())
    }

    /// The wrapped key this cipher uses
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn encrypt(&self, password: &str) -> String {
        let token = self.fernet.encrypt(password.as_bytes());
        URL_SAFE.encode(token.as_bytes())
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let failure = || AbapifyError::SapAuthentication("Failed to decrypt password".to_string());

        let token = URL_SAFE
            .decode(encrypted.trim().as_bytes())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(failure)?;
        let plain = self.fernet.decrypt(&token).map_err(|_| {
            error!("Password token could not be decrypted with the configured key");
            failure()
        })?;
        String::from_utf8(plain).map_err(|_| failure())
    }
}
