//! SAP connectivity for ABAPify
//!
//! Provides the [`SapConnection`] capability consumed by the metadata
//! analyzer together with its implementations:
//!
//! - [`SapClient`]: RFC client in HTTP fallback mode plus an HTTP/OData client
//! - [`InMemoryConnection`]: deterministic dictionary for tests and demos
//!
//! Connection descriptors are resolved per environment from settings by the
//! [`ConnectionResolver`], which also decrypts stored passwords.

pub mod auth;
pub mod client;
pub mod connection;
pub mod dictionary;
pub mod http;
pub mod memory;
pub mod resolver;
pub mod retry;
pub mod rfc;

pub use auth::PasswordCipher;
pub use client::{ConnectionStatus, SapClient, SystemInfo};
pub use connection::SapConnection;
pub use http::HttpClient;
pub use memory::InMemoryConnection;
pub use resolver::{ConnectionConfig, ConnectionResolver, ConnectionType};
pub use retry::RetryPolicy;
pub use rfc::{RfcClient, RfcParams, RfcSession};

use abapify_common::{AbapifyError, Result};
use regex::Regex;

/// Reject patterns that could break out of a quoted WHERE literal
fn check_pattern(pattern: &str) -> Result<()> {
    let valid = !pattern.is_empty()
        && pattern
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '*' | '%'));
    if valid {
        Ok(())
    } else {
        Err(AbapifyError::SapMetadata(format!(
            "Invalid name pattern '{}': only letters, digits, '_', '/', '*' and '%' are allowed",
            pattern
        )))
    }
}

/// Reject names that are not plain dictionary identifiers
fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/'));
    if valid {
        Ok(())
    } else {
        Err(AbapifyError::SapMetadata(format!(
            "Invalid name '{}': only letters, digits, '_' and '/' are allowed",
            name
        )))
    }
}

/// Translate a `*` wildcard pattern into an SQL `LIKE` pattern
pub fn wildcard_to_like(pattern: &str) -> Result<String> {
    check_pattern(pattern)?;
    Ok(pattern.to_ascii_uppercase().replace('*', "%"))
}

/// Compile a `*`/`%` wildcard pattern into an anchored, case-insensitive regex
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    check_pattern(pattern)?;
    let body = pattern
        .split(['*', '%'])
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i)^{}$", body))
        .map_err(|e| {
            AbapifyError::SapMetadata(format!("Invalid name pattern '{}': {}", pattern, e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_to_like() {
        assert_eq!(wildcard_to_like("z*").unwrap(), "Z%");
        assert_eq!(wildcard_to_like("/ABC/*").unwrap(), "/ABC/%");
        assert!(wildcard_to_like("Z' OR 1=1").is_err());
        assert!(wildcard_to_like("").is_err());
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("ZORDER").is_ok());
        assert!(check_name("/BIC/AZSALES").is_ok());
        assert!(check_name("Z*").is_err());
        assert!(check_name("ZORDER' OR '1' = '1").is_err());
    }

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("Z*ORDER*").unwrap();
        assert!(re.is_match("ZSD_ORDER_HEAD"));
        assert!(re.is_match("zorder"));
        assert!(!re.is_match("YORDER"));
    }
}
