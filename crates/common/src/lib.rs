//! Common types and utilities for ABAPify
//!
//! This crate contains the error taxonomy, the SAP dictionary data model and
//! the settings object shared by the SAP transport, analyzer, generator and
//! CLI components.

pub mod config;
pub mod model;

pub use config::{ConfigStore, LlmSettings, SapEnvironment, Settings};
pub use model::{
    AnalysisResult, NamingPatterns, ObjectType, Relationship, RelationshipKind, SapObject, Table,
    TableField,
};

use thiserror::Error;

/// Errors that can occur anywhere in ABAPify
#[derive(Error, Debug)]
pub enum AbapifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider not found: {0}")]
    LlmProviderNotFound(String),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("SAP connection error: {0}")]
    SapConnection(String),

    #[error("SAP authentication error: {0}")]
    SapAuthentication(String),

    #[error("SAP metadata error: {0}")]
    SapMetadata(String),

    #[error("Table '{table}' not found in SAP")]
    TableNotFound { table: String },

    #[error("Object '{name}' not found in SAP")]
    ObjectNotFound {
        name: String,
        object_type: Option<String>,
    },

    #[error("RFC error: {message}")]
    Rfc {
        message: String,
        function: Option<String>,
    },

    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status: Option<u16>,
        endpoint: Option<String>,
    },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Output directory error: {0}")]
    OutputDirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to format output: {0}")]
    Format(#[from] std::fmt::Error),
}

impl AbapifyError {
    /// Build an RFC error tied to a remote function
    pub fn rfc(function: &str, message: impl Into<String>) -> Self {
        AbapifyError::Rfc {
            message: message.into(),
            function: Some(function.to_string()),
        }
    }

    /// Build an HTTP error for an endpoint
    pub fn http(message: impl Into<String>, status: Option<u16>, endpoint: &str) -> Self {
        AbapifyError::Http {
            message: message.into(),
            status,
            endpoint: Some(endpoint.to_string()),
        }
    }

    /// Whether this error means the SAP system itself is unreachable or refuses us.
    ///
    /// Batch operations keep going on any other error and only abort on these.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            AbapifyError::SapConnection(_) | AbapifyError::SapAuthentication(_)
        )
    }

    /// Whether this error is a missing table
    pub fn is_not_found(&self) -> bool {
        matches!(self, AbapifyError::TableNotFound { .. })
    }
}

/// Result type for ABAPify operations
pub type Result<T> = std::result::Result<T, AbapifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = AbapifyError::TableNotFound {
            table: "ZMISSING".to_string(),
        };
        assert_eq!(err.to_string(), "Table 'ZMISSING' not found in SAP");
        assert!(err.is_not_found());
        assert!(!err.is_connectivity());

        let err = AbapifyError::http("Gateway timeout", Some(504), "/sap/bc/ping");
        match err {
            AbapifyError::Http {
                status, endpoint, ..
            } => {
                assert_eq!(status, Some(504));
                assert_eq!(endpoint.as_deref(), Some("/sap/bc/ping"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(AbapifyError::SapConnection("down".into()).is_connectivity());
        assert!(AbapifyError::SapAuthentication("denied".into()).is_connectivity());
        assert!(!AbapifyError::SapMetadata("bad row".into()).is_connectivity());
        assert!(!AbapifyError::rfc("DDIF_FORKEY_GET", "unsupported").is_connectivity());
    }
}
