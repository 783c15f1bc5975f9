//! Error types for the fraudlab-core crate.
//!
//! Store failures are carried through unchanged; nothing in this crate
//! catches and discards a [`StoreError`].

use thiserror::Error;

/// Errors raised by a feature-store client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feature store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("No catalog is active")]
    NoActiveCatalog,
}

impl StoreError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

/// Top-level error type for fraudlab operations.
#[derive(Debug, Error)]
pub enum FraudlabError {
    #[error("Feature store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl FraudlabError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::not_found("catalog", "quick start fraud");
        assert_eq!(err.to_string(), "catalog not found: quick start fraud");

        let err = StoreError::api(404, "Catalog not found");
        assert_eq!(
            err.to_string(),
            "Feature store API error (404): Catalog not found"
        );
    }

    #[test]
    fn test_store_error_converts_to_top_level() {
        let err: FraudlabError = StoreError::NoActiveCatalog.into();
        assert!(matches!(err, FraudlabError::Store(StoreError::NoActiveCatalog)));
        assert_eq!(err.to_string(), "Feature store error: No catalog is active");
    }
}
