//! Error types for keygate.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::request::TransportError;

/// Primary error type for all keygate operations.
#[derive(Error, Debug)]
pub enum KeygateError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Identity provider error ({code}): {message}")]
    Provider { code: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for KeygateError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<toml::de::Error> for KeygateError {
    fn from(error: toml::de::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::ser::Error> for KeygateError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl KeygateError {
    /// Create an identity-provider error with a machine-readable code.
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) | Self::NotAuthenticated => ErrorCategory::Authentication,
            Self::Network(_) => ErrorCategory::Network,
            Self::ProfileUnavailable(_) => ErrorCategory::Profile,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::InvalidArgument(_) => ErrorCategory::InvalidInput,
            Self::Provider { code, .. } => match code.as_str() {
                "RATE_LIMITED" => ErrorCategory::RateLimit,
                "INTERNAL_ERROR" => ErrorCategory::Server,
                _ => ErrorCategory::Provider,
            },
            Self::Transport(error) => match error.status {
                None => ErrorCategory::Network,
                Some(401 | 403) => ErrorCategory::Authentication,
                Some(429) => ErrorCategory::RateLimit,
                Some(500..=599) => ErrorCategory::Server,
                Some(_) => ErrorCategory::Api,
            },
        }
    }

    /// Whether this error is potentially retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Profile => RecoverySuggestion::SignInAgain,
            ErrorCategory::InvalidInput | ErrorCategory::Provider => {
                RecoverySuggestion::CorrectInput
            }
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KeygateError>;
