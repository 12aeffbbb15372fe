// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for brand-kit operations
//!
//! Failures are layered. A [`ModelError`] is the raw failure of a single call
//! to the hosted model. The retry layer turns it into a [`ClassifiedError`]
//! carrying a user-facing message and a retry decision. Every public operation
//! finally reports a [`BrandKitError`] wrapped with the name of the operation
//! that failed.

use std::fmt;

use thiserror::Error;

/// Result type alias for brand-kit operations
pub type BrandKitResult<T> = Result<T, BrandKitError>;

/// Raw failure of a single call to the hosted chat-completion API
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The connection could not be established at all
    #[error("no network connection: {message}")]
    Offline { message: String },

    /// The API answered with a non-success status code
    ///
    /// The provider's error body is kept for diagnostics and never appears in
    /// the display output.
    #[error("model API returned HTTP {status}")]
    Status {
        status: u16,
        provider_message: Option<String>,
    },

    /// The request did not complete in time
    #[error("request timeout: {message}")]
    Timeout { message: String },

    /// Any other transport-level failure
    #[error("{message}")]
    Transport { message: String },

    /// The API answered but the completion envelope could not be decoded
    #[error("invalid completion payload: {message}")]
    Decode { message: String },
}

impl ModelError {
    /// Create an HTTP status error
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            provider_message: None,
        }
    }

    /// Create a transport error
    pub fn transport<T: ToString>(message: T) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// HTTP status code, if this failure carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convert from reqwest errors
impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            Self::Offline {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16())
        } else if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

/// A model failure with a user-facing message and a retry decision
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    message: String,
    retryable: bool,
    #[source]
    cause: ModelError,
}

impl ClassifiedError {
    /// Create a classified error
    pub fn new(message: impl Into<String>, retryable: bool, cause: ModelError) -> Self {
        Self {
            message: message.into(),
            retryable,
            cause,
        }
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// The underlying model failure
    pub fn cause(&self) -> &ModelError {
        &self.cause
    }
}

/// Public operations, used to prefix user-facing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Brand identity extraction
    BrandAnalysis,
    /// Image-generation prompt creation
    PromptGeneration,
    /// Trend suggestions
    TrendAnalysis,
    /// Design audit against brand guidelines
    DesignAnalysis,
}

impl Operation {
    /// Human readable operation name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandAnalysis => "Brand analysis",
            Self::PromptGeneration => "Firefly prompt generation",
            Self::TrendAnalysis => "Trend analysis",
            Self::DesignAnalysis => "Design analysis",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for brand-kit operations
#[derive(Debug, Error)]
pub enum BrandKitError {
    /// The model call failed after classification and retries
    #[error(transparent)]
    Request(#[from] ClassifiedError),

    /// Content was positively classified as explicit
    #[error("{label} rejected: {reason}")]
    ContentRejected { label: String, reason: String },

    /// Model output failed parsing or validation
    #[error("{message}")]
    Validation { message: String },

    /// No model credentials are configured
    #[error("{message}")]
    NotConfigured { message: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// A public operation failed; the display is prefixed with its name
    #[error("{operation} failed: {source}")]
    Operation {
        operation: Operation,
        #[source]
        source: Box<BrandKitError>,
    },
}

impl BrandKitError {
    /// Create a content rejection error
    pub fn rejected<L: ToString, R: ToString>(label: L, reason: R) -> Self {
        Self::ContentRejected {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation<T: ToString>(message: T) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    /// Create a missing credentials error
    pub fn not_configured() -> Self {
        Self::NotConfigured {
            message: "API key not configured. Set your API key in the configuration.".to_string(),
        }
    }

    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Wrap this error with the operation that produced it
    ///
    /// Already wrapped errors are returned unchanged.
    pub fn in_operation(self, operation: Operation) -> Self {
        match self {
            wrapped @ Self::Operation { .. } => wrapped,
            other => Self::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through operation wrappers
    pub fn root(&self) -> &BrandKitError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The operation this error was reported from, if wrapped
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Check if this error indicates a temporary failure that could be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Self::Request(e) if e.is_retryable())
    }

    /// Check if this error indicates an authentication or permission problem
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.root(),
            Self::Request(e) if matches!(e.cause().status_code(), Some(401 | 403))
        )
    }

    /// Check if this error is a content-safety rejection
    pub fn is_content_rejection(&self) -> bool {
        matches!(self.root(), Self::ContentRejected { .. })
    }

    /// Check if this error is a model output validation failure
    pub fn is_validation_error(&self) -> bool {
        matches!(self.root(), Self::Validation { .. })
    }

    /// Check if the caller cancelled the operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

/// Malformed model output is a validation failure, never a transient one
impl From<serde_json::Error> for BrandKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation {
            message: format!("malformed model output: {err}"),
        }
    }
}

/// Convert from configuration loading errors
impl From<config::ConfigError> for BrandKitError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_prefix_in_display() {
        let error = BrandKitError::validation("insufficient design guidelines")
            .in_operation(Operation::BrandAnalysis);

        assert_eq!(
            error.to_string(),
            "Brand analysis failed: insufficient design guidelines"
        );
        assert_eq!(error.operation(), Some(Operation::BrandAnalysis));
        assert!(error.is_validation_error());
    }

    #[test]
    fn wrapping_is_idempotent() {
        let error = BrandKitError::Cancelled
            .in_operation(Operation::TrendAnalysis)
            .in_operation(Operation::DesignAnalysis);

        assert_eq!(error.operation(), Some(Operation::TrendAnalysis));
        assert!(error.is_cancelled());
    }

    #[test]
    fn provider_payload_never_displayed() {
        let cause = ModelError::Status {
            status: 400,
            provider_message: Some("{\"error\":{\"message\":\"secret detail\"}}".to_string()),
        };
        assert_eq!(cause.to_string(), "model API returned HTTP 400");

        let classified = ClassifiedError::new("Server error.", true, cause);
        let error = BrandKitError::from(classified).in_operation(Operation::TrendAnalysis);
        assert!(!error.to_string().contains("secret detail"));
    }

    #[test]
    fn error_classification() {
        let auth = BrandKitError::from(ClassifiedError::new(
            "API key is invalid",
            false,
            ModelError::status(401),
        ))
        .in_operation(Operation::BrandAnalysis);
        assert!(auth.is_auth_error());
        assert!(!auth.is_retryable());

        let rejected = BrandKitError::rejected("trend name", "explicit content detected");
        assert!(rejected.is_content_rejection());
        assert_eq!(
            rejected.to_string(),
            "trend name rejected: explicit content detected"
        );
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn json_errors_are_validation_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = BrandKitError::from(err);
        assert!(error.is_validation_error());
        assert!(error.to_string().starts_with("malformed model output"));
    }
}
