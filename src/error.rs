//! Error types for the GitLab provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while reconciling a resource or reading a data source.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote entity does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A stored or imported identifier could not be decoded.
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// A declared value failed local validation. No remote call was made.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Any other failure reported by the remote API client.
    #[error("Remote API error: {0}")]
    Remote(String),

    /// The operation was aborted through its cancellation token.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The requested resource or data source type is not registered.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The remote entity is not in a state that allows the operation.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::MalformedIdentifier(msg) => msg,
            Self::InvalidConfiguration(msg) => msg,
            Self::Remote(msg) => msg,
            Self::Cancelled(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }

    /// Whether this error reports a missing remote entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the caller's retry policy may retry the operation.
    ///
    /// Only remote failures qualify. Local validation errors and malformed
    /// identifiers will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let summary = match &err {
            ProviderError::NotFound(_) => "Resource not found",
            ProviderError::MalformedIdentifier(_) => "Malformed resource identifier",
            ProviderError::InvalidConfiguration(_) => "Invalid configuration",
            ProviderError::Remote(_) => "Remote API request failed",
            ProviderError::Cancelled(_) => "Operation cancelled",
            ProviderError::UnknownResource(_) => "Unknown resource type",
            ProviderError::FailedPrecondition(_) => "Failed precondition",
            ProviderError::Serialization(_) => "Serialization error",
        };
        Diagnostic::error(summary).with_detail(err.to_string())
    }
}
