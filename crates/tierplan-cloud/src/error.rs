//! Provisioning error types

use thiserror::Error;

/// Failures at the provisioning boundary
///
/// Returned unmodified from [`apply`](crate::apply); nothing is retried.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A deferred address was referenced before the step producing it ran
    #[error("Unresolved reference: {0}")]
    Unresolved(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProvisioningError>;
