use std::io;

use thiserror::Error;

/// Library-wide error type for prebake operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration or environment issue.
    #[error("{0}")]
    Configuration(String),

    /// The process lacks the privileges needed to build images.
    #[error("prebake must be run with administrative privileges")]
    InsufficientPrivileges,

    /// A `--parameters` segment could not be parsed.
    #[error("Invalid parameter '{0}': expected KEY=VALUE")]
    InvalidParameter(String),

    /// A parameter needed to resolve an image reference was not supplied.
    #[error("Missing parameter '{0}': supply it with --parameters or declare a Default")]
    MissingParameter(String),

    /// The template document is not shaped as expected.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// No build descriptor exists for a resolved image identifier.
    #[error("No build descriptor found for image '{0}'")]
    DescriptorNotFound(String),

    /// The build descriptor could not be read or rewritten.
    #[error("Malformed build descriptor: {0}")]
    Descriptor(String),

    /// The image build pipeline failed.
    #[error("Image build failed running '{command}': {details}")]
    BuildFailed { command: String, details: String },

    /// The registry could not be reached or rejected the credentials.
    #[error("Cannot connect to image registry at {0}")]
    RegistryUnavailable(String),

    /// A registry request failed.
    #[error("Image registry error: {message}")]
    RegistryError { message: String, status: Option<u16> },
}

impl AppError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    pub fn registry_error<S: Into<String>>(message: S, status: Option<u16>) -> Self {
        AppError::RegistryError { message: message.into(), status }
    }

    /// True when the registry answered that the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::RegistryError { status: Some(404), .. })
    }
}
