//! Service layer error types
//!
//! Every service operation returns [`ServiceResult`]. Callers at the outer
//! boundary convert into [`AppError`] for the wire shape.

use session_common::AppError;
use session_core::DomainError;
use validator::ValidationErrors;

/// Service layer error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Storage or domain rule failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Credentials, tokens, account standing, policy, configuration
    #[error(transparent)]
    App(#[from] AppError),

    /// Malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The context builder was not given a required collaborator
    #[error("Service context is missing {0}")]
    MissingDependency(&'static str),
}

impl ServiceError {
    /// The application error carried by this error, if any
    pub fn as_app(&self) -> Option<&AppError> {
        match self {
            Self::App(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status a boundary adapter should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) if e.is_not_found() => 404,
            Self::Domain(e) if e.is_validation() => 400,
            Self::Domain(e) if e.is_conflict() => 409,
            Self::Domain(_) | Self::MissingDependency(_) => 500,
            Self::App(e) => e.status_code(),
            Self::Validation(_) => 400,
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingDependency(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::MissingDependency(what) => {
                AppError::Configuration(format!("service context is missing {what}"))
            }
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
