//! AWS error classification
//!
//! SDK errors are classified by their error code (`ProvideErrorMetadata::code`)
//! rather than by matching on their text.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource does not exist (already deleted counts as success)
    #[error("Resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded ({code})")]
    Throttled { code: String },

    /// Resource still has dependent objects or is in a state that forbids deletion
    #[error("Resource is in use ({code}): {message}")]
    DependencyViolation { code: String, message: String },

    /// Request never got an answer from the service
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// Any other AWS SDK error
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AwsError::Throttled { .. } | AwsError::DependencyViolation { .. } | AwsError::Transport { .. }
        )
    }

    /// AWS error code, when the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { code, .. }
            | AwsError::Throttled { code }
            | AwsError::DependencyViolation { code, .. } => Some(code),
            AwsError::Sdk { code, .. } => code.as_deref(),
            AwsError::Transport { .. } => None,
        }
    }
}

/// Error codes meaning the resource is gone, across the services in use
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidKeyPair.NotFound",
    "InvalidTransitGatewayID.NotFound",
    "InvalidTransitGatewayAttachmentID.NotFound",
    "InvalidRouteTableID.NotFound",
    "ResourceNotFoundException",
    "RepositoryNotFoundException",
    "DBSubnetGroupNotFoundFault",
    "ApplicationDoesNotExistException",
    "ResourceNotFound",
];

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "LimitExceededException",
];

const DEPENDENCY_CODES: &[&str] = &[
    "DependencyViolation",
    "IncorrectState",
    "ResourceInUseException",
    "InvalidDBSubnetGroupStateFault",
    "RepositoryNotEmptyException",
];

/// Classify an AWS error by its code
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) || c.ends_with(".NotFound") => AwsError::NotFound {
            code: c.to_string(),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled {
            code: c.to_string(),
        },
        Some(c) if DEPENDENCY_CODES.contains(&c) => AwsError::DependencyViolation {
            code: c.to_string(),
            message,
        },
        _ => AwsError::Sdk {
            code: code.map(str::to_string),
            message,
        },
    }
}

/// Convert an SDK operation error of any service into an [`AwsError`]
///
/// Dispatch failures and timeouts never reached the service and carry no
/// error code; they become [`AwsError::Transport`].
pub fn from_sdk<E, R>(err: SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => AwsError::Transport {
            message: DisplayErrorContext(&err).to_string(),
        },
        _ => {
            let fallback = DisplayErrorContext(&err).to_string();
            classify_aws_error(err.code(), Some(err.message().unwrap_or(&fallback)))
        }
    }
}
