//! AWS error classification
//!
//! Every provider call returns [`ProviderError`], classified from the AWS
//! error code via `ProvideErrorMetadata` rather than string matching on the
//! Debug output. Handlers only ever propagate [`ProviderError::Fatal`];
//! everything else is recorded against the resource and the run continues.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// Provider error categories for teardown decisions
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource was not found (already deleted, safe to skip)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Resource is still referenced by something else
    #[error("Resource has dependent objects: {message}")]
    DependencyViolation { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Credentials are missing, invalid or expired. Nothing can succeed.
    #[error("AWS credentials rejected: {message}")]
    Fatal {
        code: Option<String>,
        message: String,
    },

    /// Any other AWS SDK error with code and message
    #[error("{}: {message}", code.as_deref().unwrap_or("AWS error"))]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    /// Classify any AWS SDK error (typically an `SdkError<OperationError>`).
    pub fn from_sdk<E>(err: E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let message = match err.message() {
            Some(m) => m.to_string(),
            None => DisplayErrorContext(&err).to_string(),
        };
        classify_aws_error(err.code(), &message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Fatal { .. })
    }

    pub fn is_dependency_violation(&self) -> bool {
        matches!(self, ProviderError::DependencyViolation { .. })
    }
}

/// Known AWS error codes for "not found" conditions, across every service
/// the teardown touches
const NOT_FOUND_CODES: &[&str] = &[
    // ECS
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "ServiceNotActiveException",
    // ELBv2
    "LoadBalancerNotFound",
    "ListenerNotFound",
    "RuleNotFound",
    "TargetGroupNotFound",
    // RDS
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBSubnetGroupNotFoundFault",
    // EFS
    "FileSystemNotFound",
    "MountTargetNotFound",
    "AccessPointNotFound",
    // Lambda, EventBridge
    "ResourceNotFoundException",
    // EC2
    "InvalidGroup.NotFound",
    "InvalidPermission.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidAssociationID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidVpcID.NotFound",
    "NatGatewayNotFound",
    "Gateway.NotAttached",
    // IAM
    "NoSuchEntity",
];

/// Known AWS error codes for dependency violations (resource still in use)
const DEPENDENCY_CODES: &[&str] = &[
    "DependencyViolation",
    "DeleteConflict",
    "ResourceInUse",
    "FileSystemInUse",
    "InvalidDBSubnetGroupStateFault",
    "ClusterContainsServicesException",
    "ClusterContainsTasksException",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Error codes meaning the credentials themselves are unusable
const CREDENTIAL_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "ExpiredTokenException",
    "AuthFailure",
    "SignatureDoesNotMatch",
    "InvalidAccessKeyId",
    "MissingAuthenticationToken",
];

/// Classify an AWS error from its code and message.
///
/// Errors without a code come from the SDK itself (dispatch or construction
/// failures); those that mention credentials are fatal.
pub fn classify_aws_error(code: Option<&str>, message: &str) -> ProviderError {
    let message = message.to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ProviderError::NotFound { message },
        Some(c) if DEPENDENCY_CODES.contains(&c) => ProviderError::DependencyViolation { message },
        Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled { message },
        Some(c) if CREDENTIAL_CODES.contains(&c) => ProviderError::Fatal {
            code: Some(c.to_string()),
            message,
        },
        None if message.to_lowercase().contains("credentials") => ProviderError::Fatal {
            code: None,
            message,
        },
        _ => ProviderError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Treat a not-found error as success, returning `None`.
pub fn ignore_not_found<T>(result: Result<T, ProviderError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
