//! Classification of AWS SDK failures
//!
//! All SDK crates share `SdkError` from `aws-smithy-runtime-api`, so one
//! classifier covers SSM, OpenSearch Serverless and Bedrock Agent.

use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::error::ServiceError;

/// Map an SDK error to a `ServiceError`, prefixing the operation name
pub fn classify_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{operation}: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::ServiceError(service_err) => classify_code(service_err.err().code(), message),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ServiceError::Transport(message)
        }
        _ => ServiceError::Other(message),
    }
}

/// Map a service error code to a `ServiceError` class
#[must_use]
pub fn classify_code(code: Option<&str>, message: String) -> ServiceError {
    match code {
        Some("ConflictException" | "ParameterAlreadyExists") => ServiceError::Conflict(message),
        Some("ResourceNotFoundException" | "ParameterNotFound" | "NotFoundException") => {
            ServiceError::NotFound(message)
        }
        Some("AccessDeniedException" | "UnrecognizedClientException" | "ExpiredTokenException") => {
            ServiceError::AccessDenied(message)
        }
        Some(
            "ThrottlingException"
            | "TooManyRequestsException"
            | "ServiceQuotaExceededException"
            | "TooManyUpdates",
        ) => ServiceError::Throttled(message),
        Some("ValidationException" | "ParameterPatternMismatchException") => {
            ServiceError::Validation(message)
        }
        _ => ServiceError::Other(message),
    }
}

/// Map an HTTP status from a signed data-plane call to a `ServiceError` class
#[must_use]
pub fn classify_status(status: u16, message: String) -> ServiceError {
    match status {
        400 => {
            if message.contains("resource_already_exists_exception") {
                ServiceError::Conflict(message)
            } else {
                ServiceError::Validation(message)
            }
        }
        401 | 403 => ServiceError::AccessDenied(message),
        404 => ServiceError::NotFound(message),
        409 => ServiceError::Conflict(message),
        429 => ServiceError::Throttled(message),
        _ => ServiceError::Other(message),
    }
}
