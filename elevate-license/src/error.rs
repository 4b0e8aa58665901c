//! Error types for the licensing module.

use crate::manager::InvalidReason;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The key or its payload could not be decoded.
    #[error("malformed license: {0}")]
    MalformedLicense(String),

    /// HMAC signature verification failed.
    #[error("license signature invalid")]
    InvalidSignature,

    /// A field supplied for generation cannot be encoded.
    #[error("invalid license field: {0}")]
    InvalidField(String),

    /// The key presented for renewal did not validate.
    #[error("Invalid license for renewal: {0}")]
    InvalidForRenewal(InvalidReason),

    /// Secret or environment configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
