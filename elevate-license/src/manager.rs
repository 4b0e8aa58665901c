//! License lifecycle: generation, validation and renewal.
//!
//! Keys are `base64(payload).hex(signature)`. Validation is stateless apart
//! from an optional [`RevocationList`] and runs its checks in a fixed order:
//! structure, signature, revocation, expiry. A tampered key is therefore never
//! reported as expired.

use crate::codec::{self, LicensePayload};
use crate::error::{LicenseError, LicenseResult};
use crate::revocation::RevocationList;
use crate::signature::Keyring;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default license lifetime in days.
pub const DEFAULT_DURATION_DAYS: i64 = 365;

/// Separator between the payload and signature segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// Why a license failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidReason {
    Malformed,
    InvalidSignature,
    Revoked,
    Expired,
}

impl InvalidReason {
    /// Human-readable reason reported to callers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "Malformed license",
            Self::InvalidSignature => "Invalid signature",
            Self::Revoked => "License revoked",
            Self::Expired => "Expired",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of validating a license key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(LicensePayload),
    Invalid(InvalidReason),
}

impl Validation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the payload of a valid license.
    #[must_use]
    pub fn payload(&self) -> Option<&LicensePayload> {
        match self {
            Self::Valid(payload) => Some(payload),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the failure reason of an invalid license.
    #[must_use]
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }
}

/// A freshly issued license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLicense {
    /// Wire form: `encodedPayload.signature`.
    pub key: String,
    pub payload: LicensePayload,
}

/// Outcome of a successful renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renewal {
    /// Payload of the key that was renewed.
    pub previous: LicensePayload,
    pub issued: IssuedLicense,
}

/// A key whose structure and signature have been checked.
struct Verified {
    payload: LicensePayload,
    signature: String,
}

/// Issues and checks license keys under a [`Keyring`].
#[derive(Clone)]
pub struct LicenseManager {
    keyring: Keyring,
    revocations: Option<Arc<dyn RevocationList>>,
}

impl fmt::Debug for LicenseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseManager")
            .field("keyring", &self.keyring)
            .field("revocations", &self.revocations.is_some())
            .finish()
    }
}

impl LicenseManager {
    pub fn new(keyring: Keyring) -> Self {
        Self {
            keyring,
            revocations: None,
        }
    }

    /// Consults `revocations` during validation.
    #[must_use]
    pub fn with_revocations(mut self, revocations: Arc<dyn RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    /// Issues a key valid for `duration_days` from now.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidField`] if a field is empty, contains
    /// `|`, or the duration overflows.
    pub fn generate(
        &self,
        email: &str,
        product_id: &str,
        duration_days: i64,
    ) -> LicenseResult<IssuedLicense> {
        self.generate_at(email, product_id, duration_days, Utc::now())
    }

    /// Like [`generate`](Self::generate) with an explicit issue time.
    pub fn generate_at(
        &self,
        email: &str,
        product_id: &str,
        duration_days: i64,
        now: DateTime<Utc>,
    ) -> LicenseResult<IssuedLicense> {
        let payload = LicensePayload::issue(email, product_id, now, duration_days)?;
        let signature = self.keyring.sign(&payload.raw());
        let key = format!("{}{SEGMENT_SEPARATOR}{signature}", codec::encode(&payload));
        Ok(IssuedLicense { key, payload })
    }

    /// Validates a key against the current time.
    #[must_use]
    pub fn validate(&self, key: &str) -> Validation {
        self.validate_at(key, Utc::now())
    }

    /// Validates a key as of `now`.
    #[must_use]
    pub fn validate_at(&self, key: &str, now: DateTime<Utc>) -> Validation {
        let verified = match self.verify(key) {
            Ok(verified) => verified,
            Err(LicenseError::InvalidSignature) => {
                debug!("license rejected: signature mismatch");
                return Validation::Invalid(InvalidReason::InvalidSignature);
            }
            Err(e) => {
                debug!("license rejected: {e}");
                return Validation::Invalid(InvalidReason::Malformed);
            }
        };

        if self
            .revocations
            .as_ref()
            .is_some_and(|list| list.is_revoked(&verified.signature))
        {
            debug!(product_id = %verified.payload.product_id, "license rejected: revoked");
            return Validation::Invalid(InvalidReason::Revoked);
        }

        if verified.payload.is_expired_at(now) {
            debug!(
                product_id = %verified.payload.product_id,
                expires_at = %codec::format_timestamp(&verified.payload.expires_at),
                "license rejected: expired"
            );
            return Validation::Invalid(InvalidReason::Expired);
        }

        Validation::Valid(verified.payload)
    }

    /// Validates `key` and issues a fresh key for the same licensee.
    ///
    /// The new key is issued now and runs for `additional_days`. Expired,
    /// revoked and tampered keys cannot be renewed.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidForRenewal`] if `key` does not validate.
    pub fn renew(&self, key: &str, additional_days: i64) -> LicenseResult<Renewal> {
        self.renew_at(key, additional_days, Utc::now())
    }

    /// Like [`renew`](Self::renew) with an explicit clock.
    pub fn renew_at(
        &self,
        key: &str,
        additional_days: i64,
        now: DateTime<Utc>,
    ) -> LicenseResult<Renewal> {
        let previous = match self.validate_at(key, now) {
            Validation::Valid(payload) => payload,
            Validation::Invalid(reason) => return Err(LicenseError::InvalidForRenewal(reason)),
        };
        let issued =
            self.generate_at(&previous.email, &previous.product_id, additional_days, now)?;
        Ok(Renewal { previous, issued })
    }

    /// Returns the key id (its signature segment) of a correctly signed key.
    ///
    /// Expiry and revocation are not checked.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedLicense`] or [`LicenseError::InvalidSignature`].
    pub fn key_id(&self, key: &str) -> LicenseResult<String> {
        self.verify(key).map(|verified| verified.signature)
    }

    fn verify(&self, key: &str) -> LicenseResult<Verified> {
        let (encoded, signature) = split_key(key)?;
        let decoded = codec::decode_with_raw(encoded)?;
        if !self.keyring.verify(&decoded.raw, signature) {
            return Err(LicenseError::InvalidSignature);
        }
        Ok(Verified {
            payload: decoded.payload,
            signature: signature.to_string(),
        })
    }
}

/// Decodes a key's payload without checking its signature.
///
/// The result is a preview only and must never back an authorization decision.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedLicense`] if the key cannot be decoded.
pub fn inspect(key: &str) -> LicenseResult<LicensePayload> {
    let (encoded, _) = split_key(key)?;
    codec::decode(encoded)
}

/// Splits a key on its first `.` into non-empty payload and signature segments.
fn split_key(key: &str) -> LicenseResult<(&str, &str)> {
    match key.trim().split_once(SEGMENT_SEPARATOR) {
        Some((encoded, signature)) if !encoded.is_empty() && !signature.is_empty() => {
            Ok((encoded, signature))
        }
        _ => Err(LicenseError::MalformedLicense(
            "key must be two non-empty segments separated by a dot".to_string(),
        )),
    }
}
