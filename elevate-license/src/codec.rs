//! License payload encoding.
//!
//! A payload travels as `base64(email|productId|issuedAt|expiresAt)`, with both
//! timestamps written as ISO-8601 in UTC at millisecond precision
//! (`2025-01-01T00:00:00.000Z`).
//!
//! The signature covers the delimited string *before* base64 encoding, so
//! [`decode_with_raw`] returns that string next to the parsed payload. Fields
//! are not escaped; [`LicensePayload::issue`] refuses any field containing the
//! delimiter instead.

use crate::error::{LicenseError, LicenseResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Separator between the four payload fields.
pub const FIELD_DELIMITER: char = '|';

/// Number of fields in an encoded payload.
const FIELD_COUNT: usize = 4;

/// The decoded license payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePayload {
    /// Licensee identity. Not checked as a real mailbox.
    pub email: String,
    /// Opaque product identifier.
    pub product_id: String,
    /// Creation time.
    #[serde(with = "iso_millis")]
    pub issued_at: DateTime<Utc>,
    /// `issued_at + duration_days`.
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
}

impl LicensePayload {
    /// Builds a payload issued at `issued_at` and valid for `duration_days`.
    ///
    /// Negative durations are accepted and yield an already-expired payload.
    /// `issued_at` is truncated to milliseconds so the payload survives an
    /// encode/decode cycle unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidField`] if either field is empty or
    /// contains [`FIELD_DELIMITER`], or if the expiry is out of range.
    pub fn issue(
        email: &str,
        product_id: &str,
        issued_at: DateTime<Utc>,
        duration_days: i64,
    ) -> LicenseResult<Self> {
        check_field("email", email)?;
        check_field("productId", product_id)?;

        let issued_at = issued_at.trunc_subsecs(3);
        let expires_at = Duration::try_days(duration_days)
            .and_then(|d| issued_at.checked_add_signed(d))
            .ok_or_else(|| {
                LicenseError::InvalidField(format!("duration of {duration_days} days is out of range"))
            })?;

        Ok(Self {
            email: email.to_string(),
            product_id: product_id.to_string(),
            issued_at,
            expires_at,
        })
    }

    /// Returns the delimited string that is base64-encoded and signed.
    #[must_use]
    pub fn raw(&self) -> String {
        let d = FIELD_DELIMITER;
        format!(
            "{}{d}{}{d}{}{d}{}",
            self.email,
            self.product_id,
            format_timestamp(&self.issued_at),
            format_timestamp(&self.expires_at),
        )
    }

    /// Returns true if `now` is past the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole days left before expiry, rounded up. Zero once expired.
    #[must_use]
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expires_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis + DAY_MILLIS - 1) / DAY_MILLIS
        }
    }
}

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// A decoded payload together with the exact string the signature covers.
#[derive(Debug, Clone)]
pub struct DecodedPayload {
    pub payload: LicensePayload,
    pub raw: String,
}

/// Encodes a payload for transport.
#[must_use]
pub fn encode(payload: &LicensePayload) -> String {
    STANDARD.encode(payload.raw())
}

/// Decodes a base64 payload segment.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedLicense`] on bad base64, non UTF-8 content,
/// a field count other than four, or an unparsable timestamp.
pub fn decode(encoded: &str) -> LicenseResult<LicensePayload> {
    decode_with_raw(encoded).map(|decoded| decoded.payload)
}

/// Like [`decode`], but also returns the raw delimited string.
pub fn decode_with_raw(encoded: &str) -> LicenseResult<DecodedPayload> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| LicenseError::MalformedLicense(format!("invalid payload base64: {e}")))?;
    let raw = String::from_utf8(bytes)
        .map_err(|_| LicenseError::MalformedLicense("payload is not UTF-8".to_string()))?;

    let parts: Vec<&str> = raw.split(FIELD_DELIMITER).collect();
    if parts.len() != FIELD_COUNT {
        return Err(LicenseError::MalformedLicense(format!(
            "expected {FIELD_COUNT} payload fields, found {}",
            parts.len()
        )));
    }

    let payload = LicensePayload {
        email: parts[0].to_string(),
        product_id: parts[1].to_string(),
        issued_at: parse_timestamp(parts[2])?,
        expires_at: parse_timestamp(parts[3])?,
    };

    Ok(DecodedPayload { payload, raw })
}

/// Formats a timestamp as ISO-8601 with milliseconds and a `Z` suffix.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedLicense`] if the string is not a valid timestamp.
pub fn parse_timestamp(s: &str) -> LicenseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| LicenseError::MalformedLicense(format!("invalid timestamp {s:?}: {e}")))
}

fn check_field(name: &str, value: &str) -> LicenseResult<()> {
    if value.is_empty() {
        return Err(LicenseError::InvalidField(format!("{name} must not be empty")));
    }
    if value.contains(FIELD_DELIMITER) {
        return Err(LicenseError::InvalidField(format!(
            "{name} must not contain '{FIELD_DELIMITER}'"
        )));
    }
    Ok(())
}

/// Serde adapter keeping JSON timestamps in the same shape as the wire format.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(serde::de::Error::custom)
    }
}
