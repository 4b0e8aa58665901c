//! HMAC-SHA256 signing and verification of license payloads.
//!
//! Signatures are lowercase hex over the raw delimited payload string. A
//! [`Keyring`] signs with its primary secret and accepts signatures made by
//! any of its secrets, which lets a deployment rotate `LICENSE_SECRET` while
//! keys issued under the old secret remain valid.

use crate::error::{LicenseError, LicenseResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded HMAC-SHA256 signature.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// A server-held HMAC secret, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LicenseSecret {
    bytes: Vec<u8>,
}

impl LicenseSecret {
    /// Wraps raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the secret is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> LicenseResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(LicenseError::Config("license secret must not be empty".to_string()));
        }
        Ok(Self { bytes })
    }

    /// Returns the secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for LicenseSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Computes the hex HMAC-SHA256 of `raw` under `secret`.
#[must_use]
pub fn sign(raw: &str, secret: &LicenseSecret) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(raw.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `candidate` against the signature of `raw` in constant time.
#[must_use]
pub fn verify(raw: &str, secret: &LicenseSecret, candidate: &str) -> bool {
    signature_matches(raw, secret, candidate).into()
}

fn signature_matches(raw: &str, secret: &LicenseSecret, candidate: &str) -> Choice {
    sign(raw, secret).as_bytes().ct_eq(candidate.as_bytes())
}

/// The active signing secret plus retired secrets still accepted for verification.
#[derive(Debug, Clone)]
pub struct Keyring {
    primary: LicenseSecret,
    previous: Vec<LicenseSecret>,
}

impl Keyring {
    /// Creates a keyring with a single secret.
    pub fn new(primary: LicenseSecret) -> Self {
        Self {
            primary,
            previous: Vec::new(),
        }
    }

    /// Adds retired secrets that verify but never sign.
    #[must_use]
    pub fn with_previous(mut self, previous: impl IntoIterator<Item = LicenseSecret>) -> Self {
        self.previous.extend(previous);
        self
    }

    /// Signs with the primary secret.
    #[must_use]
    pub fn sign(&self, raw: &str) -> String {
        sign(raw, &self.primary)
    }

    /// Returns true if any secret in the ring produced `candidate`.
    ///
    /// Every secret is checked regardless of earlier matches.
    #[must_use]
    pub fn verify(&self, raw: &str, candidate: &str) -> bool {
        self.secrets()
            .fold(Choice::from(0), |acc, secret| {
                acc | signature_matches(raw, secret, candidate)
            })
            .into()
    }

    /// Number of secrets in the ring, primary included.
    #[must_use]
    pub fn secret_count(&self) -> usize {
        1 + self.previous.len()
    }

    fn secrets(&self) -> impl Iterator<Item = &LicenseSecret> {
        std::iter::once(&self.primary).chain(self.previous.iter())
    }
}
