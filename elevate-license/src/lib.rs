//! License keys for the Elevate for Humanity platform.
//!
//! This crate handles:
//! - Encoding license payloads (email, product, validity window)
//! - HMAC-SHA256 signing with rotatable server secrets
//! - Validation, renewal and payload preview
//! - Optional revocation lists
//! - Domain-keyed copyright protection for deployed sites
//!
//! # License Key Format
//!
//! Keys are formatted as: `base64(email|productId|issuedAt|expiresAt).hex(hmac)`
//!
//! The HMAC covers the delimited payload string before base64 encoding. Keys are
//! self-describing: nothing is stored server-side, and a key can only be
//! invalidated early through a [`RevocationList`].

pub mod codec;
pub mod domain;
mod error;
mod manager;
mod revocation;
pub mod signature;

pub use codec::{LicensePayload, decode, encode};
pub use domain::{DomainCheck, DomainGrant, DomainRegistry, DomainTier, required_feature};
pub use error::{LicenseError, LicenseResult};
pub use manager::{
    DEFAULT_DURATION_DAYS, InvalidReason, IssuedLicense, LicenseManager, Renewal, Validation,
    inspect,
};
pub use revocation::{MemoryRevocationList, RevocationList};
pub use signature::{Keyring, LicenseSecret};
