//! Shared test helpers for license tests.

#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeZone, Utc};
use elevate_license::{Keyring, LicenseManager, LicenseSecret};

pub const TEST_SECRET: &str = "test-license-secret";

/// Returns a keyring holding only [`TEST_SECRET`].
pub fn test_keyring() -> Keyring {
    Keyring::new(LicenseSecret::new(TEST_SECRET).unwrap())
}

/// Returns a manager with no revocation list.
pub fn test_manager() -> LicenseManager {
    LicenseManager::new(test_keyring())
}

/// A fixed instant for clock-dependent assertions.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
}

/// Builds a key from an arbitrary raw payload string, signed with `secret`.
pub fn sign_raw(raw: &str, secret: &str) -> String {
    let sig = elevate_license::signature::sign(raw, &LicenseSecret::new(secret).unwrap());
    format!("{}.{}", STANDARD.encode(raw), sig)
}

/// Replaces the character at `idx` with a different hex digit.
pub fn flip_hex_char(s: &str, idx: usize) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    chars[idx] = if chars[idx] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}
