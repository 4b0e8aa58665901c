mod common;

use chrono::Duration;
use common::{fixed_now, flip_hex_char, sign_raw, test_keyring, test_manager, TEST_SECRET};
use elevate_license::{
    inspect, DEFAULT_DURATION_DAYS, InvalidReason, Keyring, LicenseError, LicenseManager,
    LicenseSecret, MemoryRevocationList, Validation,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ── Generation ───────────────────────────────────────────────────

#[test]
fn generate_scenario_prod_x_365_days() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "prod_X", 365).unwrap();

    let payload = inspect(&issued.key).unwrap();
    assert_eq!(payload.product_id, "prod_X");
    assert_eq!(payload.email, "a@b.com");

    let millis = (payload.expires_at - payload.issued_at).num_milliseconds();
    let days = (millis + 86_400_000 - 1) / 86_400_000;
    assert_eq!(days, 365);
}

#[test]
fn generated_key_has_two_segments() {
    let issued = test_manager()
        .generate("a@b.com", "prod_X", DEFAULT_DURATION_DAYS)
        .unwrap();
    let (encoded, signature) = issued.key.split_once('.').unwrap();
    assert!(!encoded.is_empty());
    assert_eq!(signature.len(), 64);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_is_deterministic_for_fixed_clock() {
    let manager = test_manager();
    let a = manager.generate_at("a@b.com", "p", 30, fixed_now()).unwrap();
    let b = manager.generate_at("a@b.com", "p", 30, fixed_now()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn generate_rejects_delimiter_and_empty_fields() {
    let manager = test_manager();
    assert!(matches!(
        manager.generate("a@b.com", "prod|X", 30),
        Err(LicenseError::InvalidField(_))
    ));
    assert!(matches!(
        manager.generate("", "prod_X", 30),
        Err(LicenseError::InvalidField(_))
    ));
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn validate_round_trip() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "prod_X", 30).unwrap();
    match manager.validate(&issued.key) {
        Validation::Valid(payload) => assert_eq!(payload, issued.payload),
        other => panic!("expected valid, got {other:?}"),
    }
}

#[test]
fn validate_tolerates_surrounding_whitespace() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "prod_X", 30).unwrap();
    assert!(manager.validate(&format!("  {}\n", issued.key)).is_valid());
}

#[test]
fn negative_duration_is_expired() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "prod_X", -1).unwrap();
    assert_eq!(
        manager.validate(&issued.key),
        Validation::Invalid(InvalidReason::Expired)
    );
}

#[test]
fn key_expires_after_its_window() {
    let manager = test_manager();
    let issued = manager.generate_at("a@b.com", "p", 10, fixed_now()).unwrap();
    let at_expiry = fixed_now() + Duration::days(10);

    assert!(manager.validate_at(&issued.key, at_expiry).is_valid());
    assert_eq!(
        manager.validate_at(&issued.key, at_expiry + Duration::milliseconds(1)),
        Validation::Invalid(InvalidReason::Expired)
    );
}

#[test]
fn malformed_input_is_reported_not_thrown() {
    let manager = test_manager();
    for key in ["not-a-real-license", "", ".", "abc.", ".abc", "!!!!.deadbeef"] {
        assert_eq!(
            manager.validate(key),
            Validation::Invalid(InvalidReason::Malformed),
            "key {key:?}"
        );
    }
}

#[test]
fn wrong_field_count_is_malformed() {
    let key = sign_raw("a@b.com|p|2025-01-01T00:00:00.000Z", TEST_SECRET);
    assert_eq!(
        test_manager().validate(&key).reason(),
        Some(InvalidReason::Malformed)
    );
}

#[test]
fn bad_timestamp_is_malformed() {
    let key = sign_raw("a@b.com|p|yesterday|2099-01-01T00:00:00.000Z", TEST_SECRET);
    assert_eq!(
        test_manager().validate(&key).reason(),
        Some(InvalidReason::Malformed)
    );
}

#[test]
fn tampered_signature_detected() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "prod_X", 30).unwrap();
    let dot = issued.key.find('.').unwrap();
    let tampered = flip_hex_char(&issued.key, dot + 5);
    assert_eq!(
        manager.validate(&tampered),
        Validation::Invalid(InvalidReason::InvalidSignature)
    );
}

#[test]
fn swapped_payload_detected() {
    let manager = test_manager();
    let a = manager.generate("a@b.com", "prod_X", 30).unwrap();
    let b = manager.generate("a@b.com", "prod_Y", 30).unwrap();
    let (payload_b, _) = b.key.split_once('.').unwrap();
    let (_, sig_a) = a.key.split_once('.').unwrap();
    assert_eq!(
        manager.validate(&format!("{payload_b}.{sig_a}")).reason(),
        Some(InvalidReason::InvalidSignature)
    );
}

#[test]
fn tampered_expired_key_reports_signature_first() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "prod_X", -10).unwrap();
    let tampered = flip_hex_char(&issued.key, issued.key.len() - 1);
    assert_eq!(
        manager.validate(&tampered).reason(),
        Some(InvalidReason::InvalidSignature)
    );
}

#[test]
fn key_from_other_secret_rejected() {
    let other = LicenseManager::new(Keyring::new(LicenseSecret::new("other").unwrap()));
    let issued = other.generate("a@b.com", "p", 30).unwrap();
    assert_eq!(
        test_manager().validate(&issued.key).reason(),
        Some(InvalidReason::InvalidSignature)
    );
}

#[test]
fn rotated_secret_still_validates_old_keys() {
    let old = test_manager().generate("a@b.com", "p", 30).unwrap();
    let rotated = LicenseManager::new(
        Keyring::new(LicenseSecret::new("new-secret").unwrap())
            .with_previous([LicenseSecret::new(TEST_SECRET).unwrap()]),
    );

    assert!(rotated.validate(&old.key).is_valid());
    let fresh = rotated.generate("a@b.com", "p", 30).unwrap();
    assert!(!test_manager().validate(&fresh.key).is_valid());
}

// ── Revocation ───────────────────────────────────────────────────

#[test]
fn revoked_key_is_rejected() {
    let list = Arc::new(MemoryRevocationList::new());
    let manager = LicenseManager::new(test_keyring()).with_revocations(list.clone());
    let issued = manager.generate("a@b.com", "p", 30).unwrap();
    let other = manager.generate("c@d.com", "p", 30).unwrap();

    list.revoke(manager.key_id(&issued.key).unwrap());

    assert_eq!(
        manager.validate(&issued.key).reason(),
        Some(InvalidReason::Revoked)
    );
    assert!(manager.validate(&other.key).is_valid());
}

#[test]
fn key_id_requires_valid_signature() {
    let manager = test_manager();
    let issued = manager.generate("a@b.com", "p", -5).unwrap();
    assert!(manager.key_id(&issued.key).is_ok());

    let tampered = flip_hex_char(&issued.key, issued.key.len() - 1);
    assert!(matches!(
        manager.key_id(&tampered),
        Err(LicenseError::InvalidSignature)
    ));
}

// ── Renewal ──────────────────────────────────────────────────────

#[test]
fn renew_extends_from_now() {
    let manager = test_manager();
    let original = manager.generate_at("a@b.com", "prod_X", 5, fixed_now()).unwrap();
    let later = fixed_now() + Duration::days(2);

    let renewal = manager.renew_at(&original.key, 30, later).unwrap();
    let payload = inspect(&renewal.issued.key).unwrap();

    assert_eq!(payload.email, "a@b.com");
    assert_eq!(payload.product_id, "prod_X");
    assert_eq!(payload.issued_at, later);
    assert_eq!(payload.expires_at, later + Duration::days(30));
    assert_eq!(renewal.previous, original.payload);
    assert_ne!(renewal.issued.key, original.key);
}

#[test]
fn renew_with_real_clock_is_about_thirty_days() {
    let manager = test_manager();
    let original = manager.generate("a@b.com", "prod_X", 365).unwrap();
    let renewal = manager.renew(&original.key, 30).unwrap();

    let expected = chrono::Utc::now() + Duration::days(30);
    let drift = (renewal.issued.payload.expires_at - expected).num_seconds().abs();
    assert!(drift < 60, "drift was {drift}s");
    assert!(manager.validate(&renewal.issued.key).is_valid());
}

#[test]
fn renew_rejects_expired_key() {
    let manager = test_manager();
    let expired = manager.generate("a@b.com", "prod_X", -1).unwrap();
    let err = manager.renew(&expired.key, 30).unwrap_err();
    assert!(matches!(
        err,
        LicenseError::InvalidForRenewal(InvalidReason::Expired)
    ));
    assert!(err.to_string().starts_with("Invalid license for renewal"));
}

#[test]
fn renew_rejects_garbage() {
    let err = test_manager().renew("not-a-real-license", 30).unwrap_err();
    assert!(matches!(
        err,
        LicenseError::InvalidForRenewal(InvalidReason::Malformed)
    ));
}

// ── Preview ──────────────────────────────────────────────────────

#[test]
fn inspect_ignores_signature() {
    let issued = test_manager().generate("a@b.com", "prod_X", 30).unwrap();
    let tampered = flip_hex_char(&issued.key, issued.key.len() - 1);
    assert_eq!(inspect(&tampered).unwrap(), issued.payload);
    assert!(matches!(
        inspect("garbage"),
        Err(LicenseError::MalformedLicense(_))
    ));
}

#[test]
fn payload_json_uses_camel_case_millis() {
    let issued = test_manager()
        .generate_at("a@b.com", "prod_X", 1, fixed_now())
        .unwrap();
    let json = serde_json::to_value(&issued.payload).unwrap();
    assert_eq!(json["productId"], "prod_X");
    assert_eq!(json["issuedAt"], "2025-06-01T09:30:00.000Z");
    assert_eq!(json["expiresAt"], "2025-06-02T09:30:00.000Z");
}
