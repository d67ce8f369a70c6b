//! Integration tests for access-control policy resolution.

use credvault::config::BackendConfig;
use credvault::errors::CredVaultError;
use credvault::policy::{
    validate_biometry_reuse, AccessControlFlags, ConfiguredPolicy, FixedBiometryPolicy,
    PolicyStrategy, ProtectionConstraint,
};

// ---------------------------------------------------------------------------
// Factor flag composition
// ---------------------------------------------------------------------------

#[test]
fn factor_flags_compose_independent_of_order() {
    let forward = AccessControlFlags::resolve(&["BiometryAny", "DevicePasscode"]).unwrap();
    let reverse = AccessControlFlags::resolve(&["DevicePasscode", "BiometryAny"]).unwrap();

    assert_eq!(forward, reverse);
    assert_eq!(
        forward,
        AccessControlFlags::BIOMETRY_ANY | AccessControlFlags::DEVICE_PASSCODE
    );
    assert!(forward.contains(AccessControlFlags::BIOMETRY_ANY));
    assert!(forward.contains(AccessControlFlags::DEVICE_PASSCODE));
    assert!(!forward.contains(AccessControlFlags::USER_PRESENCE));
}

#[test]
fn combinators_resolve_like_any_other_factor() {
    let flags =
        AccessControlFlags::resolve(&["BiometryCurrentSet", "ApplicationPassword", "And"]).unwrap();
    assert!(flags.contains(AccessControlFlags::AND));
    assert!(!flags.contains(AccessControlFlags::OR));
}

#[test]
fn unknown_factor_aborts_the_whole_mapping() {
    let err =
        AccessControlFlags::resolve(&["BiometryAny", "TelepathicConsent", "DevicePasscode"])
            .unwrap_err();

    match err {
        CredVaultError::InvalidConfiguration(msg) => {
            assert!(
                msg.contains("TelepathicConsent"),
                "error must name the offending factor: {msg}"
            );
        }
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Protection constraint resolution
// ---------------------------------------------------------------------------

#[test]
fn empty_constraint_name_selects_the_platform_default() {
    assert_eq!(
        ProtectionConstraint::resolve("").unwrap(),
        ProtectionConstraint::WhenUnlockedThisDeviceOnly
    );
}

#[test]
fn deprecated_constraint_names_are_rejected_with_a_replacement() {
    let err = ProtectionConstraint::resolve("Always").unwrap_err();
    match err {
        CredVaultError::InvalidConfiguration(msg) => {
            assert!(msg.contains("Always"));
            assert!(
                msg.contains("AfterFirstUnlock"),
                "error must point at the replacement: {msg}"
            );
        }
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }

    let err = ProtectionConstraint::resolve("AlwaysThisDeviceOnly").unwrap_err();
    match err {
        CredVaultError::InvalidConfiguration(msg) => {
            assert!(msg.contains("AfterFirstUnlockThisDeviceOnly"));
        }
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }
}

#[test]
fn unknown_constraint_names_the_offending_string() {
    let err = ProtectionConstraint::resolve("WhileDancing").unwrap_err();
    match err {
        CredVaultError::InvalidConfiguration(msg) => assert!(msg.contains("WhileDancing")),
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Biometric reuse validation
// ---------------------------------------------------------------------------

#[test]
fn negative_reuse_duration_is_rejected() {
    let err = validate_biometry_reuse(-1).unwrap_err();
    assert!(matches!(err, CredVaultError::InvalidConfiguration(_)));
}

#[test]
fn zero_and_positive_reuse_durations_are_accepted() {
    validate_biometry_reuse(0).unwrap();
    validate_biometry_reuse(3600).unwrap();
}

// ---------------------------------------------------------------------------
// Resolution strategies
// ---------------------------------------------------------------------------

#[test]
fn configured_strategy_resolves_names_from_the_config() {
    let mut config = BackendConfig::new("svc");
    config.protection = "WhenPasscodeSetThisDeviceOnly".into();
    config.access_control = vec!["UserPresence".into(), "CompanionDevice".into(), "Or".into()];

    let policy = ConfiguredPolicy.resolve(&config).unwrap();
    assert_eq!(
        policy.constraint,
        ProtectionConstraint::WhenPasscodeSetThisDeviceOnly
    );
    assert_eq!(
        policy.flags,
        AccessControlFlags::USER_PRESENCE
            | AccessControlFlags::COMPANION_DEVICE
            | AccessControlFlags::OR
    );
}

#[test]
fn configured_strategy_with_no_factors_yields_empty_flag_set() {
    let policy = ConfiguredPolicy.resolve(&BackendConfig::new("svc")).unwrap();
    assert!(policy.flags.is_empty());
    assert_eq!(policy.constraint, ProtectionConstraint::default());
}

#[test]
fn fixed_biometry_strategy_maps_the_unlocked_switch() {
    let mut config = BackendConfig::new("svc");

    config.accessible_when_unlocked = true;
    let policy = FixedBiometryPolicy.resolve(&config).unwrap();
    assert_eq!(policy.constraint, ProtectionConstraint::WhenUnlocked);
    assert_eq!(policy.flags, AccessControlFlags::BIOMETRY_CURRENT_SET);

    config.accessible_when_unlocked = false;
    let policy = FixedBiometryPolicy.resolve(&config).unwrap();
    assert_eq!(
        policy.constraint,
        ProtectionConstraint::WhenUnlockedThisDeviceOnly
    );
    assert_eq!(policy.flags, AccessControlFlags::BIOMETRY_CURRENT_SET);
}

#[test]
fn fixed_biometry_strategy_ignores_factor_names() {
    let mut config = BackendConfig::new("svc");
    config.access_control = vec!["NotARealFactor".into()];

    // The boolean model does not consult the name tables at all.
    let policy = FixedBiometryPolicy.resolve(&config).unwrap();
    assert_eq!(policy.flags, AccessControlFlags::BIOMETRY_CURRENT_SET);
}
