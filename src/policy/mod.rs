//! Access-control policy mapping.
//!
//! Pure translation from configuration names to the native access-control
//! descriptor: a protection constraint (*when* an item is decryptable)
//! plus a set of access-control factor flags (*what* the user must
//! present).  Both tables are data-driven so new factors and constraints
//! stay additive.  Nothing here touches the store; misconfiguration is
//! caught while the backend is constructed, before any native call.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::config::BackendConfig;
use crate::errors::{CredVaultError, Result};

// ── Access-control factors ───────────────────────────────────────────

/// A set of access-control factors, one bit per factor.
///
/// Factors gate decryption of an item.  More than one factor is combined
/// with an explicit [`AND`](Self::AND) or [`OR`](Self::OR) combinator,
/// which the platform treats as flags of their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessControlFlags(u32);

impl AccessControlFlags {
    /// The user must be present (any factor the platform accepts).
    pub const USER_PRESENCE: Self = Self(1 << 0);
    /// Any enrolled biometry; survives biometric re-enrollment.
    pub const BIOMETRY_ANY: Self = Self(1 << 1);
    /// The biometry set enrolled at write time; invalidated when the
    /// enrollment changes.
    pub const BIOMETRY_CURRENT_SET: Self = Self(1 << 2);
    /// The device passcode.
    pub const DEVICE_PASSCODE: Self = Self(1 << 3);
    /// A paired companion device (e.g. a watch).
    pub const COMPANION_DEVICE: Self = Self(1 << 4);
    /// Restrict the protected key to signing/decryption use.
    pub const PRIVATE_KEY_USAGE: Self = Self(1 << 5);
    /// An application-supplied password.
    pub const APPLICATION_PASSWORD: Self = Self(1 << 6);
    /// All listed factors must be satisfied.
    pub const AND: Self = Self(1 << 7);
    /// Any one listed factor suffices.
    pub const OR: Self = Self(1 << 8);

    /// The empty set: no factor required beyond the protection constraint.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if no factor bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit representation, for handing to a native descriptor.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Resolve a sequence of factor names into one flag set.
    ///
    /// Order is irrelevant and duplicates are idempotent (bits combine
    /// with OR).  The first unrecognized name aborts the whole mapping;
    /// partial results are never returned.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut flags = Self::empty();
        for name in names {
            let name = name.as_ref();
            let flag = FLAG_NAMES
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, f)| *f)
                .ok_or_else(|| {
                    CredVaultError::InvalidConfiguration(format!(
                        "unknown access-control factor '{name}'"
                    ))
                })?;
            flags |= flag;
        }
        Ok(flags)
    }
}

impl BitOr for AccessControlFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessControlFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Factor name → bit.  Adding a factor means adding a row.
const FLAG_NAMES: &[(&str, AccessControlFlags)] = &[
    ("UserPresence", AccessControlFlags::USER_PRESENCE),
    ("BiometryAny", AccessControlFlags::BIOMETRY_ANY),
    ("BiometryCurrentSet", AccessControlFlags::BIOMETRY_CURRENT_SET),
    ("DevicePasscode", AccessControlFlags::DEVICE_PASSCODE),
    ("CompanionDevice", AccessControlFlags::COMPANION_DEVICE),
    ("PrivateKeyUsage", AccessControlFlags::PRIVATE_KEY_USAGE),
    ("ApplicationPassword", AccessControlFlags::APPLICATION_PASSWORD),
    ("And", AccessControlFlags::AND),
    ("Or", AccessControlFlags::OR),
];

// ── Protection constraints ───────────────────────────────────────────

/// When an item is decryptable.  Exactly one constraint is active per
/// backend; the default is the most restrictive device-local value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProtectionConstraint {
    /// While the device is unlocked; the item may migrate to new devices.
    WhenUnlocked,
    /// Any time after the first unlock since boot; may migrate.
    AfterFirstUnlock,
    /// While unlocked, and only on the device that wrote it.
    #[default]
    WhenUnlockedThisDeviceOnly,
    /// After first unlock since boot, and only on this device.
    AfterFirstUnlockThisDeviceOnly,
    /// Only while a passcode is set, and only on this device.  Removing
    /// the passcode destroys the item.
    WhenPasscodeSetThisDeviceOnly,
}

impl ProtectionConstraint {
    /// Resolve a constraint name from configuration.
    ///
    /// The empty string selects the platform default (the most
    /// restrictive device-local constraint).  The names `Always` and
    /// `AlwaysThisDeviceOnly` describe platform semantics that are
    /// deprecated and weaker than intended, so they are rejected with a
    /// pointer to the closest supported replacement rather than silently
    /// mapped.
    pub fn resolve(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Ok(Self::default());
        }
        if let Some((_, replacement)) = DEPRECATED_CONSTRAINTS.iter().find(|(n, _)| *n == name) {
            return Err(CredVaultError::InvalidConfiguration(format!(
                "protection constraint '{name}' is deprecated, use '{replacement}' instead"
            )));
        }
        CONSTRAINT_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                CredVaultError::InvalidConfiguration(format!(
                    "unknown protection constraint '{name}'"
                ))
            })
    }
}

impl fmt::Display for ProtectionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = CONSTRAINT_NAMES
            .iter()
            .find(|(_, c)| c == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown");
        f.write_str(name)
    }
}

/// Constraint name → enumerated value.
const CONSTRAINT_NAMES: &[(&str, ProtectionConstraint)] = &[
    ("WhenUnlocked", ProtectionConstraint::WhenUnlocked),
    ("AfterFirstUnlock", ProtectionConstraint::AfterFirstUnlock),
    (
        "WhenUnlockedThisDeviceOnly",
        ProtectionConstraint::WhenUnlockedThisDeviceOnly,
    ),
    (
        "AfterFirstUnlockThisDeviceOnly",
        ProtectionConstraint::AfterFirstUnlockThisDeviceOnly,
    ),
    (
        "WhenPasscodeSetThisDeviceOnly",
        ProtectionConstraint::WhenPasscodeSetThisDeviceOnly,
    ),
];

/// Deprecated constraint name → suggested replacement.
const DEPRECATED_CONSTRAINTS: &[(&str, &str)] = &[
    ("Always", "AfterFirstUnlock"),
    ("AlwaysThisDeviceOnly", "AfterFirstUnlockThisDeviceOnly"),
];

// ── Biometric reuse ──────────────────────────────────────────────────

/// Validate the biometric-reuse grace duration from configuration.
///
/// Zero means "no reuse window" and is valid; a negative duration is a
/// configuration error.
pub fn validate_biometry_reuse(seconds: i64) -> Result<()> {
    if seconds < 0 {
        return Err(CredVaultError::InvalidConfiguration(format!(
            "biometry reuse duration must not be negative (got {seconds}s)"
        )));
    }
    Ok(())
}

// ── Resolved policy ──────────────────────────────────────────────────

/// The resolved, immutable access-control descriptor attached to every
/// item a backend writes.
///
/// Resolved once per backend instance at construction; all items written
/// by that instance share it.  The per-item sync opt-out is the only
/// per-item override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub constraint: ProtectionConstraint,
    pub flags: AccessControlFlags,
}

// ── Resolution strategies ────────────────────────────────────────────

/// A way of turning a configuration bundle into an [`AccessPolicy`].
///
/// The lifecycle engine is written once against `AccessPolicy` and does
/// not care which strategy produced it.
pub trait PolicyStrategy {
    fn resolve(&self, config: &BackendConfig) -> Result<AccessPolicy>;
}

/// Resolves the full declarative policy model: a named protection
/// constraint plus named access-control factors.
///
/// This is the default strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredPolicy;

impl PolicyStrategy for ConfiguredPolicy {
    fn resolve(&self, config: &BackendConfig) -> Result<AccessPolicy> {
        Ok(AccessPolicy {
            constraint: ProtectionConstraint::resolve(&config.protection)?,
            flags: AccessControlFlags::resolve(&config.access_control)?,
        })
    }
}

/// The boolean policy model kept for configurations that predate named
/// factors: a single "accessible while unlocked" switch plus a fixed
/// biometry-current-set requirement.  Factor and constraint names in the
/// configuration are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedBiometryPolicy;

impl PolicyStrategy for FixedBiometryPolicy {
    fn resolve(&self, config: &BackendConfig) -> Result<AccessPolicy> {
        let constraint = if config.accessible_when_unlocked {
            ProtectionConstraint::WhenUnlocked
        } else {
            ProtectionConstraint::default()
        };
        Ok(AccessPolicy {
            constraint,
            flags: AccessControlFlags::BIOMETRY_CURRENT_SET,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
