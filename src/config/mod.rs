use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};

/// Backend configuration, consumed once when a backend is constructed.
///
/// Every field except `service` has a default, so a minimal TOML file of
/// `service = "my-app"` is a complete configuration.  Validation happens
/// at backend construction: unknown factor or constraint names and a
/// negative reuse duration fail there, before any store call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Service namespace all items of this backend live under.
    pub service: String,

    /// Access-control factor names (e.g. `"BiometryAny"`,
    /// `"DevicePasscode"`, combined with `"And"`/`"Or"`).
    #[serde(default)]
    pub access_control: Vec<String>,

    /// Protection-constraint name.  Empty selects the platform default.
    #[serde(default)]
    pub protection: String,

    /// Grace window in seconds during which a prior successful biometric
    /// check is reused without re-prompting.  Zero disables reuse.
    #[serde(default)]
    pub biometry_reuse_seconds: i64,

    /// Whether items written by this backend may sync across devices by
    /// default.  Individual items can still opt out.
    #[serde(default)]
    pub synchronizable: bool,

    /// Shorthand used by the fixed-biometry policy strategy: `true` maps
    /// to the `WhenUnlocked` constraint.  Ignored by the configured
    /// strategy.
    #[serde(default)]
    pub accessible_when_unlocked: bool,
}

impl BackendConfig {
    /// A configuration for `service` with everything else defaulted.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            access_control: Vec::new(),
            protection: String::new(),
            biometry_reuse_seconds: 0,
            synchronizable: false,
            accessible_when_unlocked: false,
        }
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;

        let config: BackendConfig = toml::from_str(&contents).map_err(|e| {
            CredVaultError::InvalidConfiguration(format!(
                "failed to parse {}: {e}",
                path.display()
            ))
        })?;

        Ok(config)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
