use thiserror::Error;

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Construction errors ---
    /// A factor name, protection-constraint name, or biometric-reuse
    /// duration failed validation.  Raised only while constructing a
    /// backend; no partial backend is ever returned.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // --- Lookup errors ---
    /// No item matches the requested key.  Returned by `get`,
    /// `get_metadata`, and `remove`; callers branch on this to decide
    /// create vs. update.
    #[error("Key not found")]
    KeyNotFound,

    // --- Store errors ---
    /// Any native store failure other than a miss, wrapped with the
    /// operation that issued it.  Opaque and not retried at this layer;
    /// the key is `*` for service-wide operations.
    #[error("Store {operation} failed for service '{service}', key '{key}': {message}")]
    Store {
        operation: &'static str,
        service: String,
        key: String,
        message: String,
    },

    /// The record vanished between a duplicate-entry add and the
    /// confirming re-query.  Raised only inside `set`; the caller is
    /// expected to retry the whole `set`.
    #[error("Item '{key}' in service '{service}' disappeared during upsert")]
    LostUpdate { service: String, key: String },

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
