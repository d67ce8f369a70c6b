//! Item and Metadata types handled by the credential backend.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroize;

/// A named secret with optional display metadata.
///
/// Identity is `(service, key)`; the service comes from the backend the
/// item is written through.  `Debug` redacts the payload.
#[derive(Clone, Zeroize)]
pub struct Item {
    /// Unique identifier within the backend's service namespace.
    pub key: String,

    /// Opaque secret payload.
    pub data: Vec<u8>,

    /// Optional display label.
    pub label: String,

    /// Optional display description.
    pub description: String,

    /// Whether this item may participate in the backend-wide
    /// synchronizable default.  `false` keeps the item device-local even
    /// when the backend default is "synchronizable".
    pub sync_allowed: bool,
}

impl Item {
    /// An item with the given key and payload and no display metadata.
    pub fn new(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            label: String::new(),
            description: String::new(),
            sync_allowed: true,
        }
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new(String::new(), Vec::new())
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("key", &self.key)
            .field("data", &format!("[{} bytes]", self.data.len()))
            .field("label", &self.label)
            .field("description", &self.description)
            .field("sync_allowed", &self.sync_allowed)
            .finish()
    }
}

/// A detached view of an item's descriptive fields plus the
/// store-assigned modification time.  Never carries the secret payload
/// and is never written back.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub key: String,
    pub label: String,
    pub description: String,
    pub modified_at: DateTime<Utc>,
}
