//! Contract for the platform secure-storage primitive.
//!
//! This module specifies the shape the external store must have, not any
//! concrete platform binding: four verbs over attribute-tagged records,
//! a not-found and a duplicate-entry signal, and an opaque authentication
//! context that lets the platform reuse a prior interactive factor check.
//!
//! The in-memory reference implementation lives in [`memory`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::policy::AccessPolicy;

pub mod memory;

pub use memory::MemoryStore;

// ── Native signals ───────────────────────────────────────────────────

/// Failure signals a store implementation may report.
///
/// `NotFound` and `Duplicate` are the two signals the backend branches
/// on; everything else is carried opaquely in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("item not found")]
    NotFound,

    #[error("duplicate item")]
    Duplicate,

    #[error("{0}")]
    Other(String),
}

/// Result alias for native store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ── Authentication context ───────────────────────────────────────────

/// Opaque per-backend token influencing interactive factor re-use.
///
/// Created once when a backend is constructed and borrowed by every
/// query that backend issues; never shared across backend instances.
/// The reuse window is the grace period during which a prior successful
/// biometric check satisfies the policy without re-prompting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    allowable_reuse: Option<Duration>,
}

impl AuthContext {
    pub fn new(allowable_reuse: Option<Duration>) -> Self {
        Self { allowable_reuse }
    }

    /// The biometric-reuse grace window, if one was configured.
    pub fn allowable_reuse(&self) -> Option<Duration> {
        self.allowable_reuse
    }
}

// ── Query and record types ───────────────────────────────────────────

/// How many records a query may yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    One,
    All,
}

/// A native query: scope plus what to return.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    pub service: &'a str,
    /// Item key; `None` scopes the query to the whole service.
    pub account: Option<&'a str>,
    pub match_limit: MatchLimit,
    pub return_attributes: bool,
    pub return_data: bool,
    pub return_ref: bool,
    pub auth: Option<&'a AuthContext>,
}

/// A fully populated record handed to the add verb.
///
/// No `Debug` on purpose: `data` is a live secret.
pub struct NewRecord<'a> {
    pub service: &'a str,
    pub account: &'a str,
    pub label: &'a str,
    pub description: &'a str,
    pub data: &'a [u8],
    pub access: &'a AccessPolicy,
    pub synchronizable: bool,
}

/// Fields to replace on an existing record.  Unset fields are untouched.
#[derive(Default)]
pub struct Patch<'a> {
    pub data: Option<&'a [u8]>,
}

/// A record yielded by the query verb.
///
/// `data` is present only when the query asked for it.
#[derive(Clone)]
pub struct Record {
    pub account: String,
    pub label: String,
    pub description: String,
    pub data: Option<Vec<u8>>,
    pub modified_at: DateTime<Utc>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("account", &self.account)
            .field("label", &self.label)
            .field("description", &self.description)
            .field(
                "data",
                &self.data.as_ref().map(|d| format!("[{} bytes]", d.len())),
            )
            .field("modified_at", &self.modified_at)
            .finish()
    }
}

// ── The store trait ──────────────────────────────────────────────────

/// The four verbs a platform secure store must expose.
///
/// Implementations are expected to report a missing record as
/// [`StoreError::NotFound`] (for account-scoped queries and deletes) and
/// an add on an existing `(service, account)` pair as
/// [`StoreError::Duplicate`].  A service-wide query over an empty store
/// yields an empty vec, not an error.
pub trait SecureStore {
    fn query(&self, query: &Query<'_>) -> StoreResult<Vec<Record>>;

    fn add(&self, record: &NewRecord<'_>) -> StoreResult<()>;

    fn update(&self, target: &Query<'_>, patch: &Patch<'_>) -> StoreResult<()>;

    fn delete(&self, target: &Query<'_>) -> StoreResult<()>;
}

// Stores are usable through shared handles; operations take `&self`.

impl<S: SecureStore + ?Sized> SecureStore for &S {
    fn query(&self, query: &Query<'_>) -> StoreResult<Vec<Record>> {
        (**self).query(query)
    }

    fn add(&self, record: &NewRecord<'_>) -> StoreResult<()> {
        (**self).add(record)
    }

    fn update(&self, target: &Query<'_>, patch: &Patch<'_>) -> StoreResult<()> {
        (**self).update(target, patch)
    }

    fn delete(&self, target: &Query<'_>) -> StoreResult<()> {
        (**self).delete(target)
    }
}

impl<S: SecureStore + ?Sized> SecureStore for Arc<S> {
    fn query(&self, query: &Query<'_>) -> StoreResult<Vec<Record>> {
        (**self).query(query)
    }

    fn add(&self, record: &NewRecord<'_>) -> StoreResult<()> {
        (**self).add(record)
    }

    fn update(&self, target: &Query<'_>, patch: &Patch<'_>) -> StoreResult<()> {
        (**self).update(target, patch)
    }

    fn delete(&self, target: &Query<'_>) -> StoreResult<()> {
        (**self).delete(target)
    }
}
