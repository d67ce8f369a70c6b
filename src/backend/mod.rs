//! Credential backend: the item lifecycle engine.
//!
//! This module provides:
//! - `Item` and `Metadata` types (`item`)
//! - `CredentialBackend`, which realizes get / get-metadata / set /
//!   remove / list-keys against any [`SecureStore`], applying one access
//!   policy resolved at construction
//!
//! The store has no native upsert, so `set` is a two-phase protocol:
//! add, and on the duplicate-entry signal confirm the record still
//! exists and patch its secret bytes.  The race where the record
//! disappears in between surfaces as [`CredVaultError::LostUpdate`]
//! rather than being retried here.

pub mod item;

pub use item::{Item, Metadata};

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::config::BackendConfig;
use crate::errors::{CredVaultError, Result};
use crate::policy::{self, AccessPolicy, ConfiguredPolicy, PolicyStrategy};
use crate::store::{AuthContext, MatchLimit, NewRecord, Patch, Query, SecureStore, StoreError};

/// A credential store backend bound to one service namespace.
///
/// The access policy and authentication context are resolved once at
/// construction and are immutable afterwards, so a single instance can
/// be shared by concurrent callers without synchronization.  Every
/// operation round-trips to the store; nothing is cached in between.
pub struct CredentialBackend<S: SecureStore> {
    store: S,
    service: String,
    policy: AccessPolicy,
    auth: AuthContext,
    synchronizable: bool,
}

impl<S: SecureStore> fmt::Debug for CredentialBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBackend")
            .field("service", &self.service)
            .field("policy", &self.policy)
            .field("auth", &self.auth)
            .field("synchronizable", &self.synchronizable)
            .finish_non_exhaustive()
    }
}

impl<S: SecureStore> CredentialBackend<S> {
    /// Construct a backend using the default (configured) policy
    /// strategy.
    ///
    /// Fails with [`CredVaultError::InvalidConfiguration`] on an
    /// unrecognized factor or constraint name or a negative reuse
    /// duration; no store call is made in that case.
    pub fn new(store: S, config: &BackendConfig) -> Result<Self> {
        Self::with_strategy(store, config, &ConfiguredPolicy)
    }

    /// Construct a backend with an explicit policy-resolution strategy.
    pub fn with_strategy(
        store: S,
        config: &BackendConfig,
        strategy: &dyn PolicyStrategy,
    ) -> Result<Self> {
        if config.service.is_empty() {
            return Err(CredVaultError::InvalidConfiguration(
                "service name must not be empty".into(),
            ));
        }
        policy::validate_biometry_reuse(config.biometry_reuse_seconds)?;
        let policy = strategy.resolve(config)?;

        let reuse = (config.biometry_reuse_seconds > 0)
            .then(|| Duration::from_secs(config.biometry_reuse_seconds as u64));

        Ok(Self {
            store,
            service: config.service.clone(),
            policy,
            auth: AuthContext::new(reuse),
            synchronizable: config.synchronizable,
        })
    }

    /// The service namespace this backend writes under.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The access policy applied to every item this backend writes.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    // ------------------------------------------------------------------
    // Item operations
    // ------------------------------------------------------------------

    /// Fetch an item, secret payload included.
    pub fn get(&self, key: &str) -> Result<Item> {
        let query = Query {
            service: &self.service,
            account: Some(key),
            match_limit: MatchLimit::One,
            return_attributes: true,
            return_data: true,
            return_ref: false,
            auth: Some(&self.auth),
        };

        debug!(service = %self.service, account = %key, "querying item");
        let results = match self.store.query(&query) {
            Ok(results) => results,
            Err(StoreError::NotFound) => return Err(CredVaultError::KeyNotFound),
            Err(err) => return Err(self.store_failure("get", Some(key), err)),
        };

        let Some(record) = results.into_iter().next() else {
            return Err(CredVaultError::KeyNotFound);
        };

        // The store's account attribute and the caller's key are
        // definitionally identical, so the key is echoed from the
        // request rather than re-read from the record.
        Ok(Item {
            key: key.to_string(),
            data: record.data.unwrap_or_default(),
            label: record.label,
            description: record.description,
            sync_allowed: true,
        })
    }

    /// Fetch an item's descriptive fields and modification time without
    /// its secret payload.
    pub fn get_metadata(&self, key: &str) -> Result<Metadata> {
        let query = Query {
            service: &self.service,
            account: Some(key),
            match_limit: MatchLimit::One,
            return_attributes: true,
            return_data: false,
            return_ref: true,
            auth: Some(&self.auth),
        };

        debug!(service = %self.service, account = %key, "querying item metadata");
        let results = match self.store.query(&query) {
            Ok(results) => results,
            Err(StoreError::NotFound) => return Err(CredVaultError::KeyNotFound),
            Err(err) => return Err(self.store_failure("get_metadata", Some(key), err)),
        };

        let Some(record) = results.into_iter().next() else {
            return Err(CredVaultError::KeyNotFound);
        };

        Ok(Metadata {
            key: key.to_string(),
            label: record.label,
            description: record.description,
            modified_at: record.modified_at,
        })
    }

    /// Create or update an item.
    ///
    /// The item is written with the backend's access policy.  The
    /// synchronizable marker is applied only when the backend default
    /// allows sync and the item has not opted out.  On an existing key
    /// the add fails with the duplicate-entry signal and only the secret
    /// bytes are patched; label and description stay as written by the
    /// create.  Exactly one record exists per key afterwards.
    pub fn set(&self, item: &Item) -> Result<()> {
        let record = NewRecord {
            service: &self.service,
            account: &item.key,
            label: &item.label,
            description: &item.description,
            data: &item.data,
            access: &self.policy,
            synchronizable: self.synchronizable && item.sync_allowed,
        };

        debug!(
            service = %self.service,
            account = %item.key,
            label = %item.label,
            "adding item"
        );
        match self.store.add(&record) {
            Ok(()) => Ok(()),
            Err(StoreError::Duplicate) => {
                debug!(service = %self.service, account = %item.key, "item exists, updating");
                self.update_existing(&item.key, &item.data)
            }
            Err(err) => Err(self.store_failure("add", Some(&item.key), err)),
        }
    }

    /// Delete an item.  A missing key reports [`CredVaultError::KeyNotFound`],
    /// the same miss condition as never having written it.
    pub fn remove(&self, key: &str) -> Result<()> {
        let target = Query {
            service: &self.service,
            account: Some(key),
            match_limit: MatchLimit::One,
            return_attributes: false,
            return_data: false,
            return_ref: false,
            auth: None,
        };

        debug!(service = %self.service, account = %key, "removing item");
        match self.store.delete(&target) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(CredVaultError::KeyNotFound),
            Err(err) => Err(self.store_failure("delete", Some(key), err)),
        }
    }

    /// List the keys of every item under this backend's service.
    ///
    /// Order is store-defined and not guaranteed stable across calls.
    /// An empty store yields an empty vec.
    pub fn keys(&self) -> Result<Vec<String>> {
        let query = Query {
            service: &self.service,
            account: None,
            match_limit: MatchLimit::All,
            return_attributes: true,
            return_data: false,
            return_ref: false,
            auth: Some(&self.auth),
        };

        debug!(service = %self.service, "listing keys");
        let results = match self.store.query(&query) {
            Ok(results) => results,
            Err(StoreError::NotFound) => Vec::new(),
            Err(err) => return Err(self.store_failure("keys", None, err)),
        };

        debug!(service = %self.service, count = results.len(), "found keys");
        Ok(results.into_iter().map(|r| r.account).collect())
    }

    // ------------------------------------------------------------------
    // Upsert fallback
    // ------------------------------------------------------------------

    /// The update path of `set`: confirm the record still exists, then
    /// patch its secret bytes.
    ///
    /// Between the failed add and this re-query a concurrent remove can
    /// delete the record; that lost-update race is surfaced so the
    /// caller can retry the whole `set`.
    fn update_existing(&self, key: &str, data: &[u8]) -> Result<()> {
        let target = Query {
            service: &self.service,
            account: Some(key),
            match_limit: MatchLimit::One,
            return_attributes: true,
            return_data: false,
            return_ref: false,
            auth: Some(&self.auth),
        };

        let results = match self.store.query(&target) {
            Ok(results) => results,
            Err(StoreError::NotFound) => return Err(self.lost_update(key)),
            Err(err) => return Err(self.store_failure("update", Some(key), err)),
        };
        if results.is_empty() {
            return Err(self.lost_update(key));
        }

        let patch = Patch { data: Some(data) };
        self.store
            .update(&target, &patch)
            .map_err(|err| self.store_failure("update", Some(key), err))
    }

    // ------------------------------------------------------------------
    // Error mapping
    // ------------------------------------------------------------------

    fn store_failure(
        &self,
        operation: &'static str,
        key: Option<&str>,
        err: StoreError,
    ) -> CredVaultError {
        CredVaultError::Store {
            operation,
            service: self.service.clone(),
            key: key.unwrap_or("*").to_string(),
            message: err.to_string(),
        }
    }

    fn lost_update(&self, key: &str) -> CredVaultError {
        CredVaultError::LostUpdate {
            service: self.service.clone(),
            key: key.to_string(),
        }
    }
}
