//! In-memory secure store.
//!
//! Implements the full native signal contract (duplicate adds, not-found
//! misses, attribute-only queries) over a mutex-guarded map, so the
//! backend can be exercised without a platform keychain.  Tests use the
//! fault-injection hook to trigger specific native failures, including
//! the duplicate-then-gone race inside the upsert protocol.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use zeroize::Zeroize;

use crate::policy::AccessPolicy;

use super::{
    AuthContext, MatchLimit, NewRecord, Patch, Query, Record, SecureStore, StoreError, StoreResult,
};

/// Native verb a fault is armed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Query,
    Add,
    Update,
    Delete,
}

/// What the store holds for one `(service, account)` pair.
///
/// Exposed through [`MemoryStore::stored`] so tests can assert on the
/// applied access policy and sync marker without another query.
#[derive(Clone)]
pub struct StoredEntry {
    pub data: Vec<u8>,
    pub label: String,
    pub description: String,
    pub access: AccessPolicy,
    pub synchronizable: bool,
    pub modified_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<(String, String), StoredEntry>,
    /// Single-shot faults, consumed by the next call of the matching verb.
    faults: HashMap<Verb, StoreError>,
    /// Total native calls issued, including faulted ones.
    calls: u64,
    /// Authentication context seen on the most recent query.
    last_auth: Option<AuthContext>,
}

/// A `SecureStore` living entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot fault: the next call of `verb` fails with `error`
    /// instead of touching the map.
    pub fn fail_next(&self, verb: Verb, error: StoreError) {
        self.lock().faults.insert(verb, error);
    }

    /// Number of native calls issued so far (faulted calls included).
    pub fn calls(&self) -> u64 {
        self.lock().calls
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// The authentication context attached to the most recent query, if
    /// any.
    pub fn last_auth(&self) -> Option<AuthContext> {
        self.lock().last_auth.clone()
    }

    /// Snapshot of one stored record, including the applied policy and
    /// sync marker.
    pub fn stored(&self, service: &str, account: &str) -> Option<StoredEntry> {
        self.lock()
            .entries
            .get(&(service.to_string(), account.to_string()))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(inner: &mut Inner, verb: Verb) -> StoreResult<()> {
        inner.calls += 1;
        if let Some(err) = inner.faults.remove(&verb) {
            return Err(err);
        }
        Ok(())
    }
}

impl SecureStore for MemoryStore {
    fn query(&self, query: &Query<'_>) -> StoreResult<Vec<Record>> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Verb::Query)?;
        inner.last_auth = query.auth.cloned();

        let to_record = |account: &str, entry: &StoredEntry| Record {
            account: account.to_string(),
            label: entry.label.clone(),
            description: entry.description.clone(),
            data: query.return_data.then(|| entry.data.clone()),
            modified_at: entry.modified_at,
        };

        match query.account {
            // Account-scoped lookup: a miss is a native not-found signal.
            Some(account) => {
                let key = (query.service.to_string(), account.to_string());
                match inner.entries.get(&key) {
                    Some(entry) => Ok(vec![to_record(account, entry)]),
                    None => Err(StoreError::NotFound),
                }
            }
            // Service-wide listing: an empty service is an empty result,
            // in map iteration order (order is not guaranteed stable).
            None => {
                let mut results: Vec<Record> = inner
                    .entries
                    .iter()
                    .filter(|((service, _), _)| service == query.service)
                    .map(|((_, account), entry)| to_record(account, entry))
                    .collect();
                if query.match_limit == MatchLimit::One {
                    results.truncate(1);
                }
                Ok(results)
            }
        }
    }

    fn add(&self, record: &NewRecord<'_>) -> StoreResult<()> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Verb::Add)?;

        let key = (record.service.to_string(), record.account.to_string());
        if inner.entries.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        inner.entries.insert(
            key,
            StoredEntry {
                data: record.data.to_vec(),
                label: record.label.to_string(),
                description: record.description.to_string(),
                access: *record.access,
                synchronizable: record.synchronizable,
                modified_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn update(&self, target: &Query<'_>, patch: &Patch<'_>) -> StoreResult<()> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Verb::Update)?;

        let account = target
            .account
            .ok_or_else(|| StoreError::Other("update requires an account".into()))?;
        let key = (target.service.to_string(), account.to_string());
        let entry = inner.entries.get_mut(&key).ok_or(StoreError::NotFound)?;

        if let Some(data) = patch.data {
            entry.data.zeroize();
            entry.data = data.to_vec();
        }
        entry.modified_at = Utc::now();
        Ok(())
    }

    fn delete(&self, target: &Query<'_>) -> StoreResult<()> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Verb::Delete)?;

        match target.account {
            Some(account) => {
                let key = (target.service.to_string(), account.to_string());
                let mut entry = inner.entries.remove(&key).ok_or(StoreError::NotFound)?;
                entry.data.zeroize();
                Ok(())
            }
            None => {
                let service = target.service;
                let doomed: Vec<_> = inner
                    .entries
                    .keys()
                    .filter(|(s, _)| s == service)
                    .cloned()
                    .collect();
                if doomed.is_empty() {
                    return Err(StoreError::NotFound);
                }
                for key in doomed {
                    if let Some(mut entry) = inner.entries.remove(&key) {
                        entry.data.zeroize();
                    }
                }
                Ok(())
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
