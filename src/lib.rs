//! CredVault: policy-driven secure credential storage.
//!
//! CredVault persists named secrets ("items") into a platform-protected
//! store and retrieves them under an access-control policy.  It sits
//! between a generic credential abstraction and a platform secure-storage
//! primitive that only offers coarse, enumerated protection levels:
//!
//! - `policy` translates declarative configuration (factor names, a
//!   protection-constraint name, a biometric-reuse duration) into the
//!   native access-control descriptor.
//! - `store` defines the contract the platform primitive must satisfy
//!   (query/add/update/delete over attribute-tagged records) and ships an
//!   in-memory implementation with fault injection for tests.
//! - `backend` realizes the item lifecycle (get, get-metadata, set/upsert,
//!   remove, list-keys) against any store, including the add-then-update
//!   upsert protocol and error normalization.
//!
//! The surrounding application owns backend selection, CLI, config-file
//! discovery, and logging setup; this crate only emits `tracing` events.

pub mod backend;
pub mod config;
pub mod errors;
pub mod policy;
pub mod store;

// Re-export the most commonly used items.
pub use backend::{CredentialBackend, Item, Metadata};
pub use config::BackendConfig;
pub use errors::{CredVaultError, Result};
pub use policy::{AccessControlFlags, AccessPolicy, ProtectionConstraint};
