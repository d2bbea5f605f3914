//! Governance object store
//!
//! The persistence side of map model reconciliation.
//!
//! # Core Concepts
//!
//! - [`ObjectStore`]: Fetch, count and projection search over object classes
//! - [`InMemoryStore`]: `IndexMap` tables behind a `parking_lot::RwLock`,
//!   loaded from and saved to JSON [`Snapshot`]s
//! - [`SecretEncryptor`]: Opaque encryption of secret values
//! - [`AccountDirectory`]: Existence probe for accounts on applications

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod accounts;
mod crypto;
mod filter;
mod memory;
mod objects;
mod store;

pub use accounts::{AccountDirectory, StaticAccountDirectory};
pub use crypto::{AesGcmEncryptor, CryptoError, SecretEncryptor, KEY_LENGTH, NONCE_LENGTH};
pub use filter::Filter;
pub use memory::{InMemoryStore, Snapshot};
pub use objects::{
    Application, Bundle, Capability, Identity, Link, ObjectClass, RoleAssignment, Scope,
    StoredObject, WorkgroupNotificationOption, FEATURE_NO_RANDOM_ACCESS,
};
pub use store::{ObjectStore, ObjectStoreExt, Row, StoreError};
