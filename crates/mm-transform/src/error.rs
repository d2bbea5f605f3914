//! Error types for map model reconciliation
//!
//! - Validation: the edited model cannot be accepted (missing or duplicate
//!   name, account already present)
//! - Schema: required metadata is missing
//! - Coercion: a value cannot take its declared type
//! - Store and crypto failures are propagated unchanged

use mm_store::{CryptoError, StoreError};

/// Main reconciler error type
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("coercion failed: {0}")]
    Coercion(#[from] CoercionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("encryption failed: {0}")]
    Crypto(#[from] CryptoError),
}

impl ReconcileError {
    /// Check if the caller supplied an unacceptable model
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the failure may succeed when retried
    ///
    /// Only store failures can be transient; nothing here retries them.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

/// Rejected edited models
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identity name was not found in the map model")]
    MissingName,

    #[error("user '{name}' already exists")]
    DuplicateName { name: String },

    #[error("existing account '{native_identity}' already found on application '{application}'")]
    AccountExists {
        application: String,
        native_identity: String,
    },
}

/// Missing metadata
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("could not find account schema for application '{application}'")]
    MissingAccountSchema { application: String },

    #[error("unknown application '{name}'")]
    UnknownApplication { name: String },

    #[error("link model names no application")]
    MissingApplication,
}

/// Values that cannot take their declared type
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("unable to coerce [{attribute}] to a date: value must be epoch milliseconds or a date, not a string")]
    AmbiguousDate { attribute: String },

    #[error("unable to coerce [{attribute}] to a date: found {found}")]
    InvalidDate { attribute: String, found: String },

    #[error("unable to encrypt [{attribute}]: a secret must be a string, number or boolean")]
    InvalidSecret { attribute: String },
}

/// Result alias for reconciler operations
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
