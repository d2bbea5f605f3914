//! Account existence probes against target applications

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::store::StoreError;

/// Probe for accounts on a target application
pub trait AccountDirectory: Send + Sync {
    /// # Errors
    /// Returns error if the application cannot be contacted
    fn account_exists(&self, application: &str, native_identity: &str) -> Result<bool, StoreError>;
}

/// Directory backed by a fixed set of known accounts
#[derive(Debug, Default)]
pub struct StaticAccountDirectory {
    accounts: RwLock<HashSet<(String, String)>>,
}

impl StaticAccountDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(self, application: impl Into<String>, native_identity: impl Into<String>) -> Self {
        self.add(application, native_identity);
        self
    }

    pub fn add(&self, application: impl Into<String>, native_identity: impl Into<String>) {
        self.accounts
            .write()
            .insert((application.into(), native_identity.into()));
    }
}

impl AccountDirectory for StaticAccountDirectory {
    fn account_exists(&self, application: &str, native_identity: &str) -> Result<bool, StoreError> {
        Ok(self
            .accounts
            .read()
            .contains(&(application.to_string(), native_identity.to_string())))
    }
}
