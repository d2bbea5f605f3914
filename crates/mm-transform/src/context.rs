//! Collaborators a transformer works against

use mm_model::ObjectConfig;
use mm_store::{AccountDirectory, ObjectStore, SecretEncryptor};

/// Borrowed collaborators for one request
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub store: &'a dyn ObjectStore,
    /// Attribute configuration of the identity class
    pub identity_config: &'a ObjectConfig,
    pub encryptor: &'a dyn SecretEncryptor,
    /// Consulted before account creation when enabled
    pub accounts: Option<&'a dyn AccountDirectory>,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn ObjectStore,
        identity_config: &'a ObjectConfig,
        encryptor: &'a dyn SecretEncryptor,
    ) -> Self {
        Self {
            store,
            identity_config,
            encryptor,
            accounts: None,
        }
    }

    #[must_use]
    pub fn with_accounts(mut self, accounts: &'a dyn AccountDirectory) -> Self {
        self.accounts = Some(accounts);
        self
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("identity_config", &self.identity_config.class)
            .field("accounts", &self.accounts.is_some())
            .finish_non_exhaustive()
    }
}
