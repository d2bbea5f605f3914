//! Reconciler configuration
//!
//! Loaded from YAML or JSON:
//!
//! ```yaml
//! options:
//!   expandIdentity: true
//! identityConfig:
//!   class: Identity
//!   attributes:
//!     - name: email
//!       editable: true
//! encryptionKey: 000102...1f
//! ```

use std::path::Path;

use mm_model::ObjectConfig;
use mm_store::{AesGcmEncryptor, CryptoError};
use serde::{Deserialize, Serialize};

use crate::options::TransformOptions;

/// Options, identity attribute configuration and secret key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcilerConfig {
    pub options: TransformOptions,
    pub identity_config: ObjectConfig,
    /// Hex AES-256 key; a random key is generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            options: TransformOptions::default(),
            identity_config: ObjectConfig::new("Identity"),
            encryption_key: None,
        }
    }
}

impl ReconcilerConfig {
    /// # Errors
    /// Returns error if YAML is invalid
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// # Errors
    /// Returns error if JSON is invalid
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, parsing `.json` as JSON and anything else as YAML
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_yaml_str(&text)?
        };
        tracing::info!(
            path = %path.display(),
            attributes = config.identity_config.attributes.len(),
            "loaded reconciler config"
        );
        Ok(config)
    }

    /// Build the secret encryptor
    ///
    /// # Errors
    /// Returns [`ConfigError::Key`] if the configured key is not 32 hex
    /// encoded bytes
    pub fn encryptor(&self) -> Result<AesGcmEncryptor, ConfigError> {
        match &self.encryption_key {
            Some(key) => Ok(AesGcmEncryptor::from_hex(key)?),
            None => {
                tracing::warn!("no encryption key configured, using a generated one");
                Ok(AesGcmEncryptor::generate())
            }
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid encryption key: {0}")]
    Key(#[from] CryptoError),
}
