//! Per-call transformer options

use serde::{Deserialize, Serialize};

/// Immutable options passed into every transformer call
///
/// `refresh` derives an expanded copy rather than mutating the caller's
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Populate the info namespace and `info.objectConfig`
    pub expand_identity: bool,
    /// Include account link models
    pub expand_links: bool,
    /// Probe the target application before creating an account
    pub check_account_exists: bool,
}

impl TransformOptions {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity and links expanded
    #[inline]
    #[must_use]
    pub fn expanded() -> Self {
        Self::new().with_expand_identity(true).with_expand_links(true)
    }

    #[inline]
    #[must_use]
    pub fn with_expand_identity(mut self, value: bool) -> Self {
        self.expand_identity = value;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_expand_links(mut self, value: bool) -> Self {
        self.expand_links = value;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_check_account_exists(mut self, value: bool) -> Self {
        self.check_account_exists = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_return_new_values() {
        let base = TransformOptions::new();
        let expanded = base.with_expand_identity(true);
        assert!(!base.expand_identity);
        assert!(expanded.expand_identity);
        assert!(!expanded.expand_links);
    }

    #[test]
    fn deserialises_camel_case_with_defaults() {
        let opts: TransformOptions = serde_json::from_str(r#"{"expandLinks":true}"#).unwrap();
        assert_eq!(opts, TransformOptions::new().with_expand_links(true));
    }
}
