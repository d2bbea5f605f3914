//! Transformer registry
//!
//! Provides [`TransformerRegistry`] for looking up a transformer by the
//! kind of object it handles.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use mm_model::{ChangePlan, MapModel};
use mm_store::StoredObject;

use crate::context::Context;
use crate::error::Result;
use crate::identity::IdentityTransformer;
use crate::link::LinkTransformer;
use crate::options::TransformOptions;

/// Object kinds with a map model transformer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformerKind {
    Identity,
    Link,
}

impl TransformerKind {
    pub const ALL: [Self; 2] = [Self::Identity, Self::Link];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// No transformer is known under the given name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no transformer for '{0}'")]
pub struct UnknownTransformer(pub String);

impl FromStr for TransformerKind {
    type Err = UnknownTransformer;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTransformer(s.to_string()))
    }
}

/// A transformer of either kind
#[derive(Debug, Clone, Copy)]
pub enum Transformer<'a> {
    Identity(IdentityTransformer<'a>),
    Link(LinkTransformer<'a>),
}

impl Transformer<'_> {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TransformerKind {
        match self {
            Self::Identity(_) => TransformerKind::Identity,
            Self::Link(_) => TransformerKind::Link,
        }
    }

    /// # Errors
    /// Returns a store class mismatch when `object` is not of this kind,
    /// otherwise whatever the underlying transformer returns
    pub fn to_map(&self, object: StoredObject) -> Result<MapModel> {
        match self {
            Self::Identity(t) => t.to_map(&object.into_identity()?),
            Self::Link(t) => t.to_map(&object.into_link()?),
        }
    }

    /// # Errors
    /// Propagates the underlying transformer's failures
    pub fn refresh(&self, model: MapModel) -> Result<MapModel> {
        match self {
            Self::Identity(t) => t.refresh(model),
            Self::Link(t) => t.refresh(model),
        }
    }

    /// # Errors
    /// Propagates the underlying transformer's failures
    pub fn map_to_plan(&self, model: &MapModel) -> Result<Option<ChangePlan>> {
        match self {
            Self::Identity(t) => t.map_to_plan(model),
            Self::Link(t) => t.map_to_plan(model),
        }
    }
}

/// Builds a transformer over borrowed collaborators
pub type Constructor = for<'a> fn(Context<'a>, TransformOptions) -> Transformer<'a>;

fn identity_transformer(ctx: Context<'_>, options: TransformOptions) -> Transformer<'_> {
    Transformer::Identity(IdentityTransformer::new(ctx, options))
}

fn link_transformer(ctx: Context<'_>, options: TransformOptions) -> Transformer<'_> {
    Transformer::Link(LinkTransformer::new(ctx, options))
}

/// Registry of transformer constructors keyed by object kind
#[derive(Debug, Default, Clone)]
pub struct TransformerRegistry {
    constructors: HashMap<TransformerKind, Constructor>,
}

impl TransformerRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the identity and link transformers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TransformerKind::Identity, identity_transformer);
        registry.register(TransformerKind::Link, link_transformer);
        registry
    }

    /// Register a constructor, replacing any previous one for `kind`
    pub fn register(&mut self, kind: TransformerKind, constructor: Constructor) {
        self.constructors.insert(kind, constructor);
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, kind: TransformerKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    #[must_use]
    pub fn create<'a>(
        &self,
        kind: TransformerKind,
        ctx: Context<'a>,
        options: TransformOptions,
    ) -> Option<Transformer<'a>> {
        self.constructors.get(&kind).map(|build| build(ctx, options))
    }

    /// Look up a transformer by kind name
    ///
    /// # Errors
    /// Returns [`UnknownTransformer`] when the name parses to no registered
    /// kind
    pub fn create_by_name<'a>(
        &self,
        name: &str,
        ctx: Context<'a>,
        options: TransformOptions,
    ) -> std::result::Result<Transformer<'a>, UnknownTransformer> {
        let kind: TransformerKind = name.parse()?;
        self.create(kind, ctx, options)
            .ok_or_else(|| UnknownTransformer(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_model::ObjectConfig;
    use mm_store::{AesGcmEncryptor, Identity, InMemoryStore, Link};

    #[test]
    fn kind_parsing() {
        assert_eq!("Identity".parse::<TransformerKind>().unwrap(), TransformerKind::Identity);
        assert_eq!(" link ".parse::<TransformerKind>().unwrap(), TransformerKind::Link);
        assert_eq!(
            "bundle".parse::<TransformerKind>(),
            Err(UnknownTransformer("bundle".into()))
        );
    }

    #[test]
    fn registry_dispatch() {
        let store = InMemoryStore::new();
        let config = ObjectConfig::new("Identity");
        let encryptor = AesGcmEncryptor::generate();
        let ctx = Context::new(&store, &config, &encryptor);

        let registry = TransformerRegistry::with_defaults();
        assert!(registry.contains(TransformerKind::Link));
        let t = registry
            .create_by_name("identity", ctx, TransformOptions::new())
            .unwrap();
        assert_eq!(t.kind(), TransformerKind::Identity);

        let model = t.to_map(Identity::new("jdoe").into()).unwrap();
        assert_eq!(model.field_str("name"), Some("jdoe"));
        assert!(t.to_map(Link::new("LDAP", "x").into()).is_err());
    }

    #[test]
    fn empty_registry_creates_nothing() {
        let store = InMemoryStore::new();
        let config = ObjectConfig::new("Identity");
        let encryptor = AesGcmEncryptor::generate();
        let ctx = Context::new(&store, &config, &encryptor);
        let registry = TransformerRegistry::new();
        assert!(registry.create(TransformerKind::Identity, ctx, TransformOptions::new()).is_none());
        assert!(registry.create_by_name("link", ctx, TransformOptions::new()).is_err());
    }
}
