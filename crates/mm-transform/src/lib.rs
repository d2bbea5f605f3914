//! Map Model reconciler
//!
//! Turns stored identities and their account links into map models, and
//! edited map models back into change plans.
//!
//! # Core Concepts
//!
//! - [`IdentityTransformer`]: Identity models with reference lists, manager
//!   and config-driven attributes; recursion into link models
//! - [`LinkTransformer`]: Account models driven by the application's
//!   account schema, with lifecycle collapse and operation overrides
//! - [`Context`]: Store, identity config, encryptor and account directory
//!   borrowed for one call
//! - [`TransformOptions`]: Immutable expansion and validation switches
//! - [`TransformerRegistry`]: Transformers looked up by object kind
//!
//! # Example
//!
//! ```rust
//! use mm_model::ObjectConfig;
//! use mm_store::{AesGcmEncryptor, InMemoryStore};
//! use mm_transform::{Context, IdentityTransformer, TransformOptions};
//!
//! let store = InMemoryStore::new();
//! let config = ObjectConfig::new("Identity");
//! let encryptor = AesGcmEncryptor::generate();
//! let transformer = IdentityTransformer::new(
//!     Context::new(&store, &config, &encryptor),
//!     TransformOptions::new(),
//! );
//!
//! let mut model = mm_model::MapModel::new();
//! model.set_field("name", "jdoe");
//! let plan = transformer.map_to_plan(&model).unwrap().unwrap();
//! assert_eq!(plan.operations[0].kind, mm_model::OperationKind::Create);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod coerce;
mod config;
mod context;
mod diff;
mod error;
mod identity;
mod link;
mod options;
mod projection;
mod registry;

pub use coerce::{coerce, encrypt_secret, is_unique_id, resolve_names};
pub use config::{ConfigError, ReconcilerConfig};
pub use context::Context;
pub use diff::{changed, ListDelta};
pub use error::{CoercionError, ReconcileError, Result, SchemaError, ValidationError};
pub use identity::IdentityTransformer;
pub use link::LinkTransformer;
pub use options::TransformOptions;
pub use registry::{Constructor, Transformer, TransformerKind, TransformerRegistry, UnknownTransformer};
