//! Map Model types
//!
//! Typed map models for governance objects and the change requests an edited
//! model reconciles into.
//!
//! # Core Concepts
//!
//! - [`Value`]: Tagged value every model field is built from
//! - [`MapModel`]: Editable fields, system fields, derived info and children
//! - [`ModelPath`]: Dotted addressing into a model (`info.manager.id`)
//! - [`ChangePlan`]: Operations and attribute requests produced by a diff
//! - [`ObjectConfig`] / [`AccountSchema`]: Metadata driving both directions
//!
//! # Example
//!
//! ```rust
//! use mm_model::{MapModel, ModelPath, Value};
//!
//! let mut model = MapModel::new();
//! model.set_field("name", "jdoe");
//! model.set_field("capabilities", Value::strings(["HelpDesk"]));
//!
//! let path: ModelPath = "capabilities.0".parse().unwrap();
//! assert_eq!(model.get_path(&path), Some(Value::from("HelpDesk")));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod change;
mod model;
mod path;
mod schema;
mod value;

pub use change::{
    AttributeChangeRequest, AttributeOp, ChangeError, ChangeOperation, ChangePlan, OperationKind,
    APP_IIQ,
};
pub use model::{
    capitalize, DerivedInfo, EditableFields, GranularEdit, InfoEntry, InfoRecord, MapModel,
    SystemFields,
};
pub use path::{ModelPath, PathError};
pub use schema::{
    AccountSchema, AttributeDefinition, AttributeType, EditMode, ObjectAttribute, ObjectConfig,
    ATT_IIQ_DISABLED, ATT_IIQ_LOCKED, SECRET_ATTRIBUTE_NAMES,
};
pub use value::Value;
