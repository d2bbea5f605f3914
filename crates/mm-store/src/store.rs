//! Persistence contract consumed by the reconciler
//!
//! [`ObjectStore`] is object safe so transformers can hold a
//! `&dyn ObjectStore`; [`ObjectStoreExt`] layers typed lookups on top.

use mm_model::Value;

use crate::filter::Filter;
use crate::objects::{Application, Identity, Link, ObjectClass, StoredObject};

/// One projection row, columns in requested order
pub type Row = Vec<Value>;

/// Point-in-time access to governance objects
///
/// Projection columns may be qualified with a relation
/// (`capabilities.name`), producing one row per related object.
pub trait ObjectStore: Send + Sync {
    /// # Errors
    /// Returns error if the backend fails
    fn get_by_id(&self, class: ObjectClass, id: &str) -> Result<Option<StoredObject>, StoreError>;

    /// # Errors
    /// Returns error if the backend fails
    fn get_by_name(
        &self,
        class: ObjectClass,
        name: &str,
    ) -> Result<Option<StoredObject>, StoreError>;

    /// # Errors
    /// Returns error if the backend fails
    fn count(&self, class: ObjectClass, filter: &Filter) -> Result<usize, StoreError>;

    /// Projection query
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownRelation`] for an unsupported relation
    /// prefix, or any backend failure
    fn search(
        &self,
        class: ObjectClass,
        filter: &Filter,
        columns: &[&str],
    ) -> Result<Vec<Row>, StoreError>;

    /// Links owned by an identity, in insertion order
    ///
    /// # Errors
    /// Returns error if the backend fails
    fn links_for_identity(&self, identity_id: &str) -> Result<Vec<Link>, StoreError>;
}

/// Typed helpers over any [`ObjectStore`]
pub trait ObjectStoreExt: ObjectStore {
    /// # Errors
    /// Returns error if the backend fails or the object is not an identity
    fn identity_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        self.get_by_id(ObjectClass::Identity, id)?
            .map(StoredObject::into_identity)
            .transpose()
    }

    /// # Errors
    /// Returns error if the backend fails or the object is not an identity
    fn identity_by_name(&self, name: &str) -> Result<Option<Identity>, StoreError> {
        self.get_by_name(ObjectClass::Identity, name)?
            .map(StoredObject::into_identity)
            .transpose()
    }

    /// # Errors
    /// Returns error if the backend fails or the object is not a link
    fn link_by_id(&self, id: &str) -> Result<Option<Link>, StoreError> {
        self.get_by_id(ObjectClass::Link, id)?
            .map(StoredObject::into_link)
            .transpose()
    }

    /// # Errors
    /// Returns error if the backend fails or the object is not an application
    fn application_by_name(&self, name: &str) -> Result<Option<Application>, StoreError> {
        self.get_by_name(ObjectClass::Application, name)?
            .map(StoredObject::into_application)
            .transpose()
    }

    /// Single property of the object with `id`, narrowed by `extra`
    ///
    /// # Errors
    /// Returns error if the backend fails
    fn property_by_id(
        &self,
        class: ObjectClass,
        id: &str,
        property: &str,
        extra: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let filter = Filter::eq("id", id).and(extra.clone());
        let rows = self.search(class, &filter, &[property])?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .filter(|v| !v.is_null()))
    }
}

impl<T: ObjectStore + ?Sized> ObjectStoreExt for T {}

/// Errors raised by stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown object class: {0}")]
    UnknownClass(String),

    #[error("{class} has no relation '{relation}'")]
    UnknownRelation { class: ObjectClass, relation: String },

    #[error("expected {expected}, found {found}")]
    ClassMismatch {
        expected: ObjectClass,
        found: ObjectClass,
    },

    #[error("duplicate {class} id: {id}")]
    DuplicateId { class: ObjectClass, id: String },

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("store backend failed: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn mismatch(expected: ObjectClass, found: ObjectClass) -> Self {
        Self::ClassMismatch { expected, found }
    }

    /// Check if the failure may succeed when retried
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backend(_))
    }
}
