//! In-memory object store with JSON snapshots

use std::path::Path;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::Filter;
use crate::objects::{
    Application, Bundle, Capability, Identity, Link, ObjectClass, Scope, StoredObject,
};
use crate::store::{ObjectStore, Row, StoreError};

/// Serialisable contents of a store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub identities: Vec<Identity>,
    pub links: Vec<Link>,
    pub applications: Vec<Application>,
    pub bundles: Vec<Bundle>,
    pub capabilities: Vec<Capability>,
    pub scopes: Vec<Scope>,
}

type Table = IndexMap<String, StoredObject>;

/// Thread-safe store over per-class tables keyed by id
///
/// Objects inserted without an id get a fresh 32 character hex id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<IndexMap<ObjectClass, Table>>,
}

impl InMemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh object id in unique-id syntax
    #[must_use]
    pub fn generate_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Insert an object, returning its id
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateId`] if the id is already taken
    pub fn insert(&self, object: impl Into<StoredObject>) -> Result<String, StoreError> {
        let mut object = object.into();
        let id = match object.id() {
            Some(id) => id.to_string(),
            None => {
                let id = Self::generate_id();
                object.set_id(id.clone());
                id
            }
        };
        let class = object.class();
        let mut tables = self.tables.write();
        let table = tables.entry(class).or_default();
        if table.contains_key(&id) {
            return Err(StoreError::DuplicateId { class, id });
        }
        tracing::debug!(%class, %id, "inserted object");
        table.insert(id.clone(), object);
        Ok(id)
    }

    /// Replace an existing object or insert a new one
    ///
    /// # Errors
    /// Returns error if the object has no id and insertion fails
    pub fn put(&self, object: impl Into<StoredObject>) -> Result<String, StoreError> {
        let object = object.into();
        let Some(id) = object.id().map(ToString::to_string) else {
            return self.insert(object);
        };
        self.tables
            .write()
            .entry(object.class())
            .or_default()
            .insert(id.clone(), object);
        Ok(id)
    }

    #[must_use]
    pub fn len(&self, class: ObjectClass) -> usize {
        self.tables.read().get(&class).map_or(0, IndexMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().values().all(IndexMap::is_empty)
    }

    /// Build a store from snapshot contents
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateId`] if two objects share an id
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        for o in snapshot.applications {
            store.insert(o)?;
        }
        for o in snapshot.bundles {
            store.insert(o)?;
        }
        for o in snapshot.capabilities {
            store.insert(o)?;
        }
        for o in snapshot.scopes {
            store.insert(o)?;
        }
        for o in snapshot.identities {
            store.insert(o)?;
        }
        for o in snapshot.links {
            store.insert(o)?;
        }
        Ok(store)
    }

    /// Current contents as a snapshot
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read();
        let mut snapshot = Snapshot::default();
        for object in tables.values().flat_map(IndexMap::values) {
            match object.clone() {
                StoredObject::Identity(o) => snapshot.identities.push(o),
                StoredObject::Link(o) => snapshot.links.push(o),
                StoredObject::Application(o) => snapshot.applications.push(o),
                StoredObject::Bundle(o) => snapshot.bundles.push(o),
                StoredObject::Capability(o) => snapshot.capabilities.push(o),
                StoredObject::Scope(o) => snapshot.scopes.push(o),
            }
        }
        snapshot
    }

    /// Load a JSON snapshot file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        tracing::info!(
            path = %path.display(),
            identities = snapshot.identities.len(),
            links = snapshot.links.len(),
            "loaded snapshot"
        );
        Self::from_snapshot(snapshot)
    }

    /// Write the contents as a JSON snapshot file
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn lookup<'a>(
    tables: &'a IndexMap<ObjectClass, Table>,
    class: ObjectClass,
    id: &str,
) -> Option<&'a StoredObject> {
    tables.get(&class).and_then(|t| t.get(id))
}

fn objects(
    tables: &IndexMap<ObjectClass, Table>,
    class: ObjectClass,
) -> impl Iterator<Item = &StoredObject> {
    tables.get(&class).into_iter().flat_map(IndexMap::values)
}

impl ObjectStore for InMemoryStore {
    fn get_by_id(&self, class: ObjectClass, id: &str) -> Result<Option<StoredObject>, StoreError> {
        Ok(lookup(&self.tables.read(), class, id).cloned())
    }

    fn get_by_name(
        &self,
        class: ObjectClass,
        name: &str,
    ) -> Result<Option<StoredObject>, StoreError> {
        let tables = self.tables.read();
        let found = objects(&tables, class).find(|o| o.name() == Some(name)).cloned();
        Ok(found)
    }

    fn count(&self, class: ObjectClass, filter: &Filter) -> Result<usize, StoreError> {
        let tables = self.tables.read();
        let count = objects(&tables, class).filter(|o| filter.matches(o)).count();
        Ok(count)
    }

    fn search(
        &self,
        class: ObjectClass,
        filter: &Filter,
        columns: &[&str],
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read();
        let relation = columns
            .iter()
            .find_map(|c| c.split_once('.').map(|(rel, _)| rel));

        let mut rows = Vec::new();
        for object in objects(&tables, class).filter(|o| filter.matches(o)) {
            let Some(relation) = relation else {
                rows.push(columns.iter().map(|c| object.property(c)).collect());
                continue;
            };
            let (related_class, ids) =
                object
                    .relation(relation)
                    .ok_or_else(|| StoreError::UnknownRelation {
                        class,
                        relation: relation.to_string(),
                    })?;
            for id in ids {
                let Some(related) = lookup(&tables, related_class, &id) else {
                    tracing::debug!(%related_class, %id, "dangling reference skipped");
                    continue;
                };
                rows.push(
                    columns
                        .iter()
                        .map(|c| match c.split_once('.') {
                            Some((rel, column)) if rel == relation => related.property(column),
                            _ => object.property(c),
                        })
                        .collect(),
                );
            }
        }
        Ok(rows)
    }

    fn links_for_identity(&self, identity_id: &str) -> Result<Vec<Link>, StoreError> {
        let tables = self.tables.read();
        let links: Vec<Link> = objects(&tables, ObjectClass::Link)
            .filter_map(|o| match o {
                StoredObject::Link(link) if link.identity.as_deref() == Some(identity_id) => {
                    Some(link.clone())
                }
                _ => None,
            })
            .collect();
        Ok(links)
    }
}
