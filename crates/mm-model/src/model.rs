//! The map model record
//!
//! A [`MapModel`] splits what the string-keyed view mixes together into
//! explicit namespaces:
//!
//! - [`EditableFields`]: authoritative root values a client may change
//! - [`SystemFields`]: control values such as ids, lifecycle flags and
//!   operation overrides
//! - [`DerivedInfo`]: read-only details derived from root values
//! - children: nested models such as account links

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::ModelPath;
use crate::value::Value;

/// Root namespace of editable values
pub type EditableFields = BTreeMap<String, Value>;

/// Control values outside the editable namespace
pub type SystemFields = BTreeMap<String, Value>;

/// One derived record, e.g. `{id, name, displayName}`
pub type InfoRecord = BTreeMap<String, Value>;

/// Derived details for one root key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoEntry {
    List(Vec<InfoRecord>),
    Single(InfoRecord),
}

impl InfoEntry {
    /// The records of this entry, a single record counting as one
    #[must_use]
    pub fn records(&self) -> Vec<&InfoRecord> {
        match self {
            Self::List(records) => records.iter().collect(),
            Self::Single(record) => vec![record],
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::List(records) => {
                Value::List(records.iter().cloned().map(Value::Map).collect())
            }
            Self::Single(record) => Value::Map(record.clone()),
        }
    }

    fn same_as(&self, other: &Self) -> bool {
        self.to_value().same_as(&other.to_value())
    }
}

/// Read-only derived namespace keyed by the root key each entry mirrors
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivedInfo(BTreeMap<String, InfoEntry>);

impl DerivedInfo {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&InfoEntry> {
        self.0.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut InfoEntry> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: InfoEntry) {
        self.0.insert(key.into(), entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<InfoEntry> {
        self.0.remove(key)
    }

    /// Records listed under `key`, empty when absent
    #[must_use]
    pub fn list(&self, key: &str) -> Vec<InfoRecord> {
        self.0
            .get(key)
            .map(|entry| entry.records().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn same_as(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(k, v)| other.0.get(k).is_some_and(|o| v.same_as(o)))
    }
}

/// Add/remove values supplied through `add<Field>` / `remove<Field>` keys
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GranularEdit {
    pub add: Vec<Value>,
    pub remove: Vec<Value>,
}

/// Snapshot of one governance object as a map model
///
/// Serialises with root fields flattened at the top level and the `sys`,
/// `info` and `children` namespaces as nested objects (omitted when
/// empty).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapModel {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sys: SystemFields,

    #[serde(default, skip_serializing_if = "DerivedInfo::is_empty")]
    pub info: DerivedInfo,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Vec<MapModel>>,

    #[serde(flatten)]
    pub fields: EditableFields,
}

const GRANULAR_PREFIXES: [&str; 2] = ["add", "remove"];

impl MapModel {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root value for `name`, treating an explicit null as absent
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Root value as a string
    #[inline]
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Set a root value, dropping the key for null
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        match value.into() {
            Value::Null => {
                self.fields.remove(&name);
            }
            value => {
                self.fields.insert(name, value);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn sys(&self, name: &str) -> Option<&Value> {
        self.sys.get(name).filter(|v| !v.is_null())
    }

    #[inline]
    #[must_use]
    pub fn sys_str(&self, name: &str) -> Option<&str> {
        self.sys(name).and_then(Value::as_str)
    }

    /// Set a system value, dropping the key for null
    pub fn set_sys(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        match value.into() {
            Value::Null => {
                self.sys.remove(&name);
            }
            value => {
                self.sys.insert(name, value);
            }
        }
    }

    /// Nested models stored under `key`
    #[must_use]
    pub fn children(&self, key: &str) -> &[MapModel] {
        self.children.get(key).map_or(&[], Vec::as_slice)
    }

    /// Replace the nested models under `key`, removing it when empty
    pub fn set_children(&mut self, key: impl Into<String>, models: Vec<MapModel>) {
        let key = key.into();
        if models.is_empty() {
            self.children.remove(&key);
        } else {
            self.children.insert(key, models);
        }
    }

    /// Resolve a dotted path across the namespaces
    ///
    /// `sys.*` and `info.*` address their namespaces and anything else is a
    /// root field. Inside lists a numeric segment selects an element.
    #[must_use]
    pub fn get_path(&self, path: &ModelPath) -> Option<Value> {
        let head = path.first()?;
        let (value, rest) = match head {
            "sys" => {
                let rest = path.tail();
                (self.sys(rest.first()?)?.clone(), rest.tail())
            }
            "info" => {
                let rest = path.tail();
                (self.info.get(rest.first()?)?.to_value(), rest.tail())
            }
            "children" => {
                let rest = path.tail();
                let models = self.children.get(rest.first()?)?;
                let rest = rest.tail();
                let Some(index) = rest.first() else {
                    return Some(Value::List(
                        models.iter().map(MapModel::to_value).collect(),
                    ));
                };
                let model = models.get(index.parse::<usize>().ok()?)?;
                return model.get_path(&rest.tail());
            }
            field => (self.field(field)?.clone(), path.tail()),
        };
        descend(value, &rest)
    }

    /// Values supplied through the granular `add<Field>` / `remove<Field>` keys
    ///
    /// The capitalised form (`addRoles`) is read first; when it holds null the
    /// raw concatenation (`addroles`) is tried. Returns `None` unless at least
    /// one capitalised key is present, even if it is null.
    #[must_use]
    pub fn granular(&self, field: &str) -> Option<GranularEdit> {
        let mut found = false;
        let mut edit = GranularEdit::default();
        for op in GRANULAR_PREFIXES {
            let key = format!("{op}{}", capitalize(field));
            if !self.fields.contains_key(&key) {
                continue;
            }
            found = true;
            let value = self
                .field(&key)
                .or_else(|| self.field(&format!("{op}{field}")))
                .map(Value::as_list)
                .unwrap_or_default();
            if op == "add" {
                edit.add = value;
            } else {
                edit.remove = value;
            }
        }
        found.then_some(edit)
    }

    /// Deep comparison using [`Value::same_as`] in every namespace
    #[must_use]
    pub fn same_as(&self, other: &MapModel) -> bool {
        same_map(&self.fields, &other.fields)
            && same_map(&self.sys, &other.sys)
            && self.info.same_as(&other.info)
            && self.children.len() == other.children.len()
            && self.children.iter().all(|(k, models)| {
                other.children.get(k).is_some_and(|theirs| {
                    models.len() == theirs.len()
                        && models.iter().zip(theirs).all(|(a, b)| a.same_as(b))
                })
            })
    }

    /// The model as a single value, mirroring its JSON form
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        if !self.sys.is_empty() {
            map.insert("sys".into(), Value::Map(self.sys.clone()));
        }
        if !self.info.is_empty() {
            let info = self
                .info
                .0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect();
            map.insert("info".into(), Value::Map(info));
        }
        if !self.children.is_empty() {
            let children = self
                .children
                .iter()
                .map(|(k, models)| {
                    (
                        k.clone(),
                        Value::List(models.iter().map(MapModel::to_value).collect()),
                    )
                })
                .collect();
            map.insert("children".into(), Value::Map(children));
        }
        Value::Map(map)
    }
}

/// Explicit nulls count as absent on either side
fn same_map(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> bool {
    let present = |m: &BTreeMap<String, Value>| m.values().filter(|v| !v.is_null()).count();
    present(a) == present(b)
        && a.iter()
            .filter(|(_, v)| !v.is_null())
            .all(|(k, v)| b.get(k).is_some_and(|other| v.same_as(other)))
}

fn descend(value: Value, rest: &ModelPath) -> Option<Value> {
    let Some(segment) = rest.first() else {
        return Some(value);
    };
    let next = match value {
        Value::Map(mut map) => map.remove(segment)?,
        Value::List(mut items) => {
            let index = segment.parse::<usize>().ok()?;
            if index >= items.len() {
                return None;
            }
            items.swap_remove(index)
        }
        _ => return None,
    };
    descend(next, &rest.tail())
}

/// Upper-case the first character
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
