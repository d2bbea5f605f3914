//! Projection of identity reference lists into root and info namespaces
//!
//! Each reference list has a root field holding identifiers and an info
//! list holding one record per referenced object. Building a model reads
//! both through the identity's relation; refreshing a model only fetches
//! the identifiers that the info list does not know yet.

use mm_model::{InfoEntry, InfoRecord, MapModel, Value};
use mm_store::{Filter, ObjectClass, Row};

use crate::error::Result;
use crate::context::Context;

/// Shape of one identity reference list
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListField {
    /// Root and info key
    pub(crate) field: &'static str,
    /// Relation name on the identity
    pub(crate) relation: &'static str,
    pub(crate) target: ObjectClass,
    /// Properties of the target; the first one is the identifier
    pub(crate) properties: &'static [&'static str],
    /// Info record keys, parallel to `properties`
    pub(crate) keys: &'static [&'static str],
}

impl ListField {
    #[inline]
    pub(crate) fn identifier(&self) -> &'static str {
        self.properties[0]
    }

    #[inline]
    pub(crate) fn identifier_key(&self) -> &'static str {
        self.keys[0]
    }

    /// Relation-qualified columns for a query on the identity
    pub(crate) fn relation_columns(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|p| format!("{}.{p}", self.relation))
            .collect()
    }
}

pub(crate) const CAPABILITIES: ListField = ListField {
    field: "capabilities",
    relation: "capabilities",
    target: ObjectClass::Capability,
    properties: &["name", "id", "displayName", "description"],
    keys: &["name", "id", "displayName", "description"],
};

pub(crate) const DETECTED_ROLES: ListField = ListField {
    field: "detectedRoles",
    relation: "bundles",
    target: ObjectClass::Bundle,
    properties: &["name", "id", "displayableName"],
    keys: &["name", "id", "displayName"],
};

pub(crate) const ASSIGNED_ROLES: ListField = ListField {
    field: "assignedRoles",
    relation: "assignedRoles",
    target: ObjectClass::Bundle,
    properties: &["name", "id"],
    keys: &["name", "id"],
};

pub(crate) const WORKGROUPS: ListField = ListField {
    field: "workgroups",
    relation: "workgroups",
    target: ObjectClass::Identity,
    properties: &["name", "id", "displayName", "notificationOption"],
    keys: &["name", "id", "displayName", "notificationOption"],
};

/// Scope names are not unique, so scopes are listed by id
pub(crate) const CONTROLLED_SCOPES: ListField = ListField {
    field: "controlledScopes",
    relation: "controlledScopes",
    target: ObjectClass::Scope,
    properties: &["id", "name", "displayName"],
    keys: &["id", "name", "displayName"],
};

/// Lists refreshed from their info records, in refresh order
pub(crate) const REFRESHED: [ListField; 5] = [
    CAPABILITIES,
    ASSIGNED_ROLES,
    DETECTED_ROLES,
    WORKGROUPS,
    CONTROLLED_SCOPES,
];

/// Merge projection rows into the model
///
/// Row identifiers are appended to the root list when missing. With
/// `expand`, each row also becomes an info record (null columns omitted)
/// appended to the info list.
pub(crate) fn apply_rows(model: &mut MapModel, list: &ListField, rows: Vec<Row>, expand: bool) {
    let mut identifiers = Vec::new();
    let mut records = Vec::new();
    for row in rows {
        let Some(identifier) = row.first().and_then(Value::as_str).map(ToString::to_string)
        else {
            continue;
        };
        identifiers.push(identifier);
        if expand {
            let record: InfoRecord = list
                .keys
                .iter()
                .zip(row)
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| ((*k).to_string(), v))
                .collect();
            if !record.is_empty() {
                records.push(record);
            }
        }
    }

    if identifiers.is_empty() {
        return;
    }
    let mut existing = model
        .field(list.field)
        .map(Value::string_items)
        .unwrap_or_default();
    for identifier in identifiers {
        if !existing.contains(&identifier) {
            existing.push(identifier);
        }
    }
    model.set_field(list.field, Value::strings(existing));

    if expand && !records.is_empty() {
        let mut info = model.info.list(list.field);
        info.extend(records);
        model.info.insert(list.field, InfoEntry::List(info));
    }
}

/// Fill a reference list for a stored identity
///
/// # Errors
/// Propagates store failures
pub(crate) fn project_identity(
    ctx: &Context<'_>,
    model: &mut MapModel,
    identity_id: &str,
    list: &ListField,
    expand: bool,
) -> Result<()> {
    let columns = list.relation_columns();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    let rows = ctx
        .store
        .search(ObjectClass::Identity, &Filter::eq("id", identity_id), &columns)?;
    apply_rows(model, list, rows, expand);
    Ok(())
}

/// Reconcile the info list of `list` with its edited root list
///
/// Info records whose identifier left the root list are dropped (the info
/// key goes when nothing remains). Identifiers new to the root list are
/// fetched with a single query and appended.
///
/// # Errors
/// Propagates store failures
pub(crate) fn refresh_list(ctx: &Context<'_>, model: &mut MapModel, list: &ListField) -> Result<()> {
    let root = model
        .field(list.field)
        .map(Value::string_items)
        .unwrap_or_default();
    let mut info = model.info.list(list.field);
    let known: Vec<String> = info
        .iter()
        .filter_map(|r| r.get(list.identifier_key()).and_then(Value::as_str))
        .map(ToString::to_string)
        .collect();

    tracing::debug!(field = list.field, ?known, ?root, "differencing info against root");

    let removed: Vec<&String> = known.iter().filter(|k| !root.contains(k)).collect();
    if !removed.is_empty() {
        tracing::debug!(field = list.field, ?removed, "removing info records");
        info.retain(|r| {
            r.get(list.identifier_key())
                .and_then(Value::as_str)
                .map_or(true, |id| !removed.iter().any(|k| k.as_str() == id))
        });
        if info.is_empty() {
            model.info.remove(list.field);
        } else {
            model.info.insert(list.field, InfoEntry::List(info));
        }
    }

    let mut added: Vec<String> = Vec::new();
    for identifier in root {
        if !known.contains(&identifier) && !added.contains(&identifier) {
            added.push(identifier);
        }
    }
    if added.is_empty() {
        return Ok(());
    }

    tracing::info!(field = list.field, ?added, "fetching new info records");
    let rows = ctx.store.search(
        list.target,
        &Filter::in_list(list.identifier(), added),
        list.properties,
    )?;
    apply_rows(model, list, rows, true);
    Ok(())
}
