//! Persisted governance objects
//!
//! Objects reference each other by id. Projection queries address them
//! through [`StoredObject::property`] and [`StoredObject::relation`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mm_model::{AccountSchema, Value};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Application feature that forbids probing single accounts
pub const FEATURE_NO_RANDOM_ACCESS: &str = "NO_RANDOM_ACCESS";

/// Classes the store can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    Identity,
    Link,
    Application,
    Bundle,
    Capability,
    Scope,
}

impl ObjectClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "Identity",
            Self::Link => "Link",
            Self::Application => "Application",
            Self::Bundle => "Bundle",
            Self::Capability => "Capability",
            Self::Scope => "Scope",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectClass {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "link" => Ok(Self::Link),
            "application" => Ok(Self::Application),
            "bundle" => Ok(Self::Bundle),
            "capability" => Ok(Self::Capability),
            "scope" => Ok(Self::Scope),
            _ => Err(StoreError::UnknownClass(s.to_string())),
        }
    }
}

/// How a workgroup notifies its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkgroupNotificationOption {
    Disabled,
    GroupEmail,
    MembersOnly,
    Both,
}

impl WorkgroupNotificationOption {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::GroupEmail => "GroupEmail",
            Self::MembersOnly => "MembersOnly",
            Self::Both => "Both",
        }
    }
}

/// Assignment of a role to an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub role_id: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigner: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub negative: bool,
}

impl RoleAssignment {
    #[must_use]
    pub fn new(role_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            start_date: None,
            end_date: None,
            assigner: None,
            source: None,
            date: None,
            negative: false,
        }
    }
}

/// A governed person or workgroup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub correlated: bool,
    pub protected: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub manager_status: bool,
    pub correlated_overridden: bool,
    pub password_expiration: Option<DateTime<Utc>>,
    pub workgroup: bool,
    /// Id of the assigned scope
    pub assigned_scope: Option<String>,
    pub controls_assigned_scope: Option<bool>,
    /// Id of the manager identity
    pub manager: Option<String>,
    pub notification_option: Option<WorkgroupNotificationOption>,
    /// Extended attributes; identity references hold the referenced id
    pub attributes: BTreeMap<String, Value>,
    /// Capability ids
    pub capabilities: Vec<String>,
    /// Detected role ids
    pub bundles: Vec<String>,
    pub role_assignments: Vec<RoleAssignment>,
    /// Workgroup identity ids
    pub workgroups: Vec<String>,
    /// Controlled scope ids
    pub controlled_scopes: Vec<String>,
}

impl Identity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// Ids of the assigned roles, in assignment order
    #[must_use]
    pub fn assigned_role_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for ra in &self.role_assignments {
            if !ids.contains(&ra.role_id.as_str()) {
                ids.push(&ra.role_id);
            }
        }
        ids
    }

    /// First assignment of a role
    #[must_use]
    pub fn role_assignment(&self, role_id: &str) -> Option<&RoleAssignment> {
        self.role_assignments.iter().find(|ra| ra.role_id == role_id)
    }
}

/// An account on an application, owned by an identity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    pub id: Option<String>,
    /// Owning identity id
    pub identity: Option<String>,
    /// Application name
    pub application: String,
    pub native_identity: Option<String>,
    pub instance: Option<String>,
    pub display_name: Option<String>,
    pub disabled: bool,
    pub locked: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    pub uuid: Option<String>,
    pub entitlements: bool,
    pub attributes: BTreeMap<String, Value>,
}

impl Link {
    #[must_use]
    pub fn new(application: impl Into<String>, native_identity: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            native_identity: Some(native_identity.into()),
            ..Self::default()
        }
    }
}

/// A connected system accounts live on
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Application {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: Option<String>,
    pub connector: Option<String>,
    pub features: Vec<String>,
    /// Owner identity name
    pub owner: Option<String>,
    pub account_schema: Option<AccountSchema>,
}

impl Application {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn supports_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(feature))
    }
}

/// A role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bundle {
    pub id: Option<String>,
    pub name: String,
    pub displayable_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capability {
    pub id: Option<String>,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// Authorization scope; names are not unique
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scope {
    pub id: Option<String>,
    pub name: String,
    pub display_name: Option<String>,
}

/// Any object the store holds
#[derive(Debug, Clone, PartialEq)]
pub enum StoredObject {
    Identity(Identity),
    Link(Link),
    Application(Application),
    Bundle(Bundle),
    Capability(Capability),
    Scope(Scope),
}

fn opt(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.clone()))
}

fn date(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, Value::Date)
}

impl StoredObject {
    #[must_use]
    pub fn class(&self) -> ObjectClass {
        match self {
            Self::Identity(_) => ObjectClass::Identity,
            Self::Link(_) => ObjectClass::Link,
            Self::Application(_) => ObjectClass::Application,
            Self::Bundle(_) => ObjectClass::Bundle,
            Self::Capability(_) => ObjectClass::Capability,
            Self::Scope(_) => ObjectClass::Scope,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Identity(o) => o.id.as_deref(),
            Self::Link(o) => o.id.as_deref(),
            Self::Application(o) => o.id.as_deref(),
            Self::Bundle(o) => o.id.as_deref(),
            Self::Capability(o) => o.id.as_deref(),
            Self::Scope(o) => o.id.as_deref(),
        }
    }

    /// Object name; links are named by their native identity
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Identity(o) => o.name.as_deref(),
            Self::Link(o) => o.native_identity.as_deref(),
            Self::Application(o) => Some(&o.name),
            Self::Bundle(o) => Some(&o.name),
            Self::Capability(o) => Some(&o.name),
            Self::Scope(o) => Some(&o.name),
        }
    }

    pub(crate) fn set_id(&mut self, id: String) {
        let slot = match self {
            Self::Identity(o) => &mut o.id,
            Self::Link(o) => &mut o.id,
            Self::Application(o) => &mut o.id,
            Self::Bundle(o) => &mut o.id,
            Self::Capability(o) => &mut o.id,
            Self::Scope(o) => &mut o.id,
        };
        *slot = Some(id);
    }

    /// Scalar property by column name, null when unknown or unset
    #[must_use]
    pub fn property(&self, column: &str) -> Value {
        match (self, column) {
            (_, "id") => self.id().map_or(Value::Null, Value::from),
            (_, "name") => self.name().map_or(Value::Null, Value::from),
            (Self::Identity(o), _) => identity_property(o, column),
            (Self::Link(o), _) => match column {
                "identity" => opt(o.identity.as_ref()),
                "application" => Value::from(o.application.as_str()),
                "nativeIdentity" => opt(o.native_identity.as_ref()),
                "instance" => opt(o.instance.as_ref()),
                "displayName" => opt(o.display_name.as_ref()),
                "disabled" => Value::Bool(o.disabled),
                "locked" => Value::Bool(o.locked),
                "uuid" => opt(o.uuid.as_ref()),
                other => o.attributes.get(other).cloned().unwrap_or_default(),
            },
            (Self::Application(o), "type") => opt(o.app_type.as_ref()),
            (Self::Application(o), "connector") => opt(o.connector.as_ref()),
            (Self::Application(o), "owner") => opt(o.owner.as_ref()),
            (Self::Application(o), "features") => Value::strings(o.features.iter().cloned()),
            (Self::Bundle(o), "displayableName") => opt(o.displayable_name.as_ref()),
            (Self::Capability(o), "displayName") => opt(o.display_name.as_ref()),
            (Self::Capability(o), "description") => opt(o.description.as_ref()),
            (Self::Scope(o), "displayName") => opt(o.display_name.as_ref()),
            _ => Value::Null,
        }
    }

    /// Related object ids for a relation column prefix
    ///
    /// Only identities carry relations.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<(ObjectClass, Vec<String>)> {
        let Self::Identity(o) = self else {
            return None;
        };
        match name {
            "capabilities" => Some((ObjectClass::Capability, o.capabilities.clone())),
            "bundles" => Some((ObjectClass::Bundle, o.bundles.clone())),
            "assignedRoles" => Some((
                ObjectClass::Bundle,
                o.assigned_role_ids().into_iter().map(String::from).collect(),
            )),
            "workgroups" => Some((ObjectClass::Identity, o.workgroups.clone())),
            "controlledScopes" => Some((ObjectClass::Scope, o.controlled_scopes.clone())),
            _ => None,
        }
    }

    /// Typed access
    ///
    /// # Errors
    /// Returns [`StoreError::ClassMismatch`] for any other class
    pub fn into_identity(self) -> Result<Identity, StoreError> {
        match self {
            Self::Identity(o) => Ok(o),
            other => Err(StoreError::mismatch(ObjectClass::Identity, other.class())),
        }
    }

    /// # Errors
    /// Returns [`StoreError::ClassMismatch`] for any other class
    pub fn into_link(self) -> Result<Link, StoreError> {
        match self {
            Self::Link(o) => Ok(o),
            other => Err(StoreError::mismatch(ObjectClass::Link, other.class())),
        }
    }

    /// # Errors
    /// Returns [`StoreError::ClassMismatch`] for any other class
    pub fn into_application(self) -> Result<Application, StoreError> {
        match self {
            Self::Application(o) => Ok(o),
            other => Err(StoreError::mismatch(ObjectClass::Application, other.class())),
        }
    }
}

fn identity_property(o: &Identity, column: &str) -> Value {
    match column {
        "displayName" => opt(o.display_name.as_ref()),
        "firstname" => opt(o.firstname.as_ref()),
        "lastname" => opt(o.lastname.as_ref()),
        "correlated" => Value::Bool(o.correlated),
        "protected" => Value::Bool(o.protected),
        "lastLogin" => date(o.last_login),
        "lastRefresh" => date(o.last_refresh),
        "workgroup" => Value::Bool(o.workgroup),
        "manager" => opt(o.manager.as_ref()),
        "assignedScope" => opt(o.assigned_scope.as_ref()),
        "notificationOption" => o
            .notification_option
            .map_or(Value::Null, |n| Value::from(n.as_str())),
        other => o.attributes.get(other).cloned().unwrap_or_default(),
    }
}

macro_rules! stored_from {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for StoredObject {
                fn from(value: $ty) -> Self {
                    Self::$ty(value)
                }
            }
        )*
    };
}

stored_from!(Identity, Link, Application, Bundle, Capability, Scope);
