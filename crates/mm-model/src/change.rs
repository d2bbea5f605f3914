//! Change requests produced from edited map models
//!
//! An edited model reconciles into a [`ChangePlan`]: one
//! [`ChangeOperation`] per target, each carrying the field level
//! [`AttributeChangeRequest`]s that differ from the stored state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::AttributeType;
use crate::value::Value;

/// Application name used for operations on the identity itself
pub const APP_IIQ: &str = "IIQ";

/// Field level operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeOp {
    Set,
    Add,
    Remove,
}

/// One field level change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeChangeRequest {
    pub name: String,
    pub op: AttributeOp,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<AttributeType>,
}

impl AttributeChangeRequest {
    #[must_use]
    pub fn new(name: impl Into<String>, op: AttributeOp, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
            value_type: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn set(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, AttributeOp::Set, value)
    }

    #[must_use]
    pub fn with_type(mut self, value_type: Option<AttributeType>) -> Self {
        self.value_type = value_type;
        self
    }
}

/// Object level operation tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Modify,
    Delete,
    Enable,
    Disable,
    Unlock,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        Self::Create,
        Self::Modify,
        Self::Delete,
        Self::Enable,
        Self::Disable,
        Self::Unlock,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Modify => "Modify",
            Self::Delete => "Delete",
            Self::Enable => "Enable",
            Self::Disable => "Disable",
            Self::Unlock => "Unlock",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ChangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ChangeError::UnknownOperation(s.to_string()))
    }
}

/// Changes for a single target object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOperation {
    pub application: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub kind: OperationKind,
    #[serde(default)]
    pub requests: Vec<AttributeChangeRequest>,
}

impl ChangeOperation {
    #[must_use]
    pub fn new(application: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            application: application.into(),
            native_identity: None,
            instance: None,
            kind,
            requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_native_identity(mut self, native_identity: Option<String>) -> Self {
        self.native_identity = native_identity;
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: Option<String>) -> Self {
        self.instance = instance;
        self
    }

    #[must_use]
    pub fn request(&self, name: &str) -> Option<&AttributeChangeRequest> {
        self.requests.iter().find(|r| r.name == name)
    }

    /// Append a request
    pub fn push(&mut self, request: AttributeChangeRequest) {
        self.requests.push(request);
    }

    /// Append unless a request for the same name already exists
    ///
    /// The first request for a name wins. Returns whether it was added.
    pub fn push_if_absent(&mut self, request: AttributeChangeRequest) -> bool {
        if self.request(&request.name).is_some() {
            return false;
        }
        self.requests.push(request);
        true
    }

    /// Replace the request for the same name in place, or append it
    pub fn upsert(&mut self, request: AttributeChangeRequest) {
        match self.requests.iter_mut().find(|r| r.name == request.name) {
            Some(existing) => *existing = request,
            None => self.requests.push(request),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Document level result of reconciling an edited model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangePlan {
    /// Name of the identity the plan targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default)]
    pub operations: Vec<ChangeOperation>,
}

impl ChangePlan {
    #[must_use]
    pub fn new(identity: Option<String>) -> Self {
        Self {
            identity,
            operations: Vec::new(),
        }
    }

    pub fn add(&mut self, operation: ChangeOperation) {
        self.operations.push(operation);
    }

    /// Append another plan's operations, keeping this plan's identity when set
    pub fn merge(&mut self, other: ChangePlan) {
        if self.identity.is_none() {
            self.identity = other.identity;
        }
        self.operations.extend(other.operations);
    }

    /// Operations targeting `application`
    pub fn operations_for<'a>(
        &'a self,
        application: &'a str,
    ) -> impl Iterator<Item = &'a ChangeOperation> + 'a {
        self.operations
            .iter()
            .filter(move |op| op.application == application)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Errors related to change types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChangeError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}
