//! Object configuration and account schema metadata
//!
//! [`ObjectConfig`] describes the ordered attributes of an object class and
//! drives both model construction and change generation. [`AccountSchema`]
//! plays the same role for account links of one application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Internal attribute toggling an account's disabled state
pub const ATT_IIQ_DISABLED: &str = "IIQDisabled";

/// Internal attribute toggling an account's locked state
pub const ATT_IIQ_LOCKED: &str = "IIQLocked";

/// Attribute names that carry secrets during provisioning
pub const SECRET_ATTRIBUTE_NAMES: [&str; 2] = ["password", "currentPassword"];

/// Declared type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    String,
    Boolean,
    Date,
    Int,
    Secret,
    /// Reference to another identity, held by name
    Identity,
    Capability,
    /// Role reference
    Bundle,
    /// Workgroup identity reference
    Workgroup,
    Scope,
}

impl AttributeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Int => "int",
            Self::Secret => "secret",
            Self::Identity => "identity",
            Self::Capability => "capability",
            Self::Bundle => "bundle",
            Self::Workgroup => "workgroup",
            Self::Scope => "scope",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an attribute value behaves once edited by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditMode {
    #[default]
    ReadOnly,
    Permanent,
    UntilFeedValueChanges,
}

impl EditMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "ReadOnly",
            Self::Permanent => "Permanent",
            Self::UntilFeedValueChanges => "UntilFeedValueChanges",
        }
    }
}

/// One configured attribute of an object class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAttribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// `None` reads as [`AttributeType::String`]
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub attr_type: Option<AttributeType>,
    #[serde(default)]
    pub multi: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub standard: bool,
    #[serde(default)]
    pub system: bool,
    /// Holds a reference to another identity
    #[serde(default)]
    pub identity_ref: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_mode: Option<EditMode>,
}

impl ObjectAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            attr_type: None,
            multi: false,
            editable: false,
            standard: false,
            system: false,
            identity_ref: false,
            edit_mode: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, attr_type: AttributeType) -> Self {
        self.attr_type = Some(attr_type);
        self
    }

    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    #[must_use]
    pub fn standard(mut self) -> Self {
        self.standard = true;
        self
    }

    #[must_use]
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Mark as an identity reference, which also types it as one
    #[must_use]
    pub fn identity_ref(mut self) -> Self {
        self.identity_ref = true;
        self.attr_type = Some(AttributeType::Identity);
        self
    }

    #[must_use]
    pub fn with_edit_mode(mut self, edit_mode: EditMode) -> Self {
        self.edit_mode = Some(edit_mode);
        self
    }

    #[inline]
    #[must_use]
    pub fn effective_type(&self) -> AttributeType {
        self.attr_type.unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn effective_edit_mode(&self) -> EditMode {
        self.edit_mode.unwrap_or_default()
    }
}

/// Ordered attribute configuration for one object class
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub class: String,
    #[serde(default)]
    pub attributes: Vec<ObjectAttribute>,
}

impl ObjectConfig {
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: ObjectAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ObjectAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// One attribute in an application's account schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(default, rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default)]
    pub multi: bool,
}

impl AttributeDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: AttributeType::String,
            multi: false,
        }
    }

    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    #[must_use]
    pub fn with_type(mut self, attr_type: AttributeType) -> Self {
        self.attr_type = attr_type;
        self
    }
}

/// Account schema of one application
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_attribute: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl AccountSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_identity_attribute(mut self, name: impl Into<String>) -> Self {
        self.identity_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_display_attribute(mut self, name: impl Into<String>) -> Self {
        self.display_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.push(definition);
        self
    }

    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|d| d.name == name)
    }

    /// Names accepted on a link even when the schema does not declare them
    ///
    /// Identity and display attributes are often missing from the schema,
    /// so they are listed here along with the internal lifecycle attributes
    /// and the secret provisioning names.
    #[must_use]
    pub fn other_attribute_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(id_attr) = &self.identity_attribute {
            names.push(id_attr.clone());
        }
        if let Some(display) = &self.display_attribute {
            if !names.contains(display) {
                names.push(display.clone());
            }
        }
        names.push(ATT_IIQ_DISABLED.to_string());
        names.push(ATT_IIQ_LOCKED.to_string());
        names.extend(SECRET_ATTRIBUTE_NAMES.iter().map(ToString::to_string));
        names
    }
}

impl FromStr for AttributeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "int" => Ok(Self::Int),
            "secret" => Ok(Self::Secret),
            "identity" => Ok(Self::Identity),
            "capability" => Ok(Self::Capability),
            "bundle" => Ok(Self::Bundle),
            "workgroup" => Ok(Self::Workgroup),
            "scope" => Ok(Self::Scope),
            other => Err(format!("unknown attribute type: {other}")),
        }
    }
}
