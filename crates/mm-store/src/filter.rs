//! Query filters over object properties

use mm_model::Value;
use serde::{Deserialize, Serialize};

use crate::objects::StoredObject;

/// Filter evaluated against [`StoredObject::property`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    #[must_use]
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    /// Conjunction, flattening `All`
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (Self::And(mut fs), f) => {
                fs.push(f);
                Self::And(fs)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    #[must_use]
    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    #[must_use]
    pub fn matches(&self, object: &StoredObject) -> bool {
        match self {
            Self::All => true,
            Self::Eq(column, value) => object.property(column).same_as(value),
            Self::In(column, values) => {
                let actual = object.property(column);
                values.iter().any(|v| actual.same_as(v))
            }
            Self::And(filters) => filters.iter().all(|f| f.matches(object)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(object)),
        }
    }
}
