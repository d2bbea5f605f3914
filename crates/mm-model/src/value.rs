//! Tagged values carried by map models
//!
//! Provides [`Value`], the schema-friendly variant type every map model
//! field, system flag and info record is built from.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single map model value
///
/// Dates serialise as epoch milliseconds, so a date that went through a
/// JSON round trip comes back as [`Value::Int`]. [`Value::same_as`] treats
/// the two forms as equal; plain `==` does not.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Date(DateTime<Utc>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a list value out of anything string-like
    #[must_use]
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    /// Date from epoch milliseconds, `None` when out of range
    #[inline]
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self::Date)
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, an empty string or an empty collection
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// View any value as a list
    ///
    /// Null becomes an empty list and a scalar a one-element list.
    #[must_use]
    pub fn as_list(&self) -> Vec<Value> {
        match self {
            Self::Null => Vec::new(),
            Self::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// String members of a list (or the string itself), skipping anything else
    #[must_use]
    pub fn string_items(&self) -> Vec<String> {
        self.as_list()
            .into_iter()
            .filter_map(|v| match v {
                Self::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Permissive boolean reading
    ///
    /// `true`, `yes`, `y`, `on` and `1` (any case) are true, as is any
    /// non-zero integer. Everything else, including null, is false.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "y" | "on" | "1"
            ),
            _ => false,
        }
    }

    /// Equality used when diffing models
    ///
    /// - a date equals an integer holding the same epoch milliseconds
    /// - null equals an empty list
    /// - lists compare as multisets (order is not significant)
    /// - maps compare key by key with the same rules
    #[must_use]
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Date(d), Self::Int(ms)) | (Self::Int(ms), Self::Date(d)) => {
                d.timestamp_millis() == *ms
            }
            (Self::Null, Self::List(items)) | (Self::List(items), Self::Null) => items.is_empty(),
            (Self::List(a), Self::List(b)) => same_members(a, b),
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.same_as(other)))
            }
            _ => self == other,
        }
    }
}

/// Multiset comparison of two lists using [`Value::same_as`]
fn same_members(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        let hit = b
            .iter()
            .enumerate()
            .find(|(i, candidate)| !used[*i] && item.same_as(candidate));
        match hit {
            Some((i, _)) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_i64(d.timestamp_millis()),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a null, boolean, integer, string, list or map")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {v} out of range")))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            Ok(Value::Int(v as i64))
        } else {
            Err(E::custom(format!("fractional number {v} is not a model value")))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn date_serialises_as_millis() {
        let date = Value::from_millis(1_700_000_000_123).unwrap();
        assert_eq!(serde_json::to_value(&date).unwrap(), json!(1_700_000_000_123_i64));
    }

    #[test]
    fn json_round_trip_keeps_date_equivalent() {
        let date = Value::from_millis(86_400_000).unwrap();
        let back: Value = serde_json::from_str(&serde_json::to_string(&date).unwrap()).unwrap();
        assert_eq!(back, Value::Int(86_400_000));
        assert!(back.same_as(&date));
        assert_ne!(back, date);
    }

    #[test]
    fn deserialize_nested() {
        let v: Value = serde_json::from_value(json!({"a": [1, "b", null, true]})).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(
            map["a"],
            Value::List(vec![
                Value::Int(1),
                Value::from("b"),
                Value::Null,
                Value::Bool(true)
            ])
        );
    }

    #[test]
    fn fractional_numbers_rejected() {
        let result: Result<Value, _> = serde_json::from_value(json!(1.5));
        assert!(result.is_err());
    }

    #[test]
    fn truthy_is_permissive() {
        assert!(Value::from("TRUE").truthy());
        assert!(Value::from(" yes ").truthy());
        assert!(Value::from("1").truthy());
        assert!(Value::Int(3).truthy());
        assert!(!Value::from("false").truthy());
        assert!(!Value::from("maybe").truthy());
        assert!(!Value::Null.truthy());
    }

    #[test]
    fn lists_compare_without_order() {
        let a = Value::strings(["x", "y", "y"]);
        let b = Value::strings(["y", "x", "y"]);
        let c = Value::strings(["x", "x", "y"]);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn null_matches_empty_list_only() {
        assert!(Value::Null.same_as(&Value::List(vec![])));
        assert!(!Value::Null.same_as(&Value::from("")));
    }

    #[test]
    fn as_list_wraps_scalars() {
        assert_eq!(Value::from("a").as_list(), vec![Value::from("a")]);
        assert!(Value::Null.as_list().is_empty());
    }

    proptest! {
        #[test]
        fn same_as_is_reflexive(s in "[a-z]{0,8}", i in any::<i64>(), b in any::<bool>()) {
            let v = Value::List(vec![Value::from(s.as_str()), Value::Int(i), Value::Bool(b)]);
            prop_assert!(v.same_as(&v.clone()));
        }

        #[test]
        fn same_as_is_symmetric_for_dates(ms in -8_000_000_000_000_i64..8_000_000_000_000_i64) {
            let date = Value::from_millis(ms).unwrap();
            let int = Value::Int(ms);
            prop_assert!(date.same_as(&int));
            prop_assert!(int.same_as(&date));
        }
    }
}
