//! Value differencing between a baseline and an edited model

use mm_model::Value;

/// Whether an edited value differs from its baseline
///
/// Absent and null are the same thing, and [`Value::same_as`] decides the
/// rest.
#[must_use]
pub fn changed(baseline: Option<&Value>, edited: Option<&Value>) -> bool {
    let baseline = baseline.unwrap_or(&Value::Null);
    let edited = edited.unwrap_or(&Value::Null);
    !baseline.same_as(edited)
}

/// Members added to and removed from a multi-valued attribute
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListDelta {
    pub added: Vec<Value>,
    pub removed: Vec<Value>,
}

impl ListDelta {
    /// Compare two values as sets, keeping the order each side gives
    #[must_use]
    pub fn between(baseline: Option<&Value>, edited: Option<&Value>) -> Self {
        let old = baseline.map(Value::as_list).unwrap_or_default();
        let new = edited.map(Value::as_list).unwrap_or_default();
        let contains = |list: &[Value], v: &Value| list.iter().any(|x| x.same_as(v));
        Self {
            added: dedupe(new.iter().filter(|v| !contains(&old, v)).cloned()),
            removed: dedupe(old.iter().filter(|v| !contains(&new, v)).cloned()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn dedupe(items: impl Iterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !item.is_null() && !out.iter().any(|x| x.same_as(&item)) {
            out.push(item);
        }
    }
    out
}
