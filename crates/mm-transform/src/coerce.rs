//! Coercion of edited values to their declared types
//!
//! Models come back from clients in whatever shape the client produced.
//! Reference types accept either an object id or a name and always
//! resolve to the canonical name.

use mm_model::{AttributeType, Value};
use mm_store::{Filter, ObjectClass, ObjectStoreExt};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{CoercionError, Result};

static UNIQUE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("unique id pattern is valid"));

/// Check whether `s` has object id syntax rather than name syntax
#[inline]
#[must_use]
pub fn is_unique_id(s: &str) -> bool {
    UNIQUE_ID.is_match(s)
}

/// Coerce `value` for `attribute` to `attr_type`
///
/// Untyped values, strings, ints and scopes pass through (scope names are
/// not unique, so scope ids are never resolved). Secrets come back
/// encrypted.
///
/// # Errors
/// Returns [`CoercionError`] for a date given as a string or as anything
/// other than epoch milliseconds and for a secret that is not a scalar.
/// Propagates store failures from reference resolution and encryption
/// failures.
pub fn coerce(
    ctx: &Context<'_>,
    attribute: &str,
    attr_type: Option<AttributeType>,
    value: Value,
) -> Result<Value> {
    let Some(attr_type) = attr_type else {
        return Ok(value);
    };
    match attr_type {
        AttributeType::Boolean => Ok(Value::Bool(value.truthy())),
        AttributeType::Date => coerce_date(attribute, value),
        AttributeType::Identity => resolve_names(ctx, ObjectClass::Identity, value, &Filter::All),
        AttributeType::Capability => {
            resolve_names(ctx, ObjectClass::Capability, value, &Filter::All)
        }
        AttributeType::Bundle => resolve_names(ctx, ObjectClass::Bundle, value, &Filter::All),
        AttributeType::Workgroup => resolve_names(
            ctx,
            ObjectClass::Identity,
            value,
            &Filter::eq("workgroup", true),
        ),
        AttributeType::Secret => encrypt_secret(ctx, attribute, value),
        AttributeType::String | AttributeType::Int | AttributeType::Scope => Ok(value),
    }
}

/// Encrypt a secret value so the plaintext never reaches a change request
///
/// Numbers and booleans are encrypted in their string form; null stays null.
///
/// # Errors
/// Returns [`CoercionError::InvalidSecret`] for dates, lists and maps, and
/// propagates encryption failures.
pub fn encrypt_secret(ctx: &Context<'_>, attribute: &str, value: Value) -> Result<Value> {
    let plain = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s,
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Date(_) | Value::List(_) | Value::Map(_) => {
            return Err(CoercionError::InvalidSecret {
                attribute: attribute.to_string(),
            }
            .into())
        }
    };
    Ok(Value::String(ctx.encryptor.encrypt(&plain)?))
}

fn coerce_date(attribute: &str, value: Value) -> Result<Value> {
    match value {
        Value::Null | Value::Date(_) => Ok(value),
        Value::Int(millis) => Value::from_millis(millis).ok_or_else(|| {
            CoercionError::InvalidDate {
                attribute: attribute.to_string(),
                found: millis.to_string(),
            }
            .into()
        }),
        Value::String(_) => Err(CoercionError::AmbiguousDate {
            attribute: attribute.to_string(),
        }
        .into()),
        other => Err(CoercionError::InvalidDate {
            attribute: attribute.to_string(),
            found: other.to_string(),
        }
        .into()),
    }
}

/// Resolve a name or a list of names, dropping empties and unknown ids
///
/// A single value resolves to a string and a list to a list; nothing left
/// resolves to null.
///
/// # Errors
/// Propagates store failures
pub fn resolve_names(
    ctx: &Context<'_>,
    class: ObjectClass,
    value: Value,
    extra: &Filter,
) -> Result<Value> {
    match value {
        Value::String(s) if !s.is_empty() => {
            Ok(resolve_name(ctx, class, &s, extra)?.map_or(Value::Null, Value::String))
        }
        Value::List(items) => {
            let mut names = Vec::new();
            for item in items {
                let Value::String(s) = item else { continue };
                if s.is_empty() {
                    continue;
                }
                if let Some(name) = resolve_name(ctx, class, &s, extra)? {
                    names.push(Value::String(name));
                }
            }
            Ok(if names.is_empty() {
                Value::Null
            } else {
                Value::List(names)
            })
        }
        _ => Ok(Value::Null),
    }
}

fn resolve_name(
    ctx: &Context<'_>,
    class: ObjectClass,
    candidate: &str,
    extra: &Filter,
) -> Result<Option<String>> {
    if !is_unique_id(candidate) {
        return Ok(Some(candidate.to_string()));
    }
    let name = ctx
        .store
        .property_by_id(class, candidate, "name", extra)?
        .and_then(|v| v.as_str().map(ToString::to_string));
    if name.is_none() {
        tracing::debug!(%class, id = candidate, "unresolved id dropped");
    }
    Ok(name)
}
