//! Account link map models
//!
//! A link model keeps the account attributes at the root, one key per
//! schema attribute (explicit null when the account has no value), and the
//! link's bookkeeping under `sys`. Edits to `sys.disabled` and `sys.locked`
//! become lifecycle operations; `sys.delete` and `sys.operation` steer the
//! operation kind directly.

use mm_model::{
    AccountSchema, AttributeChangeRequest, AttributeOp, AttributeType, ChangeOperation,
    ChangePlan, InfoEntry, InfoRecord, MapModel, OperationKind, Value, ATT_IIQ_DISABLED,
    ATT_IIQ_LOCKED, SECRET_ATTRIBUTE_NAMES,
};
use mm_store::{Application, Link, ObjectStoreExt, FEATURE_NO_RANDOM_ACCESS};

use crate::coerce::encrypt_secret;
use crate::context::Context;
use crate::diff::{changed, ListDelta};
use crate::error::{Result, SchemaError, ValidationError};
use crate::options::TransformOptions;

pub(crate) const SYS_ID: &str = "id";
pub(crate) const SYS_NATIVE_IDENTITY: &str = "nativeIdentity";
pub(crate) const SYS_INSTANCE: &str = "instance";
pub(crate) const SYS_DISPLAY_NAME: &str = "displayName";
pub(crate) const SYS_DISABLED: &str = "disabled";
pub(crate) const SYS_LOCKED: &str = "locked";
pub(crate) const SYS_LAST_REFRESH: &str = "lastRefresh";
pub(crate) const SYS_UUID: &str = "uuid";
pub(crate) const SYS_HAS_ENTITLEMENTS: &str = "hasEntitlements";
pub(crate) const SYS_IDENTITY: &str = "identity";
pub(crate) const SYS_IDENTITY_DISPLAY_NAME: &str = "identityDisplayName";
pub(crate) const SYS_APPLICATION: &str = "application";
pub(crate) const SYS_DELETE: &str = "delete";
pub(crate) const SYS_OPERATION: &str = "operation";

pub(crate) const INFO_APPLICATION: &str = "application";

/// Converts account links to map models and edited models to change plans
#[derive(Debug, Clone, Copy)]
pub struct LinkTransformer<'a> {
    ctx: Context<'a>,
    options: TransformOptions,
}

impl<'a> LinkTransformer<'a> {
    #[must_use]
    pub fn new(ctx: Context<'a>, options: TransformOptions) -> Self {
        Self { ctx, options }
    }

    /// Build the map model of a link
    ///
    /// # Errors
    /// - [`SchemaError::MissingAccountSchema`] when the link carries
    ///   attributes but its application has no account schema
    /// - store failures
    #[tracing::instrument(skip_all, fields(application = %link.application, native_identity = ?link.native_identity))]
    pub fn to_map(&self, link: &Link) -> Result<MapModel> {
        let mut model = MapModel::new();
        let owner = match link.identity.as_deref() {
            Some(id) => self.ctx.store.identity_by_id(id)?,
            None => None,
        };
        let app = self.ctx.store.application_by_name(&link.application)?;

        model.set_sys(SYS_ID, link.id.clone());
        model.set_sys(SYS_NATIVE_IDENTITY, link.native_identity.clone());
        model.set_sys(SYS_INSTANCE, link.instance.clone());
        model.set_sys(
            SYS_DISPLAY_NAME,
            link.display_name.clone().or_else(|| link.native_identity.clone()),
        );
        model.set_sys(SYS_DISABLED, link.disabled);
        model.set_sys(SYS_LOCKED, link.locked);
        model.set_sys(SYS_LAST_REFRESH, link.last_refresh);
        model.set_sys(SYS_UUID, link.uuid.clone());
        model.set_sys(SYS_HAS_ENTITLEMENTS, link.entitlements);
        if let Some(owner) = &owner {
            model.set_sys(SYS_IDENTITY, owner.name.clone());
            model.set_sys(
                SYS_IDENTITY_DISPLAY_NAME,
                owner.display_name.clone().or_else(|| owner.name.clone()),
            );
        }
        model.set_sys(SYS_APPLICATION, link.application.as_str());

        if let Some(app) = &app {
            model
                .info
                .insert(INFO_APPLICATION, InfoEntry::Single(application_record(app)));
        }

        if !link.attributes.is_empty() {
            let schema = app
                .as_ref()
                .and_then(|a| a.account_schema.as_ref())
                .ok_or_else(|| SchemaError::MissingAccountSchema {
                    application: link.application.clone(),
                })?;
            flatten_attributes(&mut model, schema, link);
        }

        tracing::debug!(?model, "built link map model");
        Ok(model)
    }

    /// Rebuild `info.application` from `sys.application`
    ///
    /// # Errors
    /// Propagates store failures
    #[tracing::instrument(skip_all, fields(application = ?model.sys_str(SYS_APPLICATION)))]
    pub fn refresh(&self, mut model: MapModel) -> Result<MapModel> {
        let app = match model.sys_str(SYS_APPLICATION) {
            Some(name) => self.ctx.store.application_by_name(name)?,
            None => None,
        };
        match app {
            Some(app) => model
                .info
                .insert(INFO_APPLICATION, InfoEntry::Single(application_record(&app))),
            None => {
                model.info.remove(INFO_APPLICATION);
            }
        }
        Ok(model)
    }

    /// Reconcile an edited link model into a change plan
    ///
    /// The plan's identity is the owning identity's name.
    ///
    /// # Errors
    /// - [`SchemaError`] when the application is missing, unknown or has
    ///   no account schema
    /// - [`ValidationError::AccountExists`] when a creation targets an
    ///   account the directory already knows
    /// - store failures
    #[tracing::instrument(skip_all, fields(application = ?model.sys_str(SYS_APPLICATION), id = ?model.sys_str(SYS_ID)))]
    pub fn map_to_plan(&self, model: &MapModel) -> Result<Option<ChangePlan>> {
        let app_name = model
            .sys_str(SYS_APPLICATION)
            .ok_or(SchemaError::MissingApplication)?;
        let app = self
            .ctx
            .store
            .application_by_name(app_name)?
            .ok_or_else(|| SchemaError::UnknownApplication {
                name: app_name.to_string(),
            })?;
        let schema = app
            .account_schema
            .as_ref()
            .ok_or_else(|| SchemaError::MissingAccountSchema {
                application: app.name.clone(),
            })?;

        let (existing, owner) = match model.sys_str(SYS_ID) {
            Some(id) => match self.ctx.store.link_by_id(id)? {
                Some(link) => {
                    let owner = match link.identity.as_deref() {
                        Some(owner_id) => self.ctx.store.identity_by_id(owner_id)?,
                        None => None,
                    };
                    (Some(self.to_map(&link)?), owner)
                }
                None => (None, None),
            },
            None => {
                let owner = match model.sys_str(SYS_IDENTITY) {
                    Some(name) => self.ctx.store.identity_by_name(name)?,
                    None => None,
                };
                (None, owner)
            }
        };

        let native_identity = model
            .sys_str(SYS_NATIVE_IDENTITY)
            .or_else(|| {
                schema
                    .identity_attribute
                    .as_deref()
                    .and_then(|attr| model.field_str(attr))
            })
            .map(ToString::to_string);

        let kind = if model.sys_str(SYS_ID).is_some() {
            OperationKind::Modify
        } else {
            OperationKind::Create
        };
        let mut op = ChangeOperation::new(app.name.as_str(), kind)
            .with_native_identity(native_identity)
            .with_instance(model.sys_str(SYS_INSTANCE).map(ToString::to_string));

        if kind == OperationKind::Create {
            self.validate_new_account(&app, &op)?;
        }

        diff_attributes(&self.ctx, &mut op, schema, existing.as_ref(), model)?;
        diff_flag(&mut op, existing.as_ref(), model, SYS_DISABLED, ATT_IIQ_DISABLED);
        diff_flag(&mut op, existing.as_ref(), model, SYS_LOCKED, ATT_IIQ_LOCKED);
        if model.sys(SYS_DELETE).is_some_and(Value::truthy) {
            op.kind = OperationKind::Delete;
        }

        let Some(mut op) = normalize(op) else {
            tracing::debug!("link unchanged");
            return Ok(None);
        };
        apply_override(&mut op, model);

        let mut plan = ChangePlan::new(owner.and_then(|o| o.name));
        plan.add(op);
        Ok(Some(plan))
    }

    fn validate_new_account(&self, app: &Application, op: &ChangeOperation) -> Result<()> {
        if !self.options.check_account_exists || app.supports_feature(FEATURE_NO_RANDOM_ACCESS) {
            return Ok(());
        }
        let Some(accounts) = self.ctx.accounts else {
            tracing::warn!(application = %app.name, "no account directory, existence check skipped");
            return Ok(());
        };
        let Some(native_identity) = op.native_identity.as_deref() else {
            return Ok(());
        };
        if accounts.account_exists(&app.name, native_identity)? {
            return Err(ValidationError::AccountExists {
                application: app.name.clone(),
                native_identity: native_identity.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn application_record(app: &Application) -> InfoRecord {
    let mut record = InfoRecord::new();
    record.insert("id".into(), app.id.clone().into());
    record.insert("name".into(), Value::from(app.name.as_str()));
    record.insert("type".into(), app.app_type.clone().into());
    record.insert("connector".into(), app.connector.clone().into());
    record.insert("features".into(), Value::strings(app.features.iter()));
    record.insert("owner".into(), app.owner.clone().into());
    record.retain(|_, v| !v.is_null());
    record
}

/// Copy schema-known attributes to the root and null out the missing ones
fn flatten_attributes(model: &mut MapModel, schema: &AccountSchema, link: &Link) {
    let other = schema.other_attribute_names();
    for (key, value) in &link.attributes {
        if schema.definition(key).is_some() || other.contains(key) {
            model.set_field(key.clone(), value.clone());
        }
    }
    for def in &schema.attributes {
        if !link.attributes.contains_key(&def.name) {
            model.fields.insert(def.name.clone(), Value::Null);
        }
    }
}

fn diff_attributes(
    ctx: &Context<'_>,
    op: &mut ChangeOperation,
    schema: &AccountSchema,
    existing: Option<&MapModel>,
    edited: &MapModel,
) -> Result<()> {
    let other = schema.other_attribute_names();
    let identity_attribute = schema.identity_attribute.as_deref();

    for key in edited.fields.keys() {
        let def = schema.definition(key);
        if def.is_none() && !other.contains(key) {
            tracing::debug!(attribute = %key, "attribute not in account schema, skipped");
            continue;
        }
        let baseline = existing.and_then(|m| m.field(key));
        let value = edited.field(key);
        let value_type = def.map(|d| d.attr_type);

        if def.is_some_and(|d| d.multi) {
            if let Some(edit) = edited.granular(key) {
                for (attr_op, values) in [(AttributeOp::Add, edit.add), (AttributeOp::Remove, edit.remove)] {
                    if !values.is_empty() {
                        op.push(
                            AttributeChangeRequest::new(key.as_str(), attr_op, values)
                                .with_type(value_type),
                        );
                    }
                }
                continue;
            }
            let delta = ListDelta::between(baseline, value);
            if !delta.added.is_empty() {
                op.push(
                    AttributeChangeRequest::new(key.as_str(), AttributeOp::Add, delta.added)
                        .with_type(value_type),
                );
            }
            if !delta.removed.is_empty() {
                op.push(
                    AttributeChangeRequest::new(key.as_str(), AttributeOp::Remove, delta.removed)
                        .with_type(value_type),
                );
            }
            continue;
        }

        // renames are not supported
        if identity_attribute == Some(key.as_str()) {
            continue;
        }
        if changed(baseline, value) {
            tracing::debug!(attribute = %key, "link attribute changed");
            let mut value = value.cloned().unwrap_or_default();
            if value_type == Some(AttributeType::Secret)
                || SECRET_ATTRIBUTE_NAMES.contains(&key.as_str())
            {
                value = encrypt_secret(ctx, key, value)?;
            }
            op.push(AttributeChangeRequest::set(key.as_str(), value).with_type(value_type));
        }
    }
    Ok(())
}

/// Diff a `sys` flag and write it as its lifecycle attribute
fn diff_flag(
    op: &mut ChangeOperation,
    existing: Option<&MapModel>,
    edited: &MapModel,
    sys_key: &str,
    attribute: &str,
) {
    let updated = edited.sys(sys_key).is_some_and(Value::truthy);
    let current = existing
        .and_then(|m| m.sys(sys_key))
        .is_some_and(Value::truthy);
    if updated != current {
        op.upsert(AttributeChangeRequest::set(attribute, updated));
    }
}

/// Collapse lone lifecycle toggles into their operation kinds
///
/// A Modify whose only request is `IIQDisabled` becomes Enable or Disable,
/// and one whose only request is `IIQLocked=false` becomes Unlock. A Modify
/// left without requests is dropped.
fn normalize(mut op: ChangeOperation) -> Option<ChangeOperation> {
    if op.kind == OperationKind::Modify && op.requests.len() == 1 {
        let request = &op.requests[0];
        let truthy = request.value.truthy();
        let collapsed = match request.name.as_str() {
            ATT_IIQ_DISABLED if truthy => Some(OperationKind::Disable),
            ATT_IIQ_DISABLED => Some(OperationKind::Enable),
            ATT_IIQ_LOCKED if !truthy => Some(OperationKind::Unlock),
            _ => None,
        };
        if let Some(kind) = collapsed {
            tracing::debug!(%kind, "lifecycle toggle collapsed");
            op.kind = kind;
            op.requests.clear();
        }
    }
    if op.kind == OperationKind::Modify && op.requests.is_empty() {
        return None;
    }
    Some(op)
}

fn apply_override(op: &mut ChangeOperation, model: &MapModel) {
    let Some(value) = model.sys(SYS_OPERATION) else {
        return;
    };
    match value.to_string().parse::<OperationKind>() {
        Ok(kind) => op.kind = kind,
        Err(err) => tracing::warn!(%value, %err, "ignoring operation override"),
    }
}
