//! Identity map models
//!
//! [`IdentityTransformer`] renders an [`Identity`] as a [`MapModel`],
//! refreshes the derived info of an edited model, and reconciles an edited
//! model into a [`ChangePlan`] against a fresh baseline.
//!
//! Root fields of an identity model:
//!
//! | key | value |
//! |-----|-------|
//! | `name`, `displayName`, `firstname`, `lastname` | strings |
//! | `correlated`, `protected`, `managerStatus`, `correlatedOverriden`, `isWorkgroup` | booleans |
//! | `lastLogin`, `lastRefresh`, `passwordExpiration` | dates |
//! | `assignedScope` | scope id |
//! | `controlsAssignedScope` | boolean, absent means system default |
//! | `manager` | manager name |
//! | `capabilities`, `assignedRoles`, `detectedRoles`, `workgroups` | names |
//! | `controlledScopes` | scope ids |
//! | configured attributes | as stored; identity references by name |
//!
//! `sys.id` holds the identity id and `children.links` the account links
//! when links are expanded.

use mm_model::{
    AttributeChangeRequest, AttributeOp, AttributeType, ChangeOperation, ChangePlan, EditMode,
    InfoEntry, InfoRecord, MapModel, OperationKind, Value, APP_IIQ,
};
use mm_store::{Filter, Identity, ObjectClass, ObjectStoreExt};

use crate::coerce::coerce;
use crate::context::Context;
use crate::diff::changed;
use crate::error::{Result, ValidationError};
use crate::link::LinkTransformer;
use crate::options::TransformOptions;
use crate::projection::{
    self, ASSIGNED_ROLES, CAPABILITIES, CONTROLLED_SCOPES, DETECTED_ROLES, REFRESHED,
    WORKGROUPS,
};

pub(crate) const ATTR_ID: &str = "id";
pub(crate) const ATTR_NAME: &str = "name";
pub(crate) const ATTR_DISPLAY_NAME: &str = "displayName";
pub(crate) const ATTR_FIRSTNAME: &str = "firstname";
pub(crate) const ATTR_LASTNAME: &str = "lastname";
pub(crate) const ATTR_CORRELATED: &str = "correlated";
pub(crate) const ATTR_PROTECTED: &str = "protected";
pub(crate) const ATTR_LAST_LOGIN: &str = "lastLogin";
pub(crate) const ATTR_LAST_REFRESH: &str = "lastRefresh";
pub(crate) const ATTR_MANAGER_STATUS: &str = "managerStatus";
pub(crate) const ATTR_PASSWORD: &str = "password";
pub(crate) const ATTR_CORRELATED_OVERRIDEN: &str = "correlatedOverriden";
pub(crate) const ATTR_PASSWORD_EXPIRATION: &str = "passwordExpiration";
pub(crate) const ATTR_IS_WORKGROUP: &str = "isWorkgroup";
pub(crate) const ATTR_ASSIGNED_SCOPE: &str = "assignedScope";
pub(crate) const ATTR_CONTROLS_ASSIGNED_SCOPE: &str = "controlsAssignedScope";
pub(crate) const ATTR_MANAGER: &str = "manager";
pub(crate) const ATTR_CAPABILITIES: &str = "capabilities";
pub(crate) const ATTR_ASSIGNED_ROLES: &str = "assignedRoles";
pub(crate) const ATTR_DETECTED_ROLES: &str = "detectedRoles";
pub(crate) const ATTR_WORKGROUPS: &str = "workgroups";
pub(crate) const ATTR_CONTROLLED_SCOPES: &str = "controlledScopes";
pub(crate) const ATTR_OBJECT_CONFIG: &str = "objectConfig";
pub(crate) const ATTR_LINKS: &str = "links";

/// Converts identities to map models and edited models to change plans
#[derive(Debug, Clone, Copy)]
pub struct IdentityTransformer<'a> {
    ctx: Context<'a>,
    options: TransformOptions,
}

impl<'a> IdentityTransformer<'a> {
    #[must_use]
    pub fn new(ctx: Context<'a>, options: TransformOptions) -> Self {
        Self { ctx, options }
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> TransformOptions {
        self.options
    }

    /// Build the map model of an identity
    ///
    /// Reference lists come from projection queries on the identity's
    /// relations, so an identity without an id gets none. Info records and
    /// `info.objectConfig` appear only with `expand_identity`; links only
    /// with `expand_links`.
    ///
    /// # Errors
    /// Propagates store failures and link schema errors
    #[tracing::instrument(skip_all, fields(identity = ?identity.name))]
    pub fn to_map(&self, identity: &Identity) -> Result<MapModel> {
        let mut model = MapModel::new();
        if let Some(id) = &identity.id {
            model.set_sys(ATTR_ID, id.as_str());
        }
        model.set_field(ATTR_NAME, identity.name.clone());
        model.set_field(ATTR_DISPLAY_NAME, identity.display_name.clone());

        self.append_attributes(&mut model, identity)?;
        self.append_links(&mut model, identity)?;

        if let Some(id) = identity.id.as_deref() {
            let expand = self.options.expand_identity;
            projection::project_identity(&self.ctx, &mut model, id, &CAPABILITIES, expand)?;
            self.append_assigned_roles(&mut model, identity, id)?;
            projection::project_identity(&self.ctx, &mut model, id, &DETECTED_ROLES, expand)?;
            projection::project_identity(&self.ctx, &mut model, id, &WORKGROUPS, expand)?;
            projection::project_identity(&self.ctx, &mut model, id, &CONTROLLED_SCOPES, expand)?;
        } else {
            tracing::info!("identity has no id, reference lists skipped");
        }

        tracing::debug!(?model, "built identity map model");
        Ok(model)
    }

    /// Recompute derived info after root fields were edited
    ///
    /// Always produces an expanded model. The manager is re-fetched only
    /// when its name changed, and each reference list fetches only the
    /// identifiers its info list does not know yet. Child link models get
    /// their application info rebuilt.
    ///
    /// # Errors
    /// Propagates store failures
    #[tracing::instrument(skip_all, fields(identity = ?model.field_str(ATTR_NAME)))]
    pub fn refresh(&self, mut model: MapModel) -> Result<MapModel> {
        self.refresh_manager(&mut model)?;
        for list in &REFRESHED {
            projection::refresh_list(&self.ctx, &mut model, list)?;
        }
        if let Some(links) = model.children.remove(ATTR_LINKS) {
            let transformer = LinkTransformer::new(self.ctx, self.options);
            let links = links
                .into_iter()
                .map(|link| transformer.refresh(link))
                .collect::<Result<Vec<_>>>()?;
            model.set_children(ATTR_LINKS, links);
        }
        tracing::debug!(?model, "refreshed identity map model");
        Ok(model)
    }

    /// Reconcile an edited model into a change plan
    ///
    /// Returns `None` when nothing differs from the stored identity and no
    /// link produced changes.
    ///
    /// # Errors
    /// - [`ValidationError::MissingName`] when the model has no name
    /// - [`ValidationError::DuplicateName`] when creating a name that is
    ///   already used as a name or an id
    /// - coercion, encryption, schema and store failures
    #[tracing::instrument(skip_all, fields(identity = ?model.field_str(ATTR_NAME), id = ?model.sys_str(ATTR_ID)))]
    pub fn map_to_plan(&self, model: &MapModel) -> Result<Option<ChangePlan>> {
        let name = model
            .field_str(ATTR_NAME)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::MissingName)?
            .to_string();
        let id = model.sys_str(ATTR_ID);

        let current = match id {
            Some(id) => self.ctx.store.identity_by_id(id)?,
            None => {
                self.check_duplicate(&name)?;
                None
            }
        };
        // a rename still targets the stored identity
        let target = current
            .as_ref()
            .and_then(|identity| identity.name.clone())
            .unwrap_or_else(|| name.clone());
        let baseline = self.to_map(&current.unwrap_or_default())?;

        if model.same_as(&baseline) {
            tracing::debug!("model matches stored identity");
            return Ok(None);
        }

        let kind = if id.is_some() {
            OperationKind::Modify
        } else {
            OperationKind::Create
        };
        let mut op =
            ChangeOperation::new(APP_IIQ, kind).with_native_identity(Some(target.clone()));
        let mut diff = AttributeDiff {
            ctx: &self.ctx,
            op: &mut op,
            edited: model,
            baseline: &baseline,
        };

        if kind == OperationKind::Create {
            diff.request(ATTR_NAME, None, false)?;
        }

        for attr in &self.ctx.identity_config.attributes {
            if attr.system {
                continue;
            }
            if attr.identity_ref {
                diff.request(&attr.name, Some(AttributeType::Identity), attr.multi)?;
            } else if attr.editable || attr.standard || kind == OperationKind::Create {
                diff.request(&attr.name, attr.attr_type, attr.multi)?;
            }
        }

        diff.request(ATTR_PASSWORD, Some(AttributeType::Secret), false)?;
        diff.request(ATTR_PROTECTED, Some(AttributeType::Boolean), false)?;
        diff.request(ATTR_CAPABILITIES, Some(AttributeType::Capability), true)?;
        diff.request(ATTR_DETECTED_ROLES, Some(AttributeType::Bundle), true)?;
        diff.request(ATTR_ASSIGNED_ROLES, Some(AttributeType::Bundle), true)?;
        diff.request(ATTR_MANAGER, Some(AttributeType::Identity), false)?;
        diff.request(ATTR_WORKGROUPS, Some(AttributeType::Workgroup), true)?;
        diff.request(ATTR_CONTROLLED_SCOPES, Some(AttributeType::Scope), true)?;
        diff.request(ATTR_CONTROLS_ASSIGNED_SCOPE, Some(AttributeType::Scope), false)?;
        diff.request(ATTR_ASSIGNED_SCOPE, Some(AttributeType::Scope), false)?;

        let mut plan = ChangePlan::new(Some(target));
        if op.is_empty() {
            tracing::debug!("no identity attribute changes");
        } else {
            plan.add(op);
        }

        let links = LinkTransformer::new(self.ctx, self.options);
        for link_model in model.children(ATTR_LINKS) {
            if let Some(link_plan) = links.map_to_plan(link_model)? {
                plan.merge(link_plan);
            }
        }

        Ok((!plan.is_empty()).then_some(plan))
    }

    fn check_duplicate(&self, name: &str) -> Result<()> {
        let filter = Filter::or(vec![
            Filter::eq(ATTR_ID, name),
            Filter::eq(ATTR_NAME, name),
        ]);
        if self.ctx.store.count(ObjectClass::Identity, &filter)? > 0 {
            return Err(ValidationError::DuplicateName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn append_attributes(&self, model: &mut MapModel, identity: &Identity) -> Result<()> {
        model.set_field(ATTR_FIRSTNAME, identity.firstname.clone());
        model.set_field(ATTR_LASTNAME, identity.lastname.clone());
        model.set_field(ATTR_CORRELATED, identity.correlated);
        model.set_field(ATTR_PROTECTED, identity.protected);
        model.set_field(ATTR_LAST_LOGIN, identity.last_login);
        model.set_field(ATTR_LAST_REFRESH, identity.last_refresh);
        model.set_field(ATTR_MANAGER_STATUS, identity.manager_status);
        model.set_field(ATTR_CORRELATED_OVERRIDEN, identity.correlated_overridden);
        model.set_field(ATTR_PASSWORD_EXPIRATION, identity.password_expiration);
        model.set_field(ATTR_IS_WORKGROUP, identity.workgroup);
        model.set_field(ATTR_ASSIGNED_SCOPE, identity.assigned_scope.clone());
        model.set_field(ATTR_CONTROLS_ASSIGNED_SCOPE, identity.controls_assigned_scope);

        let config = self.ctx.identity_config;
        for attr in config.attributes.iter().filter(|a| !a.system) {
            let Some(value) = identity.attribute(&attr.name) else {
                continue;
            };
            if !attr.identity_ref {
                model.set_field(attr.name.clone(), value.clone());
            } else if let Some(referenced) = value
                .as_str()
                .map(|id| self.ctx.store.identity_by_id(id))
                .transpose()?
                .flatten()
            {
                model.set_field(attr.name.clone(), referenced.name);
            }
        }
        self.append_object_config(model);

        // after the configured attributes, which may also name the manager
        if let Some(manager_id) = identity.manager.as_deref() {
            if let Some(manager) = self.ctx.store.identity_by_id(manager_id)? {
                self.set_manager(model, &manager);
            }
        }
        Ok(())
    }

    fn append_object_config(&self, model: &mut MapModel) {
        if !self.options.expand_identity {
            return;
        }
        let records: Vec<InfoRecord> = self
            .ctx
            .identity_config
            .attributes
            .iter()
            .map(|attr| {
                let mut record = InfoRecord::new();
                record.insert(ATTR_NAME.into(), Value::from(attr.name.as_str()));
                record.insert(ATTR_DISPLAY_NAME.into(), attr.display_name.clone().into());
                record.insert("type".into(), Value::from(attr.effective_type().as_str()));
                record.insert("isMulti".into(), Value::Bool(attr.multi));
                record.insert("isStandard".into(), Value::Bool(attr.standard));
                record.insert("isSystem".into(), Value::Bool(attr.system));
                let mode: EditMode = attr.effective_edit_mode();
                record.insert("editMode".into(), Value::from(mode.as_str()));
                record.retain(|_, v| !v.is_null());
                record
            })
            .collect();
        if !records.is_empty() {
            model.info.insert(ATTR_OBJECT_CONFIG, InfoEntry::List(records));
        }
    }

    fn set_manager(&self, model: &mut MapModel, manager: &Identity) {
        model.set_field(ATTR_MANAGER, manager.name.clone());
        if !self.options.expand_identity {
            return;
        }
        let mut record = InfoRecord::new();
        record.insert(ATTR_ID.into(), manager.id.clone().into());
        record.insert(ATTR_NAME.into(), manager.name.clone().into());
        record.insert(ATTR_DISPLAY_NAME.into(), manager.display_name.clone().into());
        record.retain(|_, v| !v.is_null());
        model.info.insert(ATTR_MANAGER, InfoEntry::Single(record));
    }

    fn refresh_manager(&self, model: &mut MapModel) -> Result<()> {
        let Some(manager_name) = model.field_str(ATTR_MANAGER).map(ToString::to_string) else {
            model.info.remove(ATTR_MANAGER);
            return Ok(());
        };
        let known = match model.info.get(ATTR_MANAGER) {
            None => None,
            Some(InfoEntry::Single(record)) => record
                .get(ATTR_NAME)
                .and_then(Value::as_str)
                .map(ToString::to_string),
            Some(InfoEntry::List(_)) => {
                tracing::info!(manager = %manager_name, "manager info is not a single record");
                return Ok(());
            }
        };
        if known.as_deref() == Some(manager_name.as_str()) {
            return Ok(());
        }
        tracing::info!(manager = %manager_name, "refreshing manager");
        if let Some(manager) = self.ctx.store.identity_by_name(&manager_name)? {
            self.expanded().set_manager(model, &manager);
        }
        Ok(())
    }

    fn expanded(&self) -> Self {
        Self {
            ctx: self.ctx,
            options: self.options.with_expand_identity(true),
        }
    }

    fn append_assigned_roles(
        &self,
        model: &mut MapModel,
        identity: &Identity,
        identity_id: &str,
    ) -> Result<()> {
        let columns = ASSIGNED_ROLES.relation_columns();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        let rows = self.ctx.store.search(
            ObjectClass::Identity,
            &Filter::eq(ATTR_ID, identity_id),
            &columns,
        )?;

        let mut names = Vec::new();
        let mut records = Vec::new();
        for row in rows {
            let mut row = row.into_iter();
            let (Some(Value::String(name)), Some(Value::String(role_id))) = (row.next(), row.next())
            else {
                continue;
            };
            if self.options.expand_identity {
                records.push(assignment_record(identity, &name, &role_id));
            }
            names.push(name);
        }

        if !names.is_empty() {
            model.set_field(ATTR_ASSIGNED_ROLES, Value::strings(names));
            if !records.is_empty() {
                model.info.insert(ATTR_ASSIGNED_ROLES, InfoEntry::List(records));
            }
        }
        Ok(())
    }

    fn append_links(&self, model: &mut MapModel, identity: &Identity) -> Result<()> {
        if !self.options.expand_links {
            return Ok(());
        }
        let Some(id) = identity.id.as_deref() else {
            return Ok(());
        };
        let transformer = LinkTransformer::new(self.ctx, self.options);
        let links = self
            .ctx
            .store
            .links_for_identity(id)?
            .iter()
            .map(|link| transformer.to_map(link))
            .collect::<Result<Vec<_>>>()?;
        model.set_children(ATTR_LINKS, links);
        Ok(())
    }
}

/// Info record of the first assignment of a role
fn assignment_record(identity: &Identity, name: &str, role_id: &str) -> InfoRecord {
    let mut record = InfoRecord::new();
    record.insert(ATTR_ID.into(), Value::from(role_id));
    record.insert(ATTR_NAME.into(), Value::from(name));
    if let Some(ra) = identity.role_assignment(role_id) {
        record.insert("startDate".into(), ra.start_date.into());
        record.insert("endDate".into(), ra.end_date.into());
        record.insert("assigner".into(), ra.assigner.clone().into());
        record.insert("source".into(), ra.source.clone().into());
        record.insert("date".into(), ra.date.into());
        record.insert("negative".into(), Value::Bool(ra.negative));
    }
    record.retain(|_, v| !v.is_null());
    record
}

/// Per-field request generation for one identity operation
struct AttributeDiff<'c, 'a> {
    ctx: &'c Context<'a>,
    op: &'c mut ChangeOperation,
    edited: &'c MapModel,
    baseline: &'c MapModel,
}

impl AttributeDiff<'_, '_> {
    /// Emit requests for `key` when the edited value differs
    ///
    /// Multi-valued fields with `add<Key>` / `remove<Key>` siblings emit Add
    /// and Remove requests from those instead of a whole-list Set. The first
    /// request recorded for a key wins.
    fn request(&mut self, key: &str, attr_type: Option<AttributeType>, multi: bool) -> Result<()> {
        if multi {
            if let Some(edit) = self.edited.granular(key) {
                for (op, values) in [(AttributeOp::Add, edit.add), (AttributeOp::Remove, edit.remove)]
                {
                    if values.is_empty() {
                        continue;
                    }
                    let value = coerce(self.ctx, key, attr_type, Value::List(values))?;
                    if value.is_empty() {
                        continue;
                    }
                    self.op.push(
                        AttributeChangeRequest::new(key, op, value).with_type(attr_type),
                    );
                }
                return Ok(());
            }
        }

        let mut edited = self.edited.field(key).cloned();
        if key == ATTR_NAME {
            edited = edited.map(|v| match v {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            });
        }
        if !changed(self.baseline.field(key), edited.as_ref()) {
            return Ok(());
        }
        tracing::debug!(attribute = key, "attribute changed");

        let value = coerce(self.ctx, key, attr_type, edited.unwrap_or_default())?;
        self.op
            .push_if_absent(AttributeChangeRequest::set(key, value).with_type(attr_type));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_model::{ObjectAttribute, ObjectConfig};
    use mm_store::{AesGcmEncryptor, Bundle, Capability, InMemoryStore, RoleAssignment};

    struct Fixture {
        store: InMemoryStore,
        config: ObjectConfig,
        encryptor: AesGcmEncryptor,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
                config: ObjectConfig::new("Identity")
                    .with_attribute(ObjectAttribute::new("email").editable().standard())
                    .with_attribute(ObjectAttribute::new("department"))
                    .with_attribute(ObjectAttribute::new("sponsor").identity_ref())
                    .with_attribute(ObjectAttribute::new("internalId").system()),
                encryptor: AesGcmEncryptor::generate(),
            }
        }

        fn transformer(&self, options: TransformOptions) -> IdentityTransformer<'_> {
            IdentityTransformer::new(
                Context::new(&self.store, &self.config, &self.encryptor),
                options,
            )
        }
    }

    #[test]
    fn to_map_renders_config_attributes() {
        let f = Fixture::new();
        let sponsor = f.store.insert(Identity::new("sam")).unwrap();
        let mut identity = Identity::new("jdoe");
        identity.attributes.insert("email".into(), Value::from("j@x"));
        identity.attributes.insert("sponsor".into(), Value::from(sponsor.as_str()));
        identity.attributes.insert("internalId".into(), Value::from("secret"));
        let id = f.store.insert(identity).unwrap();
        let identity = f.store.identity_by_id(&id).unwrap().unwrap();

        let model = f.transformer(TransformOptions::new()).to_map(&identity).unwrap();
        assert_eq!(model.field_str("email"), Some("j@x"));
        assert_eq!(model.field_str("sponsor"), Some("sam"));
        assert_eq!(model.field("internalId"), None);
        assert_eq!(model.sys_str("id"), Some(id.as_str()));
        assert!(model.info.is_empty());
    }

    #[test]
    fn to_map_expanded_carries_info() {
        let f = Fixture::new();
        let cap = f
            .store
            .insert(Capability {
                name: "HelpDesk".into(),
                ..Capability::default()
            })
            .unwrap();
        let role = f
            .store
            .insert(Bundle {
                name: "Engineer".into(),
                ..Bundle::default()
            })
            .unwrap();
        let manager = f.store.insert(Identity::new("boss")).unwrap();
        let mut identity = Identity::new("jdoe");
        identity.capabilities = vec![cap];
        identity.manager = Some(manager.clone());
        let mut ra = RoleAssignment::new(role.as_str());
        ra.assigner = Some("boss".into());
        identity.role_assignments = vec![ra];
        let id = f.store.insert(identity).unwrap();
        let identity = f.store.identity_by_id(&id).unwrap().unwrap();

        let model = f
            .transformer(TransformOptions::expanded())
            .to_map(&identity)
            .unwrap();
        assert_eq!(model.field("capabilities"), Some(&Value::strings(["HelpDesk"])));
        assert_eq!(model.field("assignedRoles"), Some(&Value::strings(["Engineer"])));
        assert_eq!(model.field_str("manager"), Some("boss"));
        let info = model.info.list("assignedRoles");
        assert_eq!(info[0].get("assigner"), Some(&Value::from("boss")));
        let Some(InfoEntry::Single(mgr)) = model.info.get("manager") else {
            panic!("manager info missing");
        };
        assert_eq!(mgr.get("id"), Some(&Value::from(manager.as_str())));
        assert_eq!(model.info.list("objectConfig").len(), 4);
    }

    #[test]
    fn create_emits_name_and_non_editable_attributes() {
        let f = Fixture::new();
        let mut model = MapModel::new();
        model.set_field("name", "  newbie ");
        model.set_field("department", "R&D");
        let plan = f
            .transformer(TransformOptions::new())
            .map_to_plan(&model)
            .unwrap()
            .unwrap();
        let op = &plan.operations[0];
        assert_eq!(op.kind, OperationKind::Create);
        assert_eq!(op.request("name").unwrap().value, Value::from("newbie"));
        assert_eq!(op.request("department").unwrap().value, Value::from("R&D"));
        assert_eq!(plan.identity.as_deref(), Some("newbie"));
    }

    #[test]
    fn modify_skips_non_editable_attributes() {
        let f = Fixture::new();
        let id = f.store.insert(Identity::new("jdoe")).unwrap();
        let identity = f.store.identity_by_id(&id).unwrap().unwrap();
        let t = f.transformer(TransformOptions::new());
        let mut model = t.to_map(&identity).unwrap();
        model.set_field("department", "R&D");
        assert_eq!(t.map_to_plan(&model).unwrap(), None);
    }

    #[test]
    fn missing_name_rejected() {
        let f = Fixture::new();
        let err = f
            .transformer(TransformOptions::new())
            .map_to_plan(&MapModel::new())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn password_is_encrypted() {
        let f = Fixture::new();
        let id = f.store.insert(Identity::new("jdoe")).unwrap();
        let identity = f.store.identity_by_id(&id).unwrap().unwrap();
        let t = f.transformer(TransformOptions::new());
        let mut model = t.to_map(&identity).unwrap();
        model.set_field("password", "hunter2");
        let plan = t.map_to_plan(&model).unwrap().unwrap();
        let request = plan.operations[0].request("password").unwrap();
        let Value::String(cipher) = &request.value else {
            panic!("secret must be a string");
        };
        assert_ne!(cipher, "hunter2");
        assert_eq!(f.encryptor.decrypt(cipher).unwrap(), "hunter2");
        assert_eq!(request.value_type, Some(AttributeType::Secret));
    }

    #[test]
    fn first_request_for_a_key_wins() {
        let f = Fixture {
            config: ObjectConfig::new("Identity")
                .with_attribute(ObjectAttribute::new("protected").editable()),
            ..Fixture::new()
        };
        let id = f.store.insert(Identity::new("jdoe")).unwrap();
        let identity = f.store.identity_by_id(&id).unwrap().unwrap();
        let t = f.transformer(TransformOptions::new());
        let mut model = t.to_map(&identity).unwrap();
        model.set_field("protected", "yes");
        let plan = t.map_to_plan(&model).unwrap().unwrap();
        let requests: Vec<_> = plan.operations[0]
            .requests
            .iter()
            .filter(|r| r.name == "protected")
            .collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].value, Value::from("yes"));
        assert_eq!(requests[0].value_type, None);
    }

    #[test]
    fn refresh_manager_only_when_renamed() {
        let f = Fixture::new();
        f.store.insert(Identity::new("boss")).unwrap();
        let t = f.transformer(TransformOptions::new());
        let mut model = MapModel::new();
        model.set_field("manager", "boss");
        let model = t.refresh(model).unwrap();
        let Some(InfoEntry::Single(record)) = model.info.get("manager") else {
            panic!("manager info missing");
        };
        assert_eq!(record.get("name"), Some(&Value::from("boss")));

        let mut model = model;
        model.fields.remove("manager");
        let model = t.refresh(model).unwrap();
        assert!(model.info.get("manager").is_none());
    }
}
