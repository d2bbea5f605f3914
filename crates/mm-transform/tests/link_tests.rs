use mm_model::{
    AttributeDefinition, AttributeOp, AttributeType, InfoEntry, MapModel, ObjectConfig,
    OperationKind, Value,
};
use mm_store::{
    AesGcmEncryptor, Application, InMemoryStore, Link, ObjectStoreExt, StaticAccountDirectory,
    FEATURE_NO_RANDOM_ACCESS,
};
use mm_test_utils::{identity_config, ldap_schema, seeded_store, test_encryptor, Seeded, LDAP};
use mm_transform::{
    Context, LinkTransformer, ReconcileError, SchemaError, TransformOptions, TransformerKind,
    TransformerRegistry, ValidationError,
};
use pretty_assertions::assert_eq;

struct World {
    store: InMemoryStore,
    ids: Seeded,
    config: ObjectConfig,
    encryptor: AesGcmEncryptor,
    accounts: StaticAccountDirectory,
}

impl World {
    fn new() -> Self {
        let (store, ids) = seeded_store();
        Self {
            store,
            ids,
            config: identity_config(),
            encryptor: test_encryptor(),
            accounts: StaticAccountDirectory::new().with_account(LDAP, "cn=taken,ou=people"),
        }
    }

    fn transformer(&self, options: TransformOptions) -> LinkTransformer<'_> {
        LinkTransformer::new(
            Context::new(&self.store, &self.config, &self.encryptor).with_accounts(&self.accounts),
            options,
        )
    }

    fn link_model(&self) -> MapModel {
        let link = self.store.link_by_id(&self.ids.link).unwrap().unwrap();
        self.transformer(TransformOptions::new()).to_map(&link).unwrap()
    }

    fn plan_kind(&self, model: &MapModel) -> Option<OperationKind> {
        self.transformer(TransformOptions::new())
            .map_to_plan(model)
            .unwrap()
            .map(|plan| plan.operations[0].kind)
    }
}

fn new_account(native: &str) -> MapModel {
    let mut model = MapModel::new();
    model.set_sys("application", LDAP);
    model.set_sys("identity", "jdoe");
    model.set_field("dn", native);
    model.set_field("mail", "new@example.com");
    model
}

#[test]
fn test_to_map_shape() {
    let world = World::new();
    let model = world.link_model();

    assert_eq!(model.sys_str("id"), Some(world.ids.link.as_str()));
    assert_eq!(model.sys_str("nativeIdentity"), Some("cn=jdoe,ou=people"));
    assert_eq!(model.sys_str("identity"), Some("jdoe"));
    assert_eq!(model.sys_str("identityDisplayName"), Some("John Doe"));
    assert_eq!(model.sys_str("application"), Some(LDAP));
    assert_eq!(model.sys("disabled"), Some(&Value::Bool(false)));
    assert_eq!(model.field("groups"), Some(&Value::strings(["staff", "dev"])));

    let Some(InfoEntry::Single(app)) = model.info.get("application") else {
        panic!("application info missing");
    };
    assert_eq!(app.get("owner"), Some(&Value::from("boss")));
    assert_eq!(app.get("type"), Some(&Value::from("LDAP")));
}

#[test]
fn test_unedited_link_yields_no_plan() {
    let world = World::new();
    assert_eq!(world.plan_kind(&world.link_model()), None);
}

#[test]
fn test_disable_collapses_to_lifecycle_operation() {
    let world = World::new();
    let mut model = world.link_model();
    model.set_sys("disabled", true);

    let plan = world
        .transformer(TransformOptions::new())
        .map_to_plan(&model)
        .unwrap()
        .unwrap();
    assert_eq!(plan.operations[0].kind, OperationKind::Disable);
    assert!(plan.operations[0].requests.is_empty());
}

#[test]
fn test_enable_and_unlock_collapse() {
    let world = World::new();
    let mut link = world.store.link_by_id(&world.ids.link).unwrap().unwrap();
    link.disabled = true;
    link.locked = true;
    world.store.put(link).unwrap();

    let mut model = world.link_model();
    model.set_sys("disabled", false);
    assert_eq!(world.plan_kind(&model), Some(OperationKind::Enable));

    let mut model = world.link_model();
    model.set_sys("locked", "no");
    assert_eq!(world.plan_kind(&model), Some(OperationKind::Unlock));
}

#[test]
fn test_toggle_with_other_changes_stays_modify() {
    let world = World::new();
    let mut model = world.link_model();
    model.set_sys("disabled", true);
    model.set_field("mail", "other@example.com");

    let plan = world
        .transformer(TransformOptions::new())
        .map_to_plan(&model)
        .unwrap()
        .unwrap();
    let op = &plan.operations[0];
    assert_eq!(op.kind, OperationKind::Modify);
    assert_eq!(op.request("IIQDisabled").unwrap().value, Value::Bool(true));
    assert_eq!(op.request("mail").unwrap().value, Value::from("other@example.com"));
}

#[test]
fn test_link_password_is_encrypted() {
    let world = World::new();
    let mut model = world.link_model();
    model.set_field("password", "hunter2");

    let plan = world
        .transformer(TransformOptions::new())
        .map_to_plan(&model)
        .unwrap()
        .unwrap();
    let cipher = plan.operations[0].request("password").unwrap().value.clone();
    let cipher = cipher.as_str().unwrap();
    assert_ne!(cipher, "hunter2");
    assert_eq!(world.encryptor.decrypt(cipher).unwrap(), "hunter2");
}

#[test]
fn test_secret_schema_attribute_is_encrypted() {
    let world = World::new();
    let mut app = world.store.application_by_name(LDAP).unwrap().unwrap();
    if let Some(schema) = app.account_schema.as_mut() {
        schema
            .attributes
            .push(AttributeDefinition::new("pin").with_type(AttributeType::Secret));
    }
    world.store.put(app).unwrap();

    let mut model = world.link_model();
    model.set_field("pin", "0000");
    let plan = world
        .transformer(TransformOptions::new())
        .map_to_plan(&model)
        .unwrap()
        .unwrap();
    let request = plan.operations[0].request("pin").unwrap();
    assert_eq!(request.value_type, Some(AttributeType::Secret));
    let cipher = request.value.as_str().unwrap();
    assert_ne!(cipher, "0000");
    assert_eq!(world.encryptor.decrypt(cipher).unwrap(), "0000");
}

#[test]
fn test_granular_groups_suppress_list_diff() {
    let world = World::new();
    let mut model = world.link_model();
    model.set_field("groups", Value::strings(["ignored"]));
    model.set_field("removeGroups", Value::strings(["dev"]));

    let plan = world
        .transformer(TransformOptions::new())
        .map_to_plan(&model)
        .unwrap()
        .unwrap();
    let requests: Vec<_> = plan.operations[0]
        .requests
        .iter()
        .map(|r| (r.name.as_str(), r.op, r.value.clone()))
        .collect();
    assert_eq!(
        requests,
        vec![("groups", AttributeOp::Remove, Value::strings(["dev"]))]
    );
}

#[test]
fn test_unknown_keys_skipped() {
    let world = World::new();
    let mut model = world.link_model();
    model.set_field("favouriteColour", "green");
    assert_eq!(world.plan_kind(&model), None);
}

#[test]
fn test_create_resolves_owner_and_native_identity() {
    let world = World::new();
    let plan = world
        .transformer(TransformOptions::new())
        .map_to_plan(&new_account("cn=new,ou=people"))
        .unwrap()
        .unwrap();
    assert_eq!(plan.identity.as_deref(), Some("jdoe"));
    let op = &plan.operations[0];
    assert_eq!(op.kind, OperationKind::Create);
    assert_eq!(op.native_identity.as_deref(), Some("cn=new,ou=people"));
    assert!(op.request("dn").is_none());
    assert_eq!(op.request("mail").unwrap().value, Value::from("new@example.com"));
}

#[test]
fn test_create_of_existing_account_rejected() {
    let world = World::new();
    let checked = world.transformer(TransformOptions::new().with_check_account_exists(true));

    let err = checked
        .map_to_plan(&new_account("cn=taken,ou=people"))
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Validation(ValidationError::AccountExists { .. })
    ));
    assert!(checked.map_to_plan(&new_account("cn=free,ou=people")).is_ok());
}

#[test]
fn test_no_random_access_skips_existence_check() {
    let world = World::new();
    let mut app = world.store.application_by_name(LDAP).unwrap().unwrap();
    app.features.push(FEATURE_NO_RANDOM_ACCESS.into());
    world.store.put(app).unwrap();

    let checked = world.transformer(TransformOptions::new().with_check_account_exists(true));
    assert!(checked.map_to_plan(&new_account("cn=taken,ou=people")).is_ok());
}

#[test]
fn test_schema_errors() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());

    let err = t.map_to_plan(&MapModel::new()).unwrap_err();
    assert!(matches!(err, ReconcileError::Schema(SchemaError::MissingApplication)));

    world.store.insert(Application::new("Flat")).unwrap();
    let mut model = MapModel::new();
    model.set_sys("application", "Flat");
    let err = t.map_to_plan(&model).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Schema(SchemaError::MissingAccountSchema { .. })
    ));
}

#[test]
fn test_operation_override_after_normalize() {
    let world = World::new();
    let mut model = world.link_model();
    model.set_sys("disabled", true);
    model.set_sys("operation", "Delete");
    assert_eq!(world.plan_kind(&model), Some(OperationKind::Delete));

    let mut model = world.link_model();
    model.set_sys("operation", "Delete");
    assert_eq!(world.plan_kind(&model), None);
}

#[test]
fn test_registry_builds_link_transformer() {
    let world = World::new();
    let registry = TransformerRegistry::with_defaults();
    let t = registry
        .create(
            TransformerKind::Link,
            Context::new(&world.store, &world.config, &world.encryptor),
            TransformOptions::new(),
        )
        .unwrap();

    let link: Link = world.store.link_by_id(&world.ids.link).unwrap().unwrap();
    let model = t.to_map(link.into()).unwrap();
    assert_eq!(model, world.link_model());
    assert!(t.map_to_plan(&model).unwrap().is_none());
}

#[test]
fn test_schema_fixture_declares_identity_attribute() {
    assert_eq!(ldap_schema().identity_attribute.as_deref(), Some("dn"));
}
