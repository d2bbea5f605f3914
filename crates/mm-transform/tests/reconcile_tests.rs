use mm_model::{AttributeOp, AttributeType, MapModel, OperationKind, Value, APP_IIQ};
use mm_store::{AesGcmEncryptor, Identity, InMemoryStore, ObjectClass, ObjectStoreExt};
use mm_test_utils::{identity_config, seeded_store, test_encryptor, Seeded};
use mm_transform::{
    CoercionError, Context, IdentityTransformer, ReconcileError, TransformOptions, ValidationError,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

struct World {
    store: InMemoryStore,
    ids: Seeded,
    config: mm_model::ObjectConfig,
    encryptor: AesGcmEncryptor,
}

impl World {
    fn new() -> Self {
        let (store, ids) = seeded_store();
        Self {
            store,
            ids,
            config: identity_config(),
            encryptor: test_encryptor(),
        }
    }

    fn transformer(&self, options: TransformOptions) -> IdentityTransformer<'_> {
        IdentityTransformer::new(
            Context::new(&self.store, &self.config, &self.encryptor),
            options,
        )
    }

    fn jdoe_model(&self, options: TransformOptions) -> MapModel {
        let jdoe = self.store.identity_by_id(&self.ids.jdoe).unwrap().unwrap();
        self.transformer(options).to_map(&jdoe).unwrap()
    }
}

#[test]
fn test_unedited_model_yields_no_plan() {
    let world = World::new();
    for options in [TransformOptions::new(), TransformOptions::expanded()] {
        let model = world.jdoe_model(options);
        assert_eq!(world.transformer(options).map_to_plan(&model).unwrap(), None);
    }
}

#[test]
fn test_json_round_trip_yields_no_plan() {
    let world = World::new();
    let options = TransformOptions::expanded();
    let json = serde_json::to_string(&world.jdoe_model(options)).unwrap();
    let model: MapModel = serde_json::from_str(&json).unwrap();
    assert_eq!(world.transformer(options).map_to_plan(&model).unwrap(), None);
}

#[test]
fn test_to_map_shape() {
    let world = World::new();
    let model = world.jdoe_model(TransformOptions::expanded());

    assert_eq!(model.sys_str("id"), Some(world.ids.jdoe.as_str()));
    assert_eq!(model.field_str("name"), Some("jdoe"));
    assert_eq!(model.field_str("manager"), Some("boss"));
    assert_eq!(model.field_str("sponsor"), Some("boss"));
    assert_eq!(model.field("internalId"), None);
    assert_eq!(model.field("capabilities"), Some(&Value::strings(["HelpDesk"])));
    assert_eq!(model.field("detectedRoles"), Some(&Value::strings(["Engineer"])));
    assert_eq!(model.field("assignedRoles"), Some(&Value::strings(["Engineer"])));
    assert_eq!(model.field("workgroups"), Some(&Value::strings(["Admins"])));
    assert_eq!(
        model.field("controlledScopes"),
        Some(&Value::strings([world.ids.americas.as_str()]))
    );
    assert_eq!(model.field_str("assignedScope"), Some(world.ids.americas.as_str()));

    let detected = model.info.list("detectedRoles");
    assert_eq!(detected[0].get("displayName"), Some(&Value::from("Engineering")));
    let assigned = model.info.list("assignedRoles");
    assert_eq!(assigned[0].get("source"), Some(&Value::from("UI")));
    assert_eq!(model.children("links").len(), 1);
    assert_eq!(
        model.info.list("objectConfig").len(),
        world.config.attributes.len()
    );
}

#[test]
fn test_unexpanded_model_has_no_info() {
    let world = World::new();
    let model = world.jdoe_model(TransformOptions::new());
    assert!(model.info.is_empty());
    assert!(model.children.is_empty());
    assert_eq!(model.field_str("manager"), Some("boss"));
}

#[test]
fn test_scalar_edit_yields_single_set() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("email", "john@example.com");

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    assert_eq!(plan.identity.as_deref(), Some("jdoe"));
    assert_eq!(plan.operations.len(), 1);
    let op = &plan.operations[0];
    assert_eq!(op.application, APP_IIQ);
    assert_eq!(op.kind, OperationKind::Modify);
    assert_eq!(op.native_identity.as_deref(), Some("jdoe"));
    assert_eq!(op.requests.len(), 1);
    assert_eq!(op.requests[0].name, "email");
    assert_eq!(op.requests[0].op, AttributeOp::Set);
    assert_eq!(op.requests[0].value, Value::from("john@example.com"));
}

#[test]
fn test_date_edit_coerced_from_millis() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("hireDate", Value::Int(1_700_000_000_000));

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let request = plan.operations[0].request("hireDate").unwrap();
    assert_eq!(request.value, Value::from_millis(1_700_000_000_000).unwrap());
    assert_eq!(request.value_type, Some(AttributeType::Date));

    model.set_field("hireDate", "2023-11-14");
    let err = t.map_to_plan(&model).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Coercion(CoercionError::AmbiguousDate { .. })
    ));
}

#[test]
fn test_reference_edit_resolves_ids() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field(
        "capabilities",
        Value::strings([world.ids.helpdesk.as_str(), world.ids.auditor.as_str()]),
    );
    model.set_field("manager", world.ids.admins.as_str());

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let op = &plan.operations[0];
    assert_eq!(
        op.request("capabilities").unwrap().value,
        Value::strings(["HelpDesk", "Auditor"])
    );
    assert_eq!(op.request("manager").unwrap().value, Value::from("Admins"));
}

#[test]
fn test_granular_keys_take_precedence() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("capabilities", Value::strings(["Ignored"]));
    model.set_field("addCapabilities", Value::strings(["Auditor"]));
    model.set_field(
        "removeCapabilities",
        Value::strings([world.ids.helpdesk.as_str()]),
    );

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let requests: Vec<_> = plan.operations[0]
        .requests
        .iter()
        .filter(|r| r.name == "capabilities")
        .map(|r| (r.op, r.value.clone()))
        .collect();
    assert_eq!(
        requests,
        vec![
            (AttributeOp::Add, Value::strings(["Auditor"])),
            (AttributeOp::Remove, Value::strings(["HelpDesk"])),
        ]
    );
}

#[test]
fn test_granular_role_keys_take_precedence() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("assignedRoles", Value::strings(["Ignored"]));
    model.set_field("addAssignedRoles", Value::strings(["Architect"]));
    model.set_field("removeAssignedRoles", Value::strings(["Engineer"]));

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let requests: Vec<_> = plan.operations[0]
        .requests
        .iter()
        .filter(|r| r.name == "assignedRoles")
        .map(|r| (r.op, r.value.clone()))
        .collect();
    assert_eq!(
        requests,
        vec![
            (AttributeOp::Add, Value::strings(["Architect"])),
            (AttributeOp::Remove, Value::strings(["Engineer"])),
        ]
    );
}

#[test]
fn test_granular_fallback_to_raw_key() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.fields.insert("addCostCenters".into(), Value::Null);
    model.set_field("addcostCenters", Value::strings(["CC-1"]));

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let request = plan.operations[0].request("costCenters").unwrap();
    assert_eq!(request.op, AttributeOp::Add);
    assert_eq!(request.value, Value::strings(["CC-1"]));
}

#[test]
fn test_duplicate_name_rejected() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let before = world.store.len(ObjectClass::Identity);

    for name in ["jdoe", " jdoe ", world.ids.boss.as_str()] {
        let mut model = MapModel::new();
        model.set_field("name", name);
        let err = t.map_to_plan(&model).unwrap_err();
        assert!(
            matches!(err, ReconcileError::Validation(ValidationError::DuplicateName { .. })),
            "{name} should be rejected"
        );
    }
    assert_eq!(world.store.len(ObjectClass::Identity), before);

    let mut model = MapModel::new();
    model.set_field("name", "newbie");
    let plan = t.map_to_plan(&model).unwrap().unwrap();
    assert_eq!(plan.operations[0].kind, OperationKind::Create);
}

#[test]
fn test_create_writes_read_only_attributes() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = MapModel::new();
    model.set_field("name", "newbie");
    model.set_field("department", "Sales");
    model.set_field("internalId", "ignored");

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let op = &plan.operations[0];
    assert_eq!(op.request("name").unwrap().value, Value::from("newbie"));
    assert_eq!(op.request("department").unwrap().value, Value::from("Sales"));
    assert!(op.request("internalId").is_none());
}

#[test]
fn test_link_changes_merge_into_identity_plan() {
    let world = World::new();
    let options = TransformOptions::expanded();
    let t = world.transformer(options);
    let mut model = world.jdoe_model(options);
    let mut links = model.children("links").to_vec();
    links[0].set_field("mail", "john@example.com");
    model.set_children("links", links);

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    assert_eq!(plan.identity.as_deref(), Some("jdoe"));
    assert_eq!(plan.operations.len(), 1);
    let op = &plan.operations[0];
    assert_eq!(op.application, "LDAP");
    assert_eq!(op.native_identity.as_deref(), Some("cn=jdoe,ou=people"));
    assert_eq!(op.request("mail").unwrap().value, Value::from("john@example.com"));
}

#[test]
fn test_password_encrypted_with_configured_key() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("password", "hunter2");

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let cipher = plan.operations[0].request("password").unwrap().value.clone();
    let cipher = cipher.as_str().unwrap();
    assert_eq!(test_encryptor().decrypt(cipher).unwrap(), "hunter2");
}

#[test]
fn test_numeric_password_is_encrypted() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("password", Value::Int(123_456));

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    let cipher = plan.operations[0].request("password").unwrap().value.clone();
    let cipher = cipher.as_str().unwrap();
    assert_ne!(cipher, "123456");
    assert_eq!(test_encryptor().decrypt(cipher).unwrap(), "123456");

    model.set_field("password", Value::strings(["hunter2"]));
    let err = t.map_to_plan(&model).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Coercion(CoercionError::InvalidSecret { .. })
    ));
}

#[test]
fn test_rename_targets_stored_identity() {
    let world = World::new();
    let t = world.transformer(TransformOptions::new());
    let mut model = world.jdoe_model(TransformOptions::new());
    model.set_field("name", "john");
    model.set_field("email", "john@example.com");

    let plan = t.map_to_plan(&model).unwrap().unwrap();
    assert_eq!(plan.identity.as_deref(), Some("jdoe"));
    let op = &plan.operations[0];
    assert_eq!(op.kind, OperationKind::Modify);
    assert_eq!(op.native_identity.as_deref(), Some("jdoe"));
    assert_eq!(op.request("email").unwrap().value, Value::from("john@example.com"));
    assert!(op.request("name").is_none());
}

proptest! {
    #[test]
    fn prop_stored_identity_round_trips_to_no_plan(
        name in "[a-z][a-z0-9]{2,12}",
        firstname in proptest::option::of("[A-Za-z ]{1,16}"),
        email in proptest::option::of("[a-z]{1,8}@[a-z]{1,8}\\.com"),
        protected in any::<bool>(),
    ) {
        let store = InMemoryStore::new();
        let config = identity_config();
        let encryptor = test_encryptor();
        let mut identity = Identity {
            firstname,
            protected,
            ..Identity::new(name)
        };
        if let Some(email) = email {
            identity.attributes.insert("email".into(), Value::from(email));
        }
        let id = store.insert(identity).unwrap();
        let identity = store.identity_by_id(&id).unwrap().unwrap();

        let t = IdentityTransformer::new(
            Context::new(&store, &config, &encryptor),
            TransformOptions::expanded(),
        );
        let model = t.to_map(&identity).unwrap();
        prop_assert_eq!(t.map_to_plan(&model).unwrap(), None);
    }
}
