//! Testing utilities for the map model workspace
//!
//! Shared fixtures and a store wrapper that records projection queries.

#![allow(missing_docs)]

use mm_model::{
    AccountSchema, AttributeDefinition, AttributeType, ObjectAttribute, ObjectConfig, Value,
};
use mm_store::{
    AesGcmEncryptor, Application, Bundle, Capability, Filter, Identity, InMemoryStore, Link,
    ObjectClass, ObjectStore, RoleAssignment, Row, Scope, StoreError, StoredObject,
};
use parking_lot::Mutex;

/// Fixed key so ciphertexts can be decrypted across fixtures
pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub const LDAP: &str = "LDAP";

pub fn test_encryptor() -> AesGcmEncryptor {
    AesGcmEncryptor::from_hex(TEST_KEY_HEX).unwrap()
}

/// Identity attributes: editable `email`, read-only `department`,
/// multi-valued editable `costCenters`, identity-reference `sponsor`,
/// system `internalId`
pub fn identity_config() -> ObjectConfig {
    ObjectConfig::new("Identity")
        .with_attribute(
            ObjectAttribute::new("email")
                .with_display_name("Email")
                .editable()
                .standard(),
        )
        .with_attribute(ObjectAttribute::new("department").with_display_name("Department"))
        .with_attribute(ObjectAttribute::new("costCenters").multi().editable())
        .with_attribute(ObjectAttribute::new("sponsor").identity_ref())
        .with_attribute(ObjectAttribute::new("hireDate").with_type(AttributeType::Date).editable())
        .with_attribute(ObjectAttribute::new("internalId").system())
}

/// Account schema keyed by `dn`, with single-valued `mail` and
/// multi-valued `groups`
pub fn ldap_schema() -> AccountSchema {
    AccountSchema::new()
        .with_identity_attribute("dn")
        .with_display_attribute("cn")
        .with_attribute(AttributeDefinition::new("dn"))
        .with_attribute(AttributeDefinition::new("mail"))
        .with_attribute(AttributeDefinition::new("groups").multi())
}

pub fn ldap_application() -> Application {
    Application {
        app_type: Some("LDAP".into()),
        connector: Some("sailpoint.connector.LDAPConnector".into()),
        features: vec!["PROVISIONING".into(), "ENABLE".into(), "UNLOCK".into()],
        owner: Some("boss".into()),
        account_schema: Some(ldap_schema()),
        ..Application::new(LDAP)
    }
}

/// Ids of the objects in a [`seeded_store`]
#[derive(Debug, Clone)]
pub struct Seeded {
    pub jdoe: String,
    pub boss: String,
    pub admins: String,
    pub helpdesk: String,
    pub auditor: String,
    pub engineer: String,
    pub architect: String,
    pub americas: String,
    pub emea: String,
    pub link: String,
}

/// Store holding `jdoe` (managed by `boss`, member of workgroup `Admins`),
/// two capabilities, two roles, two scopes and one LDAP account of `jdoe`
pub fn seeded_store() -> (InMemoryStore, Seeded) {
    let store = InMemoryStore::new();
    store.insert(ldap_application()).unwrap();

    let helpdesk = store
        .insert(Capability {
            name: "HelpDesk".into(),
            display_name: Some("Help Desk".into()),
            ..Capability::default()
        })
        .unwrap();
    let auditor = store
        .insert(Capability {
            name: "Auditor".into(),
            ..Capability::default()
        })
        .unwrap();
    let engineer = store
        .insert(Bundle {
            name: "Engineer".into(),
            displayable_name: Some("Engineering".into()),
            ..Bundle::default()
        })
        .unwrap();
    let architect = store
        .insert(Bundle {
            name: "Architect".into(),
            ..Bundle::default()
        })
        .unwrap();
    let americas = store
        .insert(Scope {
            name: "Americas".into(),
            ..Scope::default()
        })
        .unwrap();
    let emea = store
        .insert(Scope {
            name: "EMEA".into(),
            ..Scope::default()
        })
        .unwrap();

    let boss = store
        .insert(Identity {
            display_name: Some("The Boss".into()),
            ..Identity::new("boss")
        })
        .unwrap();
    let admins = store
        .insert(Identity {
            workgroup: true,
            ..Identity::new("Admins")
        })
        .unwrap();

    let mut jdoe = Identity {
        display_name: Some("John Doe".into()),
        firstname: Some("John".into()),
        lastname: Some("Doe".into()),
        manager: Some(boss.clone()),
        capabilities: vec![helpdesk.clone()],
        bundles: vec![engineer.clone()],
        role_assignments: vec![RoleAssignment {
            assigner: Some("boss".into()),
            source: Some("UI".into()),
            ..RoleAssignment::new(engineer.as_str())
        }],
        workgroups: vec![admins.clone()],
        controlled_scopes: vec![americas.clone()],
        assigned_scope: Some(americas.clone()),
        ..Identity::new("jdoe")
    };
    jdoe.attributes.insert("email".into(), Value::from("jdoe@example.com"));
    jdoe.attributes.insert("department".into(), Value::from("Engineering"));
    jdoe.attributes.insert("sponsor".into(), Value::from(boss.as_str()));
    jdoe.attributes.insert("internalId".into(), Value::from("x-17"));
    let jdoe = store.insert(jdoe).unwrap();

    let mut link = Link {
        identity: Some(jdoe.clone()),
        display_name: Some("John Doe".into()),
        ..Link::new(LDAP, "cn=jdoe,ou=people")
    };
    link.attributes
        .insert("dn".into(), Value::from("cn=jdoe,ou=people"));
    link.attributes
        .insert("mail".into(), Value::from("jdoe@example.com"));
    link.attributes
        .insert("groups".into(), Value::strings(["staff", "dev"]));
    let link = store.insert(link).unwrap();

    let seeded = Seeded {
        jdoe,
        boss,
        admins,
        helpdesk,
        auditor,
        engineer,
        architect,
        americas,
        emea,
        link,
    };
    (store, seeded)
}

/// One `search` call seen by a [`RecordingStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSearch {
    pub class: ObjectClass,
    pub filter: Filter,
    pub columns: Vec<String>,
}

/// Store wrapper that records every `search`
#[derive(Debug)]
pub struct RecordingStore<S> {
    inner: S,
    searches: Mutex<Vec<RecordedSearch>>,
}

impl<S: ObjectStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().clone()
    }

    pub fn clear(&self) {
        self.searches.lock().clear();
    }
}

impl<S: ObjectStore> ObjectStore for RecordingStore<S> {
    fn get_by_id(&self, class: ObjectClass, id: &str) -> Result<Option<StoredObject>, StoreError> {
        self.inner.get_by_id(class, id)
    }

    fn get_by_name(
        &self,
        class: ObjectClass,
        name: &str,
    ) -> Result<Option<StoredObject>, StoreError> {
        self.inner.get_by_name(class, name)
    }

    fn count(&self, class: ObjectClass, filter: &Filter) -> Result<usize, StoreError> {
        self.inner.count(class, filter)
    }

    fn search(
        &self,
        class: ObjectClass,
        filter: &Filter,
        columns: &[&str],
    ) -> Result<Vec<Row>, StoreError> {
        self.searches.lock().push(RecordedSearch {
            class,
            filter: filter.clone(),
            columns: columns.iter().map(ToString::to_string).collect(),
        });
        self.inner.search(class, filter, columns)
    }

    fn links_for_identity(&self, identity_id: &str) -> Result<Vec<Link>, StoreError> {
        self.inner.links_for_identity(identity_id)
    }
}
