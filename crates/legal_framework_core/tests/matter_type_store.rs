use legal_framework_core::{
    Clock, EntityKind, EntityStore, IdGenerator, ListQuery, MatterTypeDeletePolicy,
    MatterTypePatch, NewMatterType, NewProceedingType, StoreConfig, StoreError, StoreErrorKind,
    Timestamp, ValidationRule,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Clock tests can move by hand, including backwards.
#[derive(Clone, Default)]
struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    fn set(&self, value: Timestamp) {
        self.0.store(value, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}

fn store_with_clock(config: StoreConfig) -> (EntityStore, ManualClock) {
    let clock = ManualClock::default();
    let store = EntityStore::open_in_memory(config)
        .unwrap()
        .with_clock(clock.clone());
    (store, clock)
}

fn proceeding_for(matter_type_id: Uuid, code: &str) -> NewProceedingType {
    NewProceedingType {
        code: code.to_string(),
        ccms_code: "DA001".to_string(),
        meaning: "Inherent jurisdiction high court injunction".to_string(),
        description: "to be represented on an application for an injunction.".to_string(),
        matter_type_id,
    }
}

#[test]
fn create_and_read_roundtrip() {
    let (store, clock) = store_with_clock(StoreConfig::default());
    clock.set(1_616_700_000_123_456);

    let created = store
        .create_matter_type(NewMatterType {
            name: "Domestic abuse".to_string(),
            upper_gross_income_waiver: true,
            upper_disposable_income_waiver: true,
            upper_capital_waiver: false,
        })
        .unwrap();
    assert_eq!(created.created_at, 1_616_700_000_123_456);
    assert_eq!(created.updated_at, created.created_at);

    let loaded = store.read_matter_type(created.id).unwrap();
    assert_eq!(loaded, created);
    assert!(loaded.upper_gross_income_waiver);
    assert!(!loaded.upper_capital_waiver);
}

#[test]
fn duplicate_name_is_a_uniqueness_conflict() {
    let (store, _) = store_with_clock(StoreConfig::default());
    store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();

    let err = store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap_err();
    assert!(matches!(
        &err,
        StoreError::UniquenessConflict { field: "name", value } if value == "Family"
    ));
    assert_eq!(err.kind().http_status(), 409);
    assert_eq!(store.counts().unwrap().matter_types, 1);
}

#[test]
fn name_uniqueness_is_case_sensitive() {
    let (store, _) = store_with_clock(StoreConfig::default());
    store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();
    store
        .create_matter_type(NewMatterType::named("family"))
        .unwrap();

    assert_eq!(
        store
            .find_matter_type_by_name("family")
            .unwrap()
            .unwrap()
            .name,
        "family"
    );
    assert_eq!(store.counts().unwrap().matter_types, 2);
}

#[test]
fn blank_name_is_a_validation_error() {
    let (store, _) = store_with_clock(StoreConfig::default());

    let err = store
        .create_matter_type(NewMatterType::named("   "))
        .unwrap_err();
    match err {
        StoreError::Validation(validation) => {
            assert_eq!(validation.field, "name");
            assert_eq!(validation.rule, ValidationRule::Blank);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.counts().unwrap().matter_types, 0);
}

#[test]
fn read_unknown_id_is_not_found() {
    let (store, _) = store_with_clock(StoreConfig::default());
    let id = Uuid::new_v4();

    let err = store.read_matter_type(id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound { entity: EntityKind::MatterType, id: missing } if missing == id
    ));
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
}

#[test]
fn update_keeps_created_at_and_advances_updated_at() {
    let (store, clock) = store_with_clock(StoreConfig::default());
    clock.set(1_000);
    let created = store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();

    clock.set(2_000);
    let updated = store
        .update_matter_type(
            created.id,
            MatterTypePatch {
                upper_capital_waiver: Some(true),
                ..MatterTypePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.created_at, 1_000);
    assert_eq!(updated.updated_at, 2_000);
    assert!(updated.upper_capital_waiver);
    assert_eq!(updated.name, "Family");

    clock.set(500);
    let after_clock_step_back = store
        .update_matter_type(
            created.id,
            MatterTypePatch {
                upper_capital_waiver: Some(false),
                ..MatterTypePatch::default()
            },
        )
        .unwrap();
    assert_eq!(after_clock_step_back.created_at, 1_000);
    assert_eq!(after_clock_step_back.updated_at, 2_000);

    assert_eq!(
        store.read_matter_type(created.id).unwrap(),
        after_clock_step_back
    );
}

#[test]
fn rename_to_taken_name_conflicts_and_leaves_record_unchanged() {
    let (store, _) = store_with_clock(StoreConfig::default());
    store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();
    let other = store
        .create_matter_type(NewMatterType::named("Domestic abuse"))
        .unwrap();

    let err = store
        .update_matter_type(
            other.id,
            MatterTypePatch {
                name: Some("Family".to_string()),
                upper_gross_income_waiver: Some(true),
                ..MatterTypePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::UniquenessConflict { .. }));
    assert_eq!(store.read_matter_type(other.id).unwrap(), other);
}

#[test]
fn rename_to_own_name_is_allowed() {
    let (store, _) = store_with_clock(StoreConfig::default());
    let created = store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();

    let updated = store
        .update_matter_type(
            created.id,
            MatterTypePatch {
                name: Some("Family".to_string()),
                ..MatterTypePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Family");
}

#[test]
fn update_unknown_id_is_not_found() {
    let (store, _) = store_with_clock(StoreConfig::default());
    let err = store
        .update_matter_type(Uuid::new_v4(), MatterTypePatch::default())
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
}

#[test]
fn delete_referenced_matter_type_is_rejected_by_default() {
    let (store, _) = store_with_clock(StoreConfig::default());
    let family = store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();
    let dependent = store
        .create_proceeding_type(proceeding_for(family.id, "PR0001"))
        .unwrap();

    let err = store.delete_matter_type(family.id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::ReferentialConflict { matter_type_id, dependents: 1 } if matter_type_id == family.id
    ));
    assert_eq!(err.kind().code(), "referential_conflict");

    assert_eq!(store.read_matter_type(family.id).unwrap(), family);
    assert_eq!(store.read_proceeding_type(dependent.id).unwrap(), dependent);
}

#[test]
fn delete_with_cascade_policy_removes_dependents() {
    let config = StoreConfig::default().with_delete_policy(MatterTypeDeletePolicy::Cascade);
    let (store, _) = store_with_clock(config);
    let family = store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();
    let other = store
        .create_matter_type(NewMatterType::named("Domestic abuse"))
        .unwrap();
    store
        .create_proceeding_type(proceeding_for(family.id, "PR0001"))
        .unwrap();
    store
        .create_proceeding_type(proceeding_for(family.id, "PR0002"))
        .unwrap();
    let survivor = store
        .create_proceeding_type(proceeding_for(other.id, "PR0003"))
        .unwrap();

    assert_eq!(store.delete_matter_type(family.id).unwrap(), 2);

    assert_eq!(
        store.read_matter_type(family.id).unwrap_err().kind(),
        StoreErrorKind::NotFound
    );
    let remaining = store.list_proceeding_types(&ListQuery::default()).unwrap();
    assert_eq!(remaining, vec![survivor]);
}

#[test]
fn delete_unreferenced_matter_type_then_name_is_reusable() {
    let (store, _) = store_with_clock(StoreConfig::default());
    let family = store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();

    assert_eq!(store.delete_matter_type(family.id).unwrap(), 0);
    assert!(store.find_matter_type_by_name("Family").unwrap().is_none());
    assert_eq!(
        store.delete_matter_type(family.id).unwrap_err().kind(),
        StoreErrorKind::NotFound
    );

    store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();
}

#[test]
fn list_returns_insertion_order_with_pagination() {
    let (store, _) = store_with_clock(StoreConfig::default());
    let names = ["Family", "Domestic abuse", "Section 8"];
    for name in names {
        store.create_matter_type(NewMatterType::named(name)).unwrap();
    }

    let all: Vec<String> = store
        .list_matter_types(&ListQuery::default())
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(all, names);

    let page: Vec<String> = store
        .list_matter_types(&ListQuery {
            limit: Some(1),
            offset: 1,
        })
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(page, vec!["Domestic abuse".to_string()]);

    let tail = store
        .list_matter_types(&ListQuery {
            limit: None,
            offset: 2,
        })
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].name, "Section 8");
}

/// Hands out the same id on every call.
struct FixedId(Uuid);

impl IdGenerator for FixedId {
    fn next_id(&self) -> Uuid {
        self.0
    }
}

#[test]
fn id_collision_is_a_storage_error_not_a_name_conflict() {
    let store = EntityStore::open_in_memory(StoreConfig::default())
        .unwrap()
        .with_id_generator(FixedId(Uuid::from_u128(7)));
    store
        .create_matter_type(NewMatterType::named("Family"))
        .unwrap();

    let err = store
        .create_matter_type(NewMatterType::named("Crime"))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Storage, "{err}");
    assert!(matches!(err, StoreError::Db(_)));
    assert!(store.find_matter_type_by_name("Crime").unwrap().is_none());
    assert_eq!(store.counts().unwrap().matter_types, 1);
}
