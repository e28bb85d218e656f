use legal_framework_core::{
    EntityStore, MatterTypeDeletePolicy, MatterTypePatch, NewMatterType, NewProceedingType,
    StoreConfig, StoreError, StoreErrorKind,
};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

const WORKERS: usize = 8;

fn open(path: &Path) -> EntityStore {
    let config = StoreConfig {
        busy_timeout_ms: 30_000,
        ..StoreConfig::default()
    };
    EntityStore::open(path, config).unwrap()
}

#[test]
fn concurrent_creates_with_same_name_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    drop(open(&path));

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = open(&path);
                barrier.wait();
                store
                    .create_matter_type(NewMatterType::named("Family"))
                    .map(|record| record.id)
            })
        })
        .collect();

    let results: Vec<Result<_, StoreError>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    for result in &results {
        if let Err(err) = result {
            assert_eq!(err.kind(), StoreErrorKind::UniquenessConflict, "{err}");
        }
    }
    assert_eq!(open(&path).counts().unwrap().matter_types, 1);
}

#[test]
fn concurrent_rename_and_create_of_same_name_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rename.db");
    let seed = open(&path);
    let renamed = seed
        .create_matter_type(NewMatterType::named("Placeholder"))
        .unwrap();

    for round in 0..20 {
        let target = format!("Target {round}");
        let barrier = Arc::new(Barrier::new(2));
        let renamer = {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let target = target.clone();
            thread::spawn(move || {
                let store = open(&path);
                barrier.wait();
                store
                    .update_matter_type(
                        renamed.id,
                        MatterTypePatch {
                            name: Some(target),
                            ..MatterTypePatch::default()
                        },
                    )
                    .map(|record| record.id)
            })
        };
        let creator = {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let target = target.clone();
            thread::spawn(move || {
                let store = open(&path);
                barrier.wait();
                store
                    .create_matter_type(NewMatterType::named(target))
                    .map(|record| record.id)
            })
        };

        let results = [renamer.join().unwrap(), creator.join().unwrap()];
        let successes = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(successes, 1, "round {round}: {results:?}");
        for result in &results {
            if let Err(err) = result {
                assert_eq!(err.kind(), StoreErrorKind::UniquenessConflict, "{err}");
            }
        }

        let holder = seed.find_matter_type_by_name(&target).unwrap().unwrap();
        assert!(results.iter().any(|result| matches!(result, Ok(id) if *id == holder.id)));
    }
}

#[test]
fn concurrent_delete_and_reference_never_leave_a_dangling_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("referential.db");
    let seed = open(&path);

    for round in 0..20 {
        let owner = seed
            .create_matter_type(NewMatterType::named(format!("Matter {round}")))
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let deleter = {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = EntityStore::open(
                    &path,
                    StoreConfig {
                        busy_timeout_ms: 30_000,
                        delete_policy: MatterTypeDeletePolicy::Reject,
                    },
                )
                .unwrap();
                barrier.wait();
                store.delete_matter_type(owner.id)
            })
        };
        let creator = {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = open(&path);
                barrier.wait();
                store.create_proceeding_type(NewProceedingType {
                    code: format!("PR{round:04}"),
                    ccms_code: "DA001".to_string(),
                    meaning: "Occupation order".to_string(),
                    description: "to be represented on an application for an occupation order."
                        .to_string(),
                    matter_type_id: owner.id,
                })
            })
        };

        let deleted = deleter.join().unwrap();
        let created = creator.join().unwrap();
        match (deleted, created) {
            (Ok(0), Err(err)) => assert_eq!(err.kind(), StoreErrorKind::DanglingReference),
            (Err(err), Ok(record)) => {
                assert_eq!(err.kind(), StoreErrorKind::ReferentialConflict);
                assert_eq!(seed.read_matter_type(record.matter_type_id).unwrap().id, owner.id);
            }
            (deleted, created) => panic!("unexpected outcome: {deleted:?} / {created:?}"),
        }
    }

    let dangling: i64 = seed
        .connection()
        .query_row(
            "SELECT COUNT(*)
             FROM proceeding_types p
             WHERE NOT EXISTS (SELECT 1 FROM matter_types m WHERE m.id = p.matter_type_id);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
}
