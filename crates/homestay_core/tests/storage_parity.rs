//! The consumer-facing contract must look identical through both backends.

use homestay_core::{City, DbStore, Entity, EntityKind, FileStore, State, Storage, StorageError};
use tempfile::TempDir;

fn backends(dir: &TempDir) -> Vec<(&'static str, Box<dyn Storage>)> {
    vec![
        (
            "file",
            Box::new(FileStore::new(dir.path().join("parity.json"))) as Box<dyn Storage>,
        ),
        ("db", Box::new(DbStore::in_memory()) as Box<dyn Storage>),
    ]
}

#[test]
fn key_shape_and_lookups_match_across_backends() {
    let dir = TempDir::new().unwrap();
    for (label, mut store) in backends(&dir) {
        store.reload().unwrap();

        let state = State::new("Washington");
        let city = City::new(state.meta.id.clone(), "Spokane");
        store.register_new(state.clone().into());
        store.register_new(city.clone().into());
        store.persist().unwrap();
        store.reload().unwrap();

        let objects = store.all(None).unwrap();
        assert_eq!(objects.len(), 2, "backend {label}");
        assert!(
            objects.contains_key(&format!("State.{}", state.meta.id)),
            "backend {label}"
        );
        assert!(
            objects.contains_key(&format!("City.{}", city.meta.id)),
            "backend {label}"
        );

        let Entity::City(loaded) = store.get(EntityKind::City, &city.meta.id).unwrap() else {
            panic!("backend {label}: expected a city entity");
        };
        assert_eq!(loaded, city, "backend {label}");

        let cities = store.cities_of_state(&state.meta.id).unwrap();
        assert_eq!(cities.len(), 1, "backend {label}");
        assert_eq!(cities[0].meta.id, city.meta.id, "backend {label}");

        assert_eq!(store.count(Some(EntityKind::State)).unwrap(), 1, "backend {label}");
        store.release().unwrap();
    }
}

#[test]
fn absent_lookups_are_not_found_on_both_backends() {
    let dir = TempDir::new().unwrap();
    for (label, mut store) in backends(&dir) {
        store.reload().unwrap();

        let err = store.get(EntityKind::User, "no-such-user").unwrap_err();
        assert!(
            matches!(
                err,
                StorageError::NotFound {
                    kind: EntityKind::User,
                    ..
                }
            ),
            "backend {label}"
        );
    }
}

#[test]
fn filtered_all_returns_only_the_requested_kind() {
    let dir = TempDir::new().unwrap();
    for (label, mut store) in backends(&dir) {
        store.reload().unwrap();

        let state = State::new("Maine");
        store.register_new(state.clone().into());
        store.register_new(City::new(state.meta.id.clone(), "Portland").into());
        store.persist().unwrap();

        let states = store.all(Some(EntityKind::State)).unwrap();
        assert_eq!(states.len(), 1, "backend {label}");
        assert!(
            states.values().all(|entity| entity.kind() == EntityKind::State),
            "backend {label}"
        );
    }
}
