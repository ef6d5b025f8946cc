use homestay_core::{
    Amenity, City, DbStore, Entity, EntityKind, Place, Review, State, Storage, StorageError, User,
};
use tempfile::TempDir;

fn seeded_place(store: &mut DbStore) -> (State, City, User, Place) {
    let state = State::new("California");
    let city = City::new(state.meta.id.clone(), "Oakland");
    let user = User::new("host@example.com", "secret");
    let place = Place::new(city.meta.id.clone(), user.meta.id.clone(), "Bay flat");

    store.register_new(state.clone().into());
    store.register_new(city.clone().into());
    store.register_new(user.clone().into());
    store.register_new(place.clone().into());
    store.persist().unwrap();

    (state, city, user, place)
}

#[test]
fn use_before_reload_is_session_closed() {
    let store = DbStore::in_memory();
    let err = store.all(None).unwrap_err();
    assert!(matches!(err, StorageError::SessionClosed));
}

#[test]
fn reload_creates_schema_and_an_empty_store() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    assert!(store.all(None).unwrap().is_empty());
    assert_eq!(store.count(None).unwrap(), 0);
}

#[test]
fn staged_registrations_are_invisible_until_persist() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    let state = State::new("Vermont");
    store.register_new(state.clone().into());
    assert!(store.all(Some(EntityKind::State)).unwrap().is_empty());
    assert_eq!(store.pending_len(), 1);

    store.persist().unwrap();
    assert_eq!(store.pending_len(), 0);

    let loaded = store.get(EntityKind::State, &state.meta.id).unwrap();
    assert_eq!(loaded, Entity::State(state));
}

#[test]
fn all_keys_match_the_document_backend_shape() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();
    let (state, city, user, place) = seeded_place(&mut store);

    let objects = store.all(None).unwrap();
    assert_eq!(objects.len(), 4);
    for (kind, id) in [
        (EntityKind::State, &state.meta.id),
        (EntityKind::City, &city.meta.id),
        (EntityKind::User, &user.meta.id),
        (EntityKind::Place, &place.meta.id),
    ] {
        assert!(objects.contains_key(&format!("{kind}.{id}")));
    }
}

#[test]
fn file_database_round_trips_across_store_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("homestay.sqlite3");

    let mut store = DbStore::open(path.clone(), false);
    store.reload().unwrap();
    let (_, city, _, _) = seeded_place(&mut store);
    store.release().unwrap();

    let mut fresh = DbStore::open(path, false);
    fresh.reload().unwrap();
    let Entity::City(loaded) = fresh.get(EntityKind::City, &city.meta.id).unwrap() else {
        panic!("expected a city entity");
    };
    assert_eq!(loaded, city);
}

#[test]
fn reload_discards_staged_operations() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    store.register_new(State::new("Staged").into());
    store.reload().unwrap();
    store.persist().unwrap();

    assert!(store.all(None).unwrap().is_empty());
}

#[test]
fn reload_is_idempotent() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();
    seeded_place(&mut store);

    let first = store.all(None).unwrap();
    store.reload().unwrap();
    store.reload().unwrap();
    assert_eq!(store.all(None).unwrap(), first);
}

#[test]
fn deleting_a_state_cascades_to_its_cities() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    let state = State::new("Colorado");
    let first = City::new(state.meta.id.clone(), "Denver");
    let second = City::new(state.meta.id.clone(), "Boulder");
    store.register_new(state.clone().into());
    store.register_new(first.into());
    store.register_new(second.into());
    store.persist().unwrap();

    store.delete(Some(&Entity::from(state.clone())));
    store.persist().unwrap();

    assert!(store.all(Some(EntityKind::City)).unwrap().is_empty());
    assert!(store.cities_of_state(&state.meta.id).unwrap().is_empty());
}

#[test]
fn unresolved_reference_surfaces_as_validation_at_persist() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    store.register_new(City::new("no-such-state", "Ghost town").into());
    let err = store.persist().unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
}

#[test]
fn failed_persist_keeps_staged_operations_until_reload() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    store.register_new(City::new("no-such-state", "Ghost town").into());
    assert!(store.persist().is_err());
    assert_eq!(store.pending_len(), 1);

    store.reload().unwrap();
    assert_eq!(store.pending_len(), 0);
    store.persist().unwrap();
    assert!(store.all(None).unwrap().is_empty());
}

#[test]
fn rolled_back_persist_applies_nothing() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    // Valid state staged ahead of the broken city; the single transaction
    // must roll both back.
    store.register_new(State::new("Montana").into());
    store.register_new(City::new("no-such-state", "Ghost town").into());
    assert!(store.persist().is_err());

    assert!(store.all(Some(EntityKind::State)).unwrap().is_empty());
}

#[test]
fn many_to_many_links_stay_duplicate_free() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();
    let (_, _, _, place) = seeded_place(&mut store);

    let amenity = Amenity::new("Wifi");
    store.register_new(amenity.clone().into());
    store.link_amenity(&place.meta.id, &amenity.meta.id).unwrap();
    store.link_amenity(&place.meta.id, &amenity.meta.id).unwrap();
    store.persist().unwrap();
    store.reload().unwrap();

    let amenities = store.amenities_of_place(&place.meta.id).unwrap();
    assert_eq!(amenities.len(), 1);
    assert_eq!(amenities[0].meta.id, amenity.meta.id);

    let places = store.places_of_amenity(&amenity.meta.id).unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].meta.id, place.meta.id);
}

#[test]
fn linking_a_missing_place_fails_at_persist() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    let amenity = Amenity::new("Pool");
    store.register_new(amenity.clone().into());
    store.link_amenity("missing-place", &amenity.meta.id).unwrap();

    let err = store.persist().unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
}

#[test]
fn deleting_a_place_removes_it_and_its_join_rows() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();
    let (_, _, _, place) = seeded_place(&mut store);

    let amenity = Amenity::new("Hot tub");
    store.register_new(amenity.clone().into());
    store.link_amenity(&place.meta.id, &amenity.meta.id).unwrap();
    store.persist().unwrap();

    store.delete(Some(&Entity::from(place.clone())));
    store.persist().unwrap();
    store.reload().unwrap();

    let err = store.get(EntityKind::Place, &place.meta.id).unwrap_err();
    assert!(matches!(
        err,
        StorageError::NotFound {
            kind: EntityKind::Place,
            ..
        }
    ));
    assert!(store.places_of_amenity(&amenity.meta.id).unwrap().is_empty());
    assert!(store.get(EntityKind::Amenity, &amenity.meta.id).is_ok());
}

#[test]
fn registering_an_existing_id_updates_the_stored_attributes() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();

    let mut state = State::new("Renamed-to-be");
    store.register_new(state.clone().into());
    store.persist().unwrap();
    let before = state.meta.updated_at;

    state.name = "Renamed".to_string();
    state.meta.touch();
    store.register_new(state.clone().into());
    store.persist().unwrap();

    let Entity::State(loaded) = store.get(EntityKind::State, &state.meta.id).unwrap() else {
        panic!("expected a state entity");
    };
    assert_eq!(loaded.name, "Renamed");
    assert!(loaded.meta.updated_at >= before);
    assert_eq!(loaded.meta.created_at, state.meta.created_at);
}

#[test]
fn relationship_queries_follow_foreign_keys() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();
    let (state, city, user, place) = seeded_place(&mut store);

    let review = Review::new(place.meta.id.clone(), user.meta.id.clone(), "great view");
    store.register_new(review.clone().into());
    store.persist().unwrap();

    let cities = store.cities_of_state(&state.meta.id).unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].meta.id, city.meta.id);

    let places = store.places_of_city(&city.meta.id).unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].meta.id, place.meta.id);

    let reviews = store.reviews_of_place(&place.meta.id).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].text, "great view");
}

#[test]
fn test_environment_reset_drops_existing_data_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("homestay.sqlite3");

    let mut store = DbStore::open(path.clone(), false);
    store.reload().unwrap();
    store.register_new(State::new("Stale").into());
    store.persist().unwrap();
    store.release().unwrap();

    let mut test_store = DbStore::open(path, true);
    test_store.reload().unwrap();
    assert!(test_store.all(None).unwrap().is_empty());

    // The reset applies to the first reload only; later reloads keep data.
    test_store.register_new(State::new("Fresh").into());
    test_store.persist().unwrap();
    test_store.reload().unwrap();
    assert_eq!(test_store.count(Some(EntityKind::State)).unwrap(), 1);
}

#[test]
fn release_is_safe_without_reload_and_closes_the_session() {
    let mut store = DbStore::in_memory();
    store.release().unwrap();

    store.reload().unwrap();
    store.release().unwrap();
    assert!(matches!(
        store.all(None).unwrap_err(),
        StorageError::SessionClosed
    ));
}

#[test]
fn count_filters_by_kind() {
    let mut store = DbStore::in_memory();
    store.reload().unwrap();
    seeded_place(&mut store);

    assert_eq!(store.count(None).unwrap(), 4);
    assert_eq!(store.count(Some(EntityKind::City)).unwrap(), 1);
    assert_eq!(store.count(Some(EntityKind::Review)).unwrap(), 0);
}
