//! Document backend: one serialized file mirroring an in-memory mapping.
//!
//! # Responsibility
//! - Hold every entity in a single `"Kind.id"`-keyed mapping.
//! - Persist the mapping to one JSON document, atomically.
//! - Resolve relationships by scanning the mapping on demand.
//!
//! # Invariants
//! - A missing backing file is the empty store, not an error.
//! - The backing file is replaced wholesale on persist; readers never see a
//!   partially written document.
//! - No cascade and no reference validation: deleting a State leaves its
//!   Cities in place, and dangling references are stored as given.

use crate::model::{storage_key, Amenity, City, Entity, EntityKind, Place, Review};
use crate::storage::{Storage, StorageError, StorageResult};
use log::{error, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File-backed document store.
pub struct FileStore {
    path: PathBuf,
    objects: HashMap<String, Entity>,
}

impl FileStore {
    /// Default backing file name, used when no path is configured.
    pub const DEFAULT_FILE_NAME: &'static str = "homestay.json";

    /// Creates a store over the given backing file path.
    ///
    /// The file is not touched until `reload()` or `persist()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: HashMap::new(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist_inner(&self) -> StorageResult<()> {
        let body =
            serde_json::to_vec_pretty(&self.objects).map_err(|source| StorageError::Document {
                path: self.path.clone(),
                source,
            })?;

        // Write-to-temp-then-rename: a crash mid-write leaves the previous
        // document intact.
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, &body).map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    fn reload_inner(&mut self) -> StorageResult<()> {
        if !self.path.exists() {
            self.objects.clear();
            return Ok(());
        }

        let bytes = fs::read(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        let decoded: HashMap<String, Entity> =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Document {
                path: self.path.clone(),
                source,
            })?;

        // Rekey from the decoded entities so the mapping invariant holds
        // even if the file's keys were edited by hand.
        self.objects = decoded
            .into_values()
            .map(|entity| (entity.storage_key(), entity))
            .collect();
        Ok(())
    }
}

impl Storage for FileStore {
    fn all(&self, kind: Option<EntityKind>) -> StorageResult<HashMap<String, Entity>> {
        let selected = self
            .objects
            .iter()
            .filter(|(_, entity)| kind.is_none_or(|wanted| entity.kind() == wanted))
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect();
        Ok(selected)
    }

    fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Entity> {
        self.objects
            .get(&storage_key(kind, id))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize> {
        let counted = self
            .objects
            .values()
            .filter(|entity| kind.is_none_or(|wanted| entity.kind() == wanted))
            .count();
        Ok(counted)
    }

    fn register_new(&mut self, entity: Entity) {
        self.objects.insert(entity.storage_key(), entity);
    }

    fn delete(&mut self, entity: Option<&Entity>) {
        if let Some(entity) = entity {
            self.objects.remove(&entity.storage_key());
        }
    }

    fn persist(&mut self) -> StorageResult<()> {
        let started_at = Instant::now();
        match self.persist_inner() {
            Ok(()) => {
                info!(
                    "event=store_persist module=storage backend=file status=ok objects={} duration_ms={}",
                    self.objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_persist module=storage backend=file status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn reload(&mut self) -> StorageResult<()> {
        let started_at = Instant::now();
        match self.reload_inner() {
            Ok(()) => {
                info!(
                    "event=store_reload module=storage backend=file status=ok objects={} duration_ms={}",
                    self.objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_reload module=storage backend=file status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn release(&mut self) -> StorageResult<()> {
        // No long-lived handles; the backing file is only open inside
        // persist/reload.
        info!("event=store_release module=storage backend=file status=ok");
        Ok(())
    }

    fn cities_of_state(&self, state_id: &str) -> StorageResult<Vec<City>> {
        let cities = self
            .objects
            .values()
            .filter_map(|entity| match entity {
                Entity::City(city) if city.state_id == state_id => Some(city.clone()),
                _ => None,
            })
            .collect();
        Ok(cities)
    }

    fn places_of_city(&self, city_id: &str) -> StorageResult<Vec<Place>> {
        let places = self
            .objects
            .values()
            .filter_map(|entity| match entity {
                Entity::Place(place) if place.city_id == city_id => Some(place.clone()),
                _ => None,
            })
            .collect();
        Ok(places)
    }

    fn reviews_of_place(&self, place_id: &str) -> StorageResult<Vec<Review>> {
        let reviews = self
            .objects
            .values()
            .filter_map(|entity| match entity {
                Entity::Review(review) if review.place_id == place_id => Some(review.clone()),
                _ => None,
            })
            .collect();
        Ok(reviews)
    }

    fn amenities_of_place(&self, place_id: &str) -> StorageResult<Vec<Amenity>> {
        let Ok(Entity::Place(place)) = self.get(EntityKind::Place, place_id) else {
            return Ok(Vec::new());
        };

        // Cross-reference the amenity collection; dangling ids resolve to
        // nothing instead of erroring.
        let amenities = place
            .amenity_ids
            .iter()
            .filter_map(|amenity_id| match self.get(EntityKind::Amenity, amenity_id) {
                Ok(Entity::Amenity(amenity)) => Some(amenity),
                _ => None,
            })
            .collect();
        Ok(amenities)
    }

    fn places_of_amenity(&self, amenity_id: &str) -> StorageResult<Vec<Place>> {
        let places = self
            .objects
            .values()
            .filter_map(|entity| match entity {
                Entity::Place(place) if place.amenity_ids.iter().any(|id| id == amenity_id) => {
                    Some(place.clone())
                }
                _ => None,
            })
            .collect();
        Ok(places)
    }

    fn link_amenity(&mut self, place_id: &str, amenity_id: &str) -> StorageResult<()> {
        let key = storage_key(EntityKind::Place, place_id);
        match self.objects.get_mut(&key) {
            Some(Entity::Place(place)) => {
                place.link_amenity(amenity_id);
                Ok(())
            }
            _ => Err(StorageError::NotFound {
                kind: EntityKind::Place,
                id: place_id.to_string(),
            }),
        }
    }
}
