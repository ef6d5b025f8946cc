//! Storage contract shared by the document and relational backends.
//!
//! # Responsibility
//! - Define the uniform operation set every backend implements.
//! - Define the error taxonomy surfaced to consumers.
//!
//! # Invariants
//! - Both backends key entities as `"Kind.id"`; consumers cannot tell the
//!   backends apart by result shape.
//! - Mutations are buffered in memory until `persist()`.

use crate::db::DbError;
use crate::model::{Amenity, City, Entity, EntityId, EntityKind, Place, Review};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod db_store;
pub mod file_store;
pub mod select;

pub use db_store::DbStore;
pub use file_store::FileStore;
pub use select::{storage_from_env, BackendKind, ConfigError};

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures surfaced by storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// No entity with the given kind and id.
    NotFound { kind: EntityKind, id: EntityId },
    /// A required reference did not resolve (relational backend, at persist).
    Validation(String),
    /// The backend was used before `reload()` or after `release()`.
    SessionClosed,
    /// File i/o failure in the document backend.
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// The document backend's backing file could not be encoded or decoded.
    Document {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Underlying database failure in the relational backend.
    Db(DbError),
    /// Persisted state cannot be converted back into a valid entity.
    InvalidData(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "entity not found: {kind}.{id}"),
            Self::Validation(message) => write!(f, "reference validation failed: {message}"),
            Self::SessionClosed => {
                write!(f, "storage session is not open; call reload() before use")
            }
            Self::Io { path, source } => {
                write!(f, "i/o failure on `{}`: {source}", path.display())
            }
            Self::Document { path, source } => {
                write!(f, "bad document store `{}`: {source}", path.display())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Document { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::Validation(_)
            | Self::SessionClosed
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Uniform persistence contract implemented by both backends.
///
/// Lifecycle: construct, `reload()` once before first use, mutate via
/// `register_new`/`delete`/`link_amenity`, make mutations durable with
/// `persist()`, and `release()` at shutdown. `reload()` is idempotent and
/// discards uncommitted work; `release()` is safe even if `reload()` was
/// never called.
pub trait Storage {
    /// Returns every stored entity, optionally filtered to one kind, keyed
    /// as `"Kind.id"`. Iteration order is unspecified.
    fn all(&self, kind: Option<EntityKind>) -> StorageResult<HashMap<String, Entity>>;

    /// Looks up one entity by kind and id; `NotFound` if absent.
    fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Entity>;

    /// Counts stored entities, optionally filtered to one kind.
    fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize>;

    /// Marks an entity as pending persistence. Registering an entity whose
    /// id is already stored replaces the stored attributes on persist.
    fn register_new(&mut self, entity: Entity);

    /// Marks an entity for removal; no-op when `entity` is `None`.
    fn delete(&mut self, entity: Option<&Entity>);

    /// Durably commits all registrations, mutations and deletions buffered
    /// since the last `persist()` or `reload()`.
    fn persist(&mut self) -> StorageResult<()>;

    /// Discards uncommitted in-memory state and loads the durable state.
    fn reload(&mut self) -> StorageResult<()>;

    /// Releases backend resources (session or file handles).
    fn release(&mut self) -> StorageResult<()>;

    /// Cities whose `state_id` references the given state.
    fn cities_of_state(&self, state_id: &str) -> StorageResult<Vec<City>>;

    /// Places whose `city_id` references the given city.
    fn places_of_city(&self, city_id: &str) -> StorageResult<Vec<Place>>;

    /// Reviews whose `place_id` references the given place.
    fn reviews_of_place(&self, place_id: &str) -> StorageResult<Vec<Review>>;

    /// Amenities linked to the given place, each at most once.
    fn amenities_of_place(&self, place_id: &str) -> StorageResult<Vec<Amenity>>;

    /// Places linked to the given amenity (symmetric side of the join).
    fn places_of_amenity(&self, amenity_id: &str) -> StorageResult<Vec<Place>>;

    /// Links a place and an amenity; linking the same pair twice is a no-op.
    fn link_amenity(&mut self, place_id: &str, amenity_id: &str) -> StorageResult<()>;
}
