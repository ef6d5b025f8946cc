//! Shared entity identity and lifecycle contract.
//!
//! # Responsibility
//! - Define the id + timestamp fields every domain entity carries.
//! - Provide the closed set of entity type tags and the `"Kind.id"` key
//!   scheme used by every storage backend.
//!
//! # Invariants
//! - `id` is globally unique across all entity types combined; the storage
//!   key embeds the type tag, so an id collision would corrupt the store.
//! - `created_at` is set once at construction; `updated_at` never moves
//!   backwards.

use crate::model::amenity::Amenity;
use crate::model::city::City;
use crate::model::place::Place;
use crate::model::review::Review;
use crate::model::state::State;
use crate::model::user::User;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque unique identifier shared by all entity types.
///
/// Generated from a v4 UUID at construction, but kept as a plain string so
/// externally supplied ids (imports, fixtures) round-trip unchanged.
pub type EntityId = String;

/// Returns the current instant as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

/// Identity and lifecycle fields embedded in every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// Stable unique id, assigned at construction and never changed.
    pub id: EntityId,
    /// Unix epoch milliseconds, set once at construction.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed via [`EntityMeta::touch`].
    pub updated_at: i64,
}

impl EntityMeta {
    /// Creates fresh identity metadata with a generated id.
    pub fn new() -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes `updated_at` to the current instant.
    ///
    /// Clamped so the value never moves backwards even if the wall clock does.
    pub fn touch(&mut self) {
        self.updated_at = now_epoch_ms().max(self.updated_at);
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Closed set of entity types known to the persistence layer.
///
/// The tag strings double as the type portion of storage keys and as the
/// `type` discriminator inside the document backend's serialized file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    State,
    City,
    User,
    Place,
    Review,
    Amenity,
}

impl EntityKind {
    /// Every kind, in a stable order used when iterating the whole store.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::State,
        EntityKind::City,
        EntityKind::User,
        EntityKind::Place,
        EntityKind::Review,
        EntityKind::Amenity,
    ];

    /// Returns the stable type tag used in storage keys.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::State => "State",
            Self::City => "City",
            Self::User => "User",
            Self::Place => "Place",
            Self::Review => "Review",
            Self::Amenity => "Amenity",
        }
    }

    /// Resolves a stored type tag back to a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "State" => Some(Self::State),
            "City" => Some(Self::City),
            "User" => Some(Self::User),
            "Place" => Some(Self::Place),
            "Review" => Some(Self::Review),
            "Amenity" => Some(Self::Amenity),
            _ => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Formats the storage key for a kind + id pair.
pub fn storage_key(kind: EntityKind, id: &str) -> String {
    format!("{kind}.{id}")
}

/// One value type over all six entity structs.
///
/// Internally tagged so the document backend's file stores each object with
/// an explicit `type` discriminator; rehydration dispatches through the tag
/// to the right entity shape with no runtime registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    State(State),
    City(City),
    User(User),
    Place(Place),
    Review(Review),
    Amenity(Amenity),
}

impl Entity {
    /// Returns the kind matching this entity's variant.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::State(_) => EntityKind::State,
            Self::City(_) => EntityKind::City,
            Self::User(_) => EntityKind::User,
            Self::Place(_) => EntityKind::Place,
            Self::Review(_) => EntityKind::Review,
            Self::Amenity(_) => EntityKind::Amenity,
        }
    }

    /// Shared identity metadata of the wrapped entity.
    pub fn meta(&self) -> &EntityMeta {
        match self {
            Self::State(inner) => &inner.meta,
            Self::City(inner) => &inner.meta,
            Self::User(inner) => &inner.meta,
            Self::Place(inner) => &inner.meta,
            Self::Review(inner) => &inner.meta,
            Self::Amenity(inner) => &inner.meta,
        }
    }

    /// Mutable access to the shared identity metadata.
    pub fn meta_mut(&mut self) -> &mut EntityMeta {
        match self {
            Self::State(inner) => &mut inner.meta,
            Self::City(inner) => &mut inner.meta,
            Self::User(inner) => &mut inner.meta,
            Self::Place(inner) => &mut inner.meta,
            Self::Review(inner) => &mut inner.meta,
            Self::Amenity(inner) => &mut inner.meta,
        }
    }

    /// Stable unique id of the wrapped entity.
    pub fn id(&self) -> &str {
        &self.meta().id
    }

    /// Storage key of the wrapped entity (`"Kind.id"`).
    pub fn storage_key(&self) -> String {
        storage_key(self.kind(), self.id())
    }

    /// Refreshes `updated_at` on the wrapped entity.
    pub fn touch(&mut self) {
        self.meta_mut().touch();
    }
}

impl From<State> for Entity {
    fn from(value: State) -> Self {
        Self::State(value)
    }
}

impl From<City> for Entity {
    fn from(value: City) -> Self {
        Self::City(value)
    }
}

impl From<User> for Entity {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

impl From<Place> for Entity {
    fn from(value: Place) -> Self {
        Self::Place(value)
    }
}

impl From<Review> for Entity {
    fn from(value: Review) -> Self {
        Self::Review(value)
    }
}

impl From<Amenity> for Entity {
    fn from(value: Amenity) -> Self {
        Self::Amenity(value)
    }
}
