//! Place domain model.
//!
//! # Responsibility
//! - Describe a rentable place and its references to city, host and
//!   amenities.
//!
//! # Invariants
//! - `city_id` and `user_id` are required references.
//! - `amenity_ids` holds each amenity id at most once; it is the document
//!   backend's side of the many-to-many relationship. The relational backend
//!   keeps that relationship in the join table instead and leaves this list
//!   empty on materialized rows.

use crate::model::base::{EntityId, EntityMeta};
use serde::{Deserialize, Serialize};

/// A place to stay, listed by a user within a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Id of the city this place is located in.
    pub city_id: EntityId,
    /// Id of the hosting user.
    pub user_id: EntityId,
    pub name: String,
    pub description: String,
    pub number_rooms: u32,
    pub number_bathrooms: u32,
    pub max_guest: u32,
    pub price_by_night: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Linked amenity ids, duplicate-free (document backend representation).
    #[serde(default)]
    pub amenity_ids: Vec<EntityId>,
}

impl Place {
    /// Creates a place with a generated id; counts default to 0 and
    /// coordinates to 0.0.
    pub fn new(
        city_id: impl Into<EntityId>,
        user_id: impl Into<EntityId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            meta: EntityMeta::new(),
            city_id: city_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            description: String::new(),
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: 0.0,
            longitude: 0.0,
            amenity_ids: Vec::new(),
        }
    }

    /// Records a link to an amenity, keeping the list duplicate-free.
    pub fn link_amenity(&mut self, amenity_id: impl Into<EntityId>) {
        let amenity_id = amenity_id.into();
        if !self.amenity_ids.contains(&amenity_id) {
            self.amenity_ids.push(amenity_id);
        }
    }
}
