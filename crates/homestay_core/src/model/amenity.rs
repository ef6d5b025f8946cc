//! Amenity domain model.

use crate::model::base::EntityMeta;
use serde::{Deserialize, Serialize};

/// A feature places can offer, related to places symmetrically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
}

impl Amenity {
    /// Creates an amenity with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(),
            name: name.into(),
        }
    }
}
