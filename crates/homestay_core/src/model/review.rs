//! Review domain model.

use crate::model::base::{EntityId, EntityMeta};
use serde::{Deserialize, Serialize};

/// A user's review of a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Id of the reviewed place.
    pub place_id: EntityId,
    /// Id of the reviewing user.
    pub user_id: EntityId,
    pub text: String,
}

impl Review {
    /// Creates a review with a generated id.
    pub fn new(
        place_id: impl Into<EntityId>,
        user_id: impl Into<EntityId>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            meta: EntityMeta::new(),
            place_id: place_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}
