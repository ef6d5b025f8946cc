//! City domain model.

use crate::model::base::{EntityId, EntityMeta};
use serde::{Deserialize, Serialize};

/// A city belonging to exactly one state.
///
/// `state_id` is a required reference. The relational backend enforces it at
/// persist time through its foreign-key constraint; the document backend
/// stores whatever it is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    /// Id of the owning state.
    pub state_id: EntityId,
}

impl City {
    /// Creates a city under the given state with a generated id.
    pub fn new(state_id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(),
            name: name.into(),
            state_id: state_id.into(),
        }
    }
}
