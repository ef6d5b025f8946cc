//! State domain model.

use crate::model::base::EntityMeta;
use serde::{Deserialize, Serialize};

/// A top-level region owning zero or more cities.
///
/// The owned-city list is never stored on the state itself; backends resolve
/// it on demand through [`crate::storage::Storage::cities_of_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
}

impl State {
    /// Creates a state with a generated id and fresh timestamps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(),
            name: name.into(),
        }
    }
}
