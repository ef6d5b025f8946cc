//! User domain model.

use crate::model::base::EntityMeta;
use serde::{Deserialize, Serialize};

/// An account owning places and reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Creates a user with a generated id; names start empty.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(),
            email: email.into(),
            password: password.into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}
