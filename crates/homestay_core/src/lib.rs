//! Object-persistence layer for the homestay domain model.
//!
//! One storage contract ([`Storage`]), two interchangeable backends: a
//! single-file document store ([`FileStore`]) and a SQLite-backed store with
//! session-scoped staging ([`DbStore`]). The backend is chosen once per
//! process via [`storage_from_env`].

pub mod db;
pub mod logging;
pub mod model;
pub mod storage;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    now_epoch_ms, storage_key, Amenity, City, Entity, EntityId, EntityKind, EntityMeta, Place,
    Review, State, User,
};
pub use storage::{
    storage_from_env, BackendKind, ConfigError, DbStore, FileStore, Storage, StorageError,
    StorageResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
