//! Backend selection from process-wide configuration.
//!
//! # Responsibility
//! - Pick exactly one backend at startup from an environment switch.
//! - Assemble that backend's parameters, failing fast when the relational
//!   backend is selected without its connection parameters.
//!
//! # Invariants
//! - Absence of the switch, or any non-matching value, selects the document
//!   backend.
//! - The returned handle is the only storage a process should construct;
//!   callers `reload()` it immediately and `release()` it at shutdown.

use crate::storage::{DbStore, FileStore, Storage};
use log::info;
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Switch variable; the value `"db"` selects the relational backend.
pub const ENV_STORAGE: &str = "HOMESTAY_STORAGE";
/// Database file path, required when the relational backend is selected.
pub const ENV_DB_FILE: &str = "HOMESTAY_DB_FILE";
/// Document backing file path; defaults to [`FileStore::DEFAULT_FILE_NAME`].
pub const ENV_DATA_FILE: &str = "HOMESTAY_DATA_FILE";
/// Runtime environment; the value `"test"` enables the destructive
/// relational schema reset.
pub const ENV_RUNTIME_ENV: &str = "HOMESTAY_ENV";

const RELATIONAL_SWITCH: &str = "db";
const TEST_ENV_VALUE: &str = "test";

/// The two interchangeable backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Document,
    Relational,
}

impl BackendKind {
    /// Resolves the configured switch value to a backend kind.
    pub fn from_switch(value: Option<&str>) -> Self {
        match value {
            Some(RELATIONAL_SWITCH) => Self::Relational,
            _ => Self::Document,
        }
    }
}

/// Startup-time configuration failure; not recoverable per-call.
#[derive(Debug)]
pub enum ConfigError {
    /// A variable required by the selected backend is unset or empty.
    MissingVar { var: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar { var } => {
                write!(f, "missing required configuration variable `{var}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Constructs the backend selected by the process environment.
///
/// The handle is returned un-loaded; call `reload()` before first use.
pub fn storage_from_env() -> Result<Box<dyn Storage>, ConfigError> {
    let switch = env::var(ENV_STORAGE).ok();
    match BackendKind::from_switch(switch.as_deref()) {
        BackendKind::Relational => {
            let path = non_empty_var(ENV_DB_FILE)
                .ok_or(ConfigError::MissingVar { var: ENV_DB_FILE })?;
            let test_env =
                env::var(ENV_RUNTIME_ENV).is_ok_and(|value| value == TEST_ENV_VALUE);
            info!(
                "event=storage_select module=storage backend=db test_env={test_env} database={path}"
            );
            Ok(Box::new(DbStore::open(path, test_env)))
        }
        BackendKind::Document => {
            let path = non_empty_var(ENV_DATA_FILE)
                .unwrap_or_else(|| FileStore::DEFAULT_FILE_NAME.to_string());
            info!("event=storage_select module=storage backend=file path={path}");
            Ok(Box::new(FileStore::new(path)))
        }
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, ConfigError, ENV_DB_FILE};

    #[test]
    fn switch_value_db_selects_relational() {
        assert_eq!(BackendKind::from_switch(Some("db")), BackendKind::Relational);
    }

    #[test]
    fn absent_or_unknown_switch_defaults_to_document() {
        assert_eq!(BackendKind::from_switch(None), BackendKind::Document);
        assert_eq!(
            BackendKind::from_switch(Some("mysql")),
            BackendKind::Document
        );
        assert_eq!(BackendKind::from_switch(Some("DB")), BackendKind::Document);
    }

    #[test]
    fn missing_var_error_names_the_variable() {
        let err = ConfigError::MissingVar { var: ENV_DB_FILE };
        assert!(err.to_string().contains("HOMESTAY_DB_FILE"));
    }
}
