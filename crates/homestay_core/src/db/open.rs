//! Connection bootstrap for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory connections with the pragmas the backend
//!   relies on.
//! - Apply pending migrations before handing the connection out.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`; schema cascades do not
//!   fire without it.
//! - Returned connections are fully migrated.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started_at = Instant::now();
    match Connection::open(path).map_err(Into::into).and_then(bootstrap) {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// The store lives only as long as the connection; used by tests and
/// throwaway fixtures.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    match Connection::open_in_memory()
        .map_err(Into::into)
        .and_then(bootstrap)
    {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode=memory duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=memory duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap(mut conn: Connection) -> DbResult<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
