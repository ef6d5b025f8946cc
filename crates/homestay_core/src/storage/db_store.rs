//! Relational backend: SQLite connection plus a staged unit of work.
//!
//! # Responsibility
//! - Stage registrations, deletions and amenity links in memory.
//! - Apply the staged operations in one transaction at persist time.
//! - Materialize query results as entities keyed exactly like the document
//!   backend.
//!
//! # Invariants
//! - Staged operations never touch durable state before `persist()`.
//! - A failed commit rolls back completely; `reload()` discards staged work.
//! - Cascades (State->City, City->Place, Place->Review) are declared in the
//!   schema, not reimplemented here.

use crate::db::migrations::{apply_migrations, reset_schema};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::{Amenity, City, Entity, EntityKind, EntityMeta, Place, Review, State, User};
use crate::storage::{Storage, StorageError, StorageResult};
use log::{error, info};
use rusqlite::{params, Connection, Params, Row, Transaction};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

const STATE_SELECT_SQL: &str = "SELECT id, created_at, updated_at, name FROM states";
const CITY_SELECT_SQL: &str = "SELECT id, created_at, updated_at, name, state_id FROM cities";
const USER_SELECT_SQL: &str =
    "SELECT id, created_at, updated_at, email, password, first_name, last_name FROM users";
const PLACE_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    updated_at,
    city_id,
    user_id,
    name,
    description,
    number_rooms,
    number_bathrooms,
    max_guest,
    price_by_night,
    latitude,
    longitude
FROM places";
const REVIEW_SELECT_SQL: &str =
    "SELECT id, created_at, updated_at, place_id, user_id, text FROM reviews";
const AMENITY_SELECT_SQL: &str = "SELECT id, created_at, updated_at, name FROM amenities";

enum DbMode {
    File(PathBuf),
    Memory,
}

/// One staged mutation, applied at persist time.
enum PendingOp {
    Upsert(Entity),
    Delete { kind: EntityKind, id: String },
    Link { place_id: String, amenity_id: String },
}

/// SQLite-backed store with session-scoped staging.
pub struct DbStore {
    mode: DbMode,
    test_env: bool,
    reset_applied: bool,
    conn: Option<Connection>,
    pending: Vec<PendingOp>,
}

impl DbStore {
    /// Creates a store over a database file.
    ///
    /// The connection is opened lazily by the first `reload()`. With
    /// `test_env` set, that first reload drops all tables before recreating
    /// them (a destructive reset intended only for test fixtures).
    pub fn open(path: impl Into<PathBuf>, test_env: bool) -> Self {
        Self {
            mode: DbMode::File(path.into()),
            test_env,
            reset_applied: false,
            conn: None,
            pending: Vec::new(),
        }
    }

    /// Creates a store over an in-memory database.
    ///
    /// Durable only as long as the store keeps its connection; reloads keep
    /// the connection alive, `release()` discards the data.
    pub fn in_memory() -> Self {
        Self {
            mode: DbMode::Memory,
            test_env: false,
            reset_applied: false,
            conn: None,
            pending: Vec::new(),
        }
    }

    /// Number of staged, not-yet-persisted operations.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn session(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::SessionClosed)
    }

    fn reload_inner(&mut self) -> StorageResult<()> {
        if self.conn.is_none() {
            let conn = match &self.mode {
                DbMode::File(path) => open_db(path)?,
                DbMode::Memory => open_db_in_memory()?,
            };
            self.conn = Some(conn);
        }
        let conn = self.conn.as_mut().ok_or(StorageError::SessionClosed)?;

        if self.test_env && !self.reset_applied {
            reset_schema(conn)?;
            apply_migrations(conn)?;
            self.reset_applied = true;
        }

        self.pending.clear();
        Ok(())
    }

    fn persist_inner(&mut self) -> StorageResult<()> {
        let conn = self.conn.as_mut().ok_or(StorageError::SessionClosed)?;
        let tx = conn.transaction()?;
        for op in &self.pending {
            apply_pending(&tx, op)?;
        }
        tx.commit().map_err(map_sql_err)?;
        self.pending.clear();
        Ok(())
    }
}

impl Storage for DbStore {
    fn all(&self, kind: Option<EntityKind>) -> StorageResult<HashMap<String, Entity>> {
        let conn = self.session()?;
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut objects = HashMap::new();
        for kind in kinds {
            let mut stmt = conn.prepare(select_sql(kind))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let entity = entity_from_row(kind, row)?;
                objects.insert(entity.storage_key(), entity);
            }
        }
        Ok(objects)
    }

    fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Entity> {
        let conn = self.session()?;
        let sql = format!("{} WHERE id = ?1", select_sql(kind));
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => Ok(entity_from_row(kind, row)?),
            None => Err(StorageError::NotFound {
                kind,
                id: id.to_string(),
            }),
        }
    }

    fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize> {
        let conn = self.session()?;
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut total = 0usize;
        for kind in kinds {
            let sql = format!("SELECT COUNT(*) FROM {}", table_name(kind));
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            total += usize::try_from(count).unwrap_or(0);
        }
        Ok(total)
    }

    fn register_new(&mut self, entity: Entity) {
        self.pending.push(PendingOp::Upsert(entity));
    }

    fn delete(&mut self, entity: Option<&Entity>) {
        if let Some(entity) = entity {
            self.pending.push(PendingOp::Delete {
                kind: entity.kind(),
                id: entity.id().to_string(),
            });
        }
    }

    fn persist(&mut self) -> StorageResult<()> {
        let started_at = Instant::now();
        let staged = self.pending.len();
        match self.persist_inner() {
            Ok(()) => {
                info!(
                    "event=store_persist module=storage backend=db status=ok ops={} duration_ms={}",
                    staged,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_persist module=storage backend=db status=error ops={} duration_ms={} error={}",
                    staged,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn reload(&mut self) -> StorageResult<()> {
        let started_at = Instant::now();
        match self.reload_inner() {
            Ok(()) => {
                info!(
                    "event=store_reload module=storage backend=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_reload module=storage backend=db status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn release(&mut self) -> StorageResult<()> {
        self.pending.clear();
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, err)| StorageError::Db(DbError::Sqlite(err)))?;
        }
        info!("event=store_release module=storage backend=db status=ok");
        Ok(())
    }

    fn cities_of_state(&self, state_id: &str) -> StorageResult<Vec<City>> {
        let sql = format!("{CITY_SELECT_SQL} WHERE state_id = ?1");
        query_rows(self.session()?, &sql, params![state_id], city_from_row)
    }

    fn places_of_city(&self, city_id: &str) -> StorageResult<Vec<Place>> {
        let sql = format!("{PLACE_SELECT_SQL} WHERE city_id = ?1");
        query_rows(self.session()?, &sql, params![city_id], place_from_row)
    }

    fn reviews_of_place(&self, place_id: &str) -> StorageResult<Vec<Review>> {
        let sql = format!("{REVIEW_SELECT_SQL} WHERE place_id = ?1");
        query_rows(self.session()?, &sql, params![place_id], review_from_row)
    }

    fn amenities_of_place(&self, place_id: &str) -> StorageResult<Vec<Amenity>> {
        let sql = format!(
            "{AMENITY_SELECT_SQL}
             WHERE id IN (SELECT amenity_id FROM place_amenity WHERE place_id = ?1)"
        );
        query_rows(self.session()?, &sql, params![place_id], amenity_from_row)
    }

    fn places_of_amenity(&self, amenity_id: &str) -> StorageResult<Vec<Place>> {
        let sql = format!(
            "{PLACE_SELECT_SQL}
             WHERE id IN (SELECT place_id FROM place_amenity WHERE amenity_id = ?1)"
        );
        query_rows(self.session()?, &sql, params![amenity_id], place_from_row)
    }

    fn link_amenity(&mut self, place_id: &str, amenity_id: &str) -> StorageResult<()> {
        self.pending.push(PendingOp::Link {
            place_id: place_id.to_string(),
            amenity_id: amenity_id.to_string(),
        });
        Ok(())
    }
}

fn apply_pending(tx: &Transaction<'_>, op: &PendingOp) -> StorageResult<()> {
    match op {
        PendingOp::Upsert(entity) => upsert_entity(tx, entity),
        PendingOp::Delete { kind, id } => {
            let sql = format!("DELETE FROM {} WHERE id = ?1", table_name(*kind));
            tx.execute(&sql, params![id]).map_err(map_sql_err)?;
            Ok(())
        }
        PendingOp::Link {
            place_id,
            amenity_id,
        } => {
            // OR IGNORE keeps the pair duplicate-free; foreign-key
            // violations still abort.
            tx.execute(
                "INSERT OR IGNORE INTO place_amenity (place_id, amenity_id) VALUES (?1, ?2);",
                params![place_id, amenity_id],
            )
            .map_err(map_sql_err)?;
            Ok(())
        }
    }
}

fn upsert_entity(tx: &Transaction<'_>, entity: &Entity) -> StorageResult<()> {
    let result = match entity {
        Entity::State(state) => tx.execute(
            "INSERT INTO states (id, created_at, updated_at, name)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                name = excluded.name;",
            params![
                state.meta.id,
                state.meta.created_at,
                state.meta.updated_at,
                state.name
            ],
        ),
        Entity::City(city) => tx.execute(
            "INSERT INTO cities (id, created_at, updated_at, name, state_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                name = excluded.name,
                state_id = excluded.state_id;",
            params![
                city.meta.id,
                city.meta.created_at,
                city.meta.updated_at,
                city.name,
                city.state_id
            ],
        ),
        Entity::User(user) => tx.execute(
            "INSERT INTO users (id, created_at, updated_at, email, password, first_name, last_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                email = excluded.email,
                password = excluded.password,
                first_name = excluded.first_name,
                last_name = excluded.last_name;",
            params![
                user.meta.id,
                user.meta.created_at,
                user.meta.updated_at,
                user.email,
                user.password,
                user.first_name,
                user.last_name
            ],
        ),
        Entity::Place(place) => tx.execute(
            "INSERT INTO places (
                id,
                created_at,
                updated_at,
                city_id,
                user_id,
                name,
                description,
                number_rooms,
                number_bathrooms,
                max_guest,
                price_by_night,
                latitude,
                longitude
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                city_id = excluded.city_id,
                user_id = excluded.user_id,
                name = excluded.name,
                description = excluded.description,
                number_rooms = excluded.number_rooms,
                number_bathrooms = excluded.number_bathrooms,
                max_guest = excluded.max_guest,
                price_by_night = excluded.price_by_night,
                latitude = excluded.latitude,
                longitude = excluded.longitude;",
            params![
                place.meta.id,
                place.meta.created_at,
                place.meta.updated_at,
                place.city_id,
                place.user_id,
                place.name,
                place.description,
                place.number_rooms,
                place.number_bathrooms,
                place.max_guest,
                place.price_by_night,
                place.latitude,
                place.longitude
            ],
        ),
        Entity::Review(review) => tx.execute(
            "INSERT INTO reviews (id, created_at, updated_at, place_id, user_id, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                place_id = excluded.place_id,
                user_id = excluded.user_id,
                text = excluded.text;",
            params![
                review.meta.id,
                review.meta.created_at,
                review.meta.updated_at,
                review.place_id,
                review.user_id,
                review.text
            ],
        ),
        Entity::Amenity(amenity) => tx.execute(
            "INSERT INTO amenities (id, created_at, updated_at, name)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                name = excluded.name;",
            params![
                amenity.meta.id,
                amenity.meta.created_at,
                amenity.meta.updated_at,
                amenity.name
            ],
        ),
    };

    result.map_err(map_sql_err)?;
    Ok(())
}

/// Maps constraint violations to `Validation` (unresolved references are a
/// caller error, not a backend failure); everything else stays a db error.
fn map_sql_err(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Validation(err.to_string())
        }
        _ => StorageError::Db(DbError::Sqlite(err)),
    }
}

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::State => "states",
        EntityKind::City => "cities",
        EntityKind::User => "users",
        EntityKind::Place => "places",
        EntityKind::Review => "reviews",
        EntityKind::Amenity => "amenities",
    }
}

fn select_sql(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::State => STATE_SELECT_SQL,
        EntityKind::City => CITY_SELECT_SQL,
        EntityKind::User => USER_SELECT_SQL,
        EntityKind::Place => PLACE_SELECT_SQL,
        EntityKind::Review => REVIEW_SELECT_SQL,
        EntityKind::Amenity => AMENITY_SELECT_SQL,
    }
}

fn query_rows<T>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
    map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StorageResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(map_row(row)?);
    }
    Ok(items)
}

fn entity_from_row(kind: EntityKind, row: &Row<'_>) -> rusqlite::Result<Entity> {
    match kind {
        EntityKind::State => state_from_row(row).map(Entity::State),
        EntityKind::City => city_from_row(row).map(Entity::City),
        EntityKind::User => user_from_row(row).map(Entity::User),
        EntityKind::Place => place_from_row(row).map(Entity::Place),
        EntityKind::Review => review_from_row(row).map(Entity::Review),
        EntityKind::Amenity => amenity_from_row(row).map(Entity::Amenity),
    }
}

fn meta_from_row(row: &Row<'_>) -> rusqlite::Result<EntityMeta> {
    Ok(EntityMeta {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<State> {
    Ok(State {
        meta: meta_from_row(row)?,
        name: row.get("name")?,
    })
}

fn city_from_row(row: &Row<'_>) -> rusqlite::Result<City> {
    Ok(City {
        meta: meta_from_row(row)?,
        name: row.get("name")?,
        state_id: row.get("state_id")?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        meta: meta_from_row(row)?,
        email: row.get("email")?,
        password: row.get("password")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
    })
}

fn place_from_row(row: &Row<'_>) -> rusqlite::Result<Place> {
    Ok(Place {
        meta: meta_from_row(row)?,
        city_id: row.get("city_id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        number_rooms: row.get("number_rooms")?,
        number_bathrooms: row.get("number_bathrooms")?,
        max_guest: row.get("max_guest")?,
        price_by_night: row.get("price_by_night")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        // The join table is the source of truth in this backend.
        amenity_ids: Vec::new(),
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        meta: meta_from_row(row)?,
        place_id: row.get("place_id")?,
        user_id: row.get("user_id")?,
        text: row.get("text")?,
    })
}

fn amenity_from_row(row: &Row<'_>) -> rusqlite::Result<Amenity> {
    Ok(Amenity {
        meta: meta_from_row(row)?,
        name: row.get("name")?,
    })
}
