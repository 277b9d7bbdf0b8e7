use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Transaction, params};
use tracing::debug;

use crate::error::StoreError;
use crate::schema;

/// Handle to the apprank database.
///
/// Cloning shares the same connection. Every write that must be atomic goes
/// through [`Store::with_tx`].
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the parent directory cannot be created and
    /// `StoreError::Sqlite` if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Opening database");
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Private database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::configure(&conn)?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection locked. A poisoned lock is recovered: the
    /// SQLite connection stays usable after a panic elsewhere.
    pub(crate) fn with_conn<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    /// Run `f` inside one transaction. Commits when `f` succeeds; any error
    /// drops the transaction, which rolls back every write made in it.
    pub(crate) fn with_tx<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R, StoreError>,
    {
        let mut guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let tx = guard.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Rows in `table` whose `column` equals `id`.
pub(crate) fn count_refs(
    conn: &Connection,
    table: &str,
    column: &str,
    id: i64,
) -> Result<usize, StoreError> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1");
    let count: i64 = conn.query_row(&sql, params![id], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

pub(crate) fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool, StoreError> {
    count_refs(conn, table, "id", id).map(|n| n > 0)
}

/// Turn "no rows" into `NotFound` for `entity`.
pub(crate) fn or_not_found<T>(
    result: rusqlite::Result<T>,
    entity: &'static str,
    id: i64,
) -> Result<T, StoreError> {
    result.map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::not_found(entity, id),
        other => StoreError::Sqlite(other),
    })
}
