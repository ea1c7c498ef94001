//! SQLite backend: one table of `(key, value)` text pairs.
//!
//! Uniqueness of a pair is enforced by the table's `UNIQUE(key, value)`
//! constraint and writes use `INSERT OR IGNORE`, so repeated saves never
//! produce duplicate rows and `fetch` needs no deduplication.
//!
//! All writes go through a `Cursor`, a scoped transaction. A cursor commits
//! only when asked to; dropping it on any other path rolls back. Cursors are
//! obtained through `&mut self`, so at most one exists at a time. A cursor
//! that escapes without being dropped (`mem::forget`) leaves its transaction
//! open: the backend treats any transaction it finds open outside a live
//! cursor as abandoned and rolls it back before doing anything else.

use std::path::Path;

use log::{debug, trace, warn};
use rusqlite::{params, Connection, Params};

use super::{Backend, StorageResult};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS hypothesis_data_mapping (
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(key, value)
)";

const INSERT_PAIR: &str =
    "INSERT OR IGNORE INTO hypothesis_data_mapping (key, value) VALUES (?1, ?2)";

const SELECT_VALUES: &str = "SELECT value FROM hypothesis_data_mapping WHERE key = ?1";

fn fetch_values(conn: &Connection, key: &str) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(SELECT_VALUES)?;
    let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
    let values = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

/// Roll back a transaction nobody is responsible for any more
fn discard_abandoned(conn: &Connection) -> StorageResult<()> {
    if !conn.is_autocommit() {
        debug!("rolling back transaction left open by an abandoned cursor");
        conn.execute_batch("ROLLBACK")?;
    }
    Ok(())
}

/// Scoped transactional write handle.
///
/// Writes become visible to `fetch` only after `commit`. Dropping the cursor
/// without committing, including while unwinding from an error or a panic,
/// discards every write issued through it.
#[derive(Debug)]
pub struct Cursor<'conn> {
    conn: &'conn Connection,
    finished: bool,
}

impl<'conn> Cursor<'conn> {
    fn begin(conn: &'conn Connection) -> StorageResult<Self> {
        discard_abandoned(conn)?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        trace!("cursor opened");
        Ok(Cursor {
            conn,
            finished: false,
        })
    }

    /// Run a raw statement inside this cursor's transaction
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> StorageResult<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Insert a pair, returning whether it was new
    pub fn insert(&self, key: &str, value: &str) -> StorageResult<bool> {
        let changed = self.execute(INSERT_PAIR, params![key, value])?;
        Ok(changed > 0)
    }

    /// Values under `key` as seen from inside this transaction
    pub fn fetch(&self, key: &str) -> StorageResult<Vec<String>> {
        fetch_values(self.conn, key)
    }

    pub fn commit(mut self) -> StorageResult<()> {
        // On failure `self` is dropped unfinished, which rolls back.
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        trace!("cursor committed");
        Ok(())
    }

    pub fn rollback(mut self) -> StorageResult<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        trace!("cursor rolled back");
        Ok(())
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!("cursor dropped without commit, rolling back");
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            warn!("failed to roll back cursor: {}", e);
        }
    }
}

/// Example storage in a SQLite database file or in memory
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) a database file and make sure the table exists
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let mut backend = SqliteBackend { conn };
        backend.create_db_if_needed()?;
        Ok(backend)
    }

    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut backend = SqliteBackend { conn };
        backend.create_db_if_needed()?;
        Ok(backend)
    }

    /// Begin a transactional write scope
    pub fn cursor(&mut self) -> StorageResult<Cursor<'_>> {
        Cursor::begin(&self.conn)
    }

    /// Run `f` inside a cursor: commit if it returns `Ok`, roll back if it
    /// returns `Err`.
    pub fn with_cursor<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Cursor<'_>) -> Result<T, E>,
        E: From<super::StorageError>,
    {
        let cursor = self.cursor()?;
        match f(&cursor) {
            Ok(value) => {
                cursor.commit()?;
                Ok(value)
            }
            Err(err) => {
                drop(cursor);
                Err(err)
            }
        }
    }

    /// Discard any abandoned transaction and close the connection
    pub fn close(self) -> StorageResult<()> {
        if let Err(e) = discard_abandoned(&self.conn) {
            warn!("could not roll back before close: {}", e);
        }
        self.conn.close().map_err(|(_, e)| e)?;
        debug!("sqlite backend closed");
        Ok(())
    }
}

impl Backend for SqliteBackend {
    fn create_db_if_needed(&mut self) -> StorageResult<()> {
        self.with_cursor(|cursor| cursor.execute(CREATE_TABLE, []).map(|_| ()))
    }

    fn save(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let inserted = self.with_cursor(|cursor| cursor.insert(key, value))?;
        trace!("save {}={:?} (new: {})", key, value, inserted);
        Ok(())
    }

    fn fetch(&self, key: &str) -> StorageResult<Vec<String>> {
        discard_abandoned(&self.conn)?;
        fetch_values(&self.conn, key)
    }

    fn close(self: Box<Self>) -> StorageResult<()> {
        SqliteBackend::close(*self)
    }
}
