//! Durable storage for examples worth replaying.
//!
//! The persistence layer consists of:
//! - `Backend` trait: a key to multi-value string store with set semantics
//! - `SqliteBackend`: one SQLite table of `(key, value)` pairs with
//!   transactional cursors
//! - `InMemoryBackend`: map-backed storage for tests and ephemeral runs
//! - `ExampleDatabase`: owns a backend and hands out per-strategy `Storage`
//!   views that encode and decode values
//! - `DatabaseKey`: stable key derived from a strategy's description
//!
//! # Example Usage
//!
//! ```rust
//! use examplesource::database::ExampleDatabase;
//! use examplesource::strategies::IntegerStrategy;
//!
//! let db = ExampleDatabase::in_memory()?;
//! let storage = db.storage_for(IntegerStrategy::new());
//! storage.save(&17)?;
//!
//! let replayed: Vec<i64> = storage.fetch()?.collect::<Result<_, _>>()?;
//! assert_eq!(replayed, vec![17]);
//! # Ok::<(), examplesource::database::StorageError>(())
//! ```

pub mod memory;
pub mod sqlite;
pub mod storage;

pub use memory::InMemoryBackend;
pub use sqlite::{Cursor, SqliteBackend};
pub use storage::{Storage, StoredExamples};

use std::cell::RefCell;
use std::fmt;
use std::path::Path;

use log::debug;
use sha2::{Digest, Sha256};

use crate::strategy::{DecodeError, Strategy};

/// Type alias for database operation results
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures of the example database
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt example under key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },
}

/// Key identifying the examples of one strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseKey(String);

impl DatabaseKey {
    /// Derive a key from a strategy description: hex SHA-256 of its bytes
    pub fn from_description(description: &str) -> Self {
        let digest = Sha256::digest(description.as_bytes());
        DatabaseKey(hex::encode(digest))
    }

    pub fn for_strategy<S: Strategy + ?Sized>(strategy: &S) -> Self {
        Self::from_description(&strategy.describe())
    }

    /// Use an already chosen key verbatim
    pub fn raw(key: impl Into<String>) -> Self {
        DatabaseKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key to multi-value store with set semantics per key
pub trait Backend {
    /// Create whatever schema the backend needs; safe to call repeatedly
    fn create_db_if_needed(&mut self) -> StorageResult<()>;

    /// Save a value under a key. Saving a pair that is already present is a
    /// no-op.
    fn save(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Every distinct value ever saved under `key`, in no particular order
    fn fetch(&self, key: &str) -> StorageResult<Vec<String>>;

    /// Release the backend's resources, discarding uncommitted state
    fn close(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}

/// A backend plus per-strategy views onto it
pub struct ExampleDatabase {
    backend: RefCell<Box<dyn Backend>>,
}

impl fmt::Debug for ExampleDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleDatabase")
            .field("backend", &"<dyn Backend>")
            .finish()
    }
}

impl ExampleDatabase {
    /// Wrap a backend, creating its schema if needed
    pub fn new<B: Backend + 'static>(mut backend: B) -> StorageResult<Self> {
        backend.create_db_if_needed()?;
        Ok(ExampleDatabase {
            backend: RefCell::new(Box::new(backend)),
        })
    }

    /// SQLite database living in memory for the lifetime of this value
    pub fn in_memory() -> StorageResult<Self> {
        Self::new(SqliteBackend::in_memory()?)
    }

    /// SQLite database file at `path`, created if missing
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        debug!("opening example database at {}", path.as_ref().display());
        Self::new(SqliteBackend::open(path)?)
    }

    /// A view storing values of `strategy` under the strategy's own key
    pub fn storage_for<S: Strategy>(&self, strategy: S) -> Storage<'_, S> {
        let key = DatabaseKey::for_strategy(&strategy);
        Storage::new(self, key, strategy)
    }

    /// A view storing values of `strategy` under an explicit key
    pub fn storage_with_key<S: Strategy>(&self, key: DatabaseKey, strategy: S) -> Storage<'_, S> {
        Storage::new(self, key, strategy)
    }

    pub fn save(&self, key: &DatabaseKey, value: &str) -> StorageResult<()> {
        self.backend.borrow_mut().save(key.as_str(), value)
    }

    pub fn fetch(&self, key: &DatabaseKey) -> StorageResult<Vec<String>> {
        self.backend.borrow().fetch(key.as_str())
    }

    /// Close the underlying backend. Views borrow the database, so none can
    /// outlive this call.
    pub fn close(self) -> StorageResult<()> {
        self.backend.into_inner().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{IntegerStrategy, TextStrategy};

    #[test]
    fn test_database_key_is_stable_hex_digest() {
        let key = DatabaseKey::from_description("integers");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, DatabaseKey::for_strategy(&IntegerStrategy::new()));
    }

    #[test]
    fn test_distinct_strategies_get_distinct_keys() {
        let ints = DatabaseKey::for_strategy(&IntegerStrategy::new());
        let naturals = DatabaseKey::for_strategy(&IntegerStrategy::non_negative());
        let text = DatabaseKey::for_strategy(&TextStrategy::new());
        assert_ne!(ints, naturals);
        assert_ne!(ints, text);
    }

    #[test]
    fn test_database_save_and_fetch_by_key() {
        let db = ExampleDatabase::new(InMemoryBackend::new()).unwrap();
        let key = DatabaseKey::raw("k");
        db.save(&key, "v1").unwrap();
        db.save(&key, "v1").unwrap();
        db.save(&key, "v2").unwrap();

        let mut values = db.fetch(&key).unwrap();
        values.sort();
        assert_eq!(values, vec!["v1".to_string(), "v2".to_string()]);
        db.close().unwrap();
    }
}
