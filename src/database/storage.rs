//! Per-strategy view onto an example database.

use std::vec;

use log::{debug, trace};

use super::{DatabaseKey, ExampleDatabase, StorageError, StorageResult};
use crate::strategy::Strategy;

/// A database bound to one key, moving values of one strategy in and out
#[derive(Debug)]
pub struct Storage<'db, S> {
    database: &'db ExampleDatabase,
    key: DatabaseKey,
    strategy: S,
}

impl<'db, S: Strategy> Storage<'db, S> {
    pub(crate) fn new(database: &'db ExampleDatabase, key: DatabaseKey, strategy: S) -> Self {
        Storage {
            database,
            key,
            strategy,
        }
    }

    pub fn key(&self) -> &DatabaseKey {
        &self.key
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Encode `value` and save it under this view's key
    pub fn save(&self, value: &S::Value) -> StorageResult<()> {
        let encoded = self.strategy.encode(value);
        trace!("storing {:?} under {}", encoded, self.key);
        self.database.save(&self.key, &encoded)
    }

    /// Every value stored under this key, decoded one at a time as the
    /// iterator is advanced
    pub fn fetch(&self) -> StorageResult<StoredExamples<'_, S>> {
        let encoded = self.fetch_encoded()?;
        Ok(StoredExamples {
            strategy: &self.strategy,
            key: &self.key,
            encoded: encoded.into_iter(),
        })
    }

    /// Stored strings without decoding them
    pub fn fetch_encoded(&self) -> StorageResult<Vec<String>> {
        let encoded = self.database.fetch(&self.key)?;
        debug!("fetched {} stored examples under {}", encoded.len(), self.key);
        Ok(encoded)
    }

    /// Decode one stored string, tagging failures with this view's key
    pub fn decode(&self, encoded: &str) -> StorageResult<S::Value> {
        decode_stored(&self.strategy, &self.key, encoded)
    }
}

fn decode_stored<S: Strategy>(
    strategy: &S,
    key: &DatabaseKey,
    encoded: &str,
) -> StorageResult<S::Value> {
    strategy.decode(encoded).map_err(|source| StorageError::Decode {
        key: key.to_string(),
        source,
    })
}

/// Lazily decoding iterator over stored examples. A value that fails to
/// decode is yielded as an error in its place; iteration continues after it.
#[derive(Debug)]
pub struct StoredExamples<'a, S> {
    strategy: &'a S,
    key: &'a DatabaseKey,
    encoded: vec::IntoIter<String>,
}

impl<S: Strategy> Iterator for StoredExamples<'_, S> {
    type Item = StorageResult<S::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let encoded = self.encoded.next()?;
        Some(decode_stored(self.strategy, self.key, &encoded))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.encoded.size_hint()
    }
}
