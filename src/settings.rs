//! Explicit configuration passed to whoever builds sources and databases.

use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::database::{ExampleDatabase, StorageResult};
use crate::source::SourceConfig;

/// Where examples are persisted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseLocation {
    /// Nothing is saved or replayed
    Disabled,
    /// SQLite in memory, gone when the database is dropped
    #[default]
    InMemory,
    /// SQLite file, created if missing
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseLocation,
    pub source: SourceConfig,
}

impl Settings {
    /// Open the configured database, or `None` when persistence is disabled
    pub fn open_database(&self) -> StorageResult<Option<ExampleDatabase>> {
        match &self.database {
            DatabaseLocation::Disabled => {
                debug!("example database disabled");
                Ok(None)
            }
            DatabaseLocation::InMemory => ExampleDatabase::in_memory().map(Some),
            DatabaseLocation::File(path) => ExampleDatabase::open(path).map(Some),
        }
    }
}
