//! # examplesource
//!
//! The example generation core of a Hypothesis-style property-based testing
//! engine.
//!
//! An `ExampleSource` hands out candidate inputs one at a time: first every
//! example persisted for its strategy, then freshly generated ones. Callers
//! report back which examples were interesting with `mark_good` and
//! `mark_bad`, and the source steers generation towards the strategy
//! parameters that keep producing interesting values. Interesting values are
//! saved to an `ExampleDatabase` so later runs replay them first.

pub mod database;
pub mod errors;
pub mod pool;
pub mod schema;
pub mod settings;
pub mod source;
pub mod strategies;
pub mod strategy;

// Re-export core types for easy access
pub use database::{
    Backend, DatabaseKey, ExampleDatabase, InMemoryBackend, SqliteBackend, Storage, StorageError,
    StorageResult,
};
pub use errors::{FeedbackMisuse, SourceError};
pub use pool::{ParameterId, ParameterPool, Weighting};
pub use schema::{
    FieldKind, FieldMapping, FieldSpec, FieldStrategy, FieldValue, ModelSchema, ModelStrategy,
    Record, SchemaError, StrategyTable,
};
pub use settings::{DatabaseLocation, Settings};
pub use source::{ExampleSource, SourceBuilder, SourceConfig, SourceState};
pub use strategies::{BooleanStrategy, BytesStrategy, FloatStrategy, IntegerStrategy, TextStrategy};
pub use strategy::{DecodeError, Strategy};
