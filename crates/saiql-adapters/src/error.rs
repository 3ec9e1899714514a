//! Error types for the adapter layer.
//!
//! Expected operational failures (constraint violations, timeouts on reads)
//! are **not** errors here: they come back as [`crate::executor::ExecResult`]
//! records. `AdapterError` covers the failures that end an operation:
//! configuration problems, lost connections, and strict-mode type refusals.

use saiql_core::{Dialect, MigrationLevel};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    /// The adapter advertises this via `supports(level)`; callers that ask
    /// anyway get a reasoned refusal, not a panic.
    #[error("{dialect} adapter does not support {level}")]
    NotSupported {
        dialect: Dialect,
        level: MigrationLevel,
    },

    /// Raised only under `strict_types`; permissive mode flags the column
    /// and continues.
    #[error("unsupported column type in strict mode: {table}.{column} ({native_type})")]
    StrictType {
        table: String,
        column: String,
        native_type: String,
    },
}
