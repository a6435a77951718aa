//! Error type for `ovaldict-store`.
//!
//! Nothing here is retried internally; every variant wraps the underlying
//! engine error with enough context (dialect, target, object) to diagnose
//! a failure without re-running under debug logging.

use thiserror::Error;

use crate::dialect::Dialect;

#[derive(Debug, Error)]
pub enum Error {
  /// Registry failure (unknown family or SUSE variant).
  #[error(transparent)]
  Core(#[from] ovaldict_core::Error),

  /// Configuration failure, detected before any I/O.
  #[error("unknown database dialect {0:?} (expected \"sqlite3\" or \"mysql\")")]
  UnknownDialect(String),

  /// Configuration failure, detected before any I/O.
  #[error("invalid connection target for dialect {dialect}: {target}")]
  InvalidTarget { dialect: Dialect, target: String },

  #[error("failed to open {dialect} database at {target}: {source}")]
  Open {
    dialect: Dialect,
    target:  String,
    #[source]
    source:  sqlx::Error,
  },

  /// Migration failure; fatal to startup. `object` names the table or
  /// index whose creation failed.
  #[error("failed to migrate {object}: {source}")]
  Migration {
    object: &'static str,
    #[source]
    source: sqlx::Error,
  },

  #[error("failed to apply {pragma}: {source}")]
  Pragma {
    pragma: &'static str,
    #[source]
    source: sqlx::Error,
  },

  /// Engine failure during a lookup.
  #[error("query failed: {0}")]
  Query(#[source] sqlx::Error),

  /// Engine failure during a write (insert/update/delete/transaction).
  #[error("failed to write {what}: {source}")]
  Write {
    what:   &'static str,
    #[source]
    source: sqlx::Error,
  },

  /// The engine did not report a generated id for an inserted row, so
  /// child rows cannot be attached.
  #[error("no insert id reported for table {table}")]
  MissingInsertId { table: &'static str },

  /// A stored timestamp column does not parse as RFC 3339.
  #[error("corrupt timestamp {value:?} in store: {source}")]
  Timestamp {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
