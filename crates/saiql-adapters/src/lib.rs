pub mod adapter;
pub mod config;
pub mod ddl;
pub mod error;
pub mod executor;
pub mod hana;
#[cfg(feature = "live-pool")]
pub mod live;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

// Re-export the adapter surface
pub use adapter::{
    fold_name, AdapterStatistics, BulkOutcome, DataExtract, DialectAdapter, ExtractStats,
    SessionInfo,
};
pub use config::{redact_url, ConnectionConfig, RedactedEndpoint, SslMode};
pub use error::AdapterError;
pub use executor::{
    classify_error, row, ExecErrorKind, ExecResult, FixtureExecutor, Row, SqlExecutor, SqlValue,
};
pub use hana::HanaAdapter;
#[cfg(feature = "live-pool")]
pub use live::SqlxExecutor;
pub use mssql::MssqlAdapter;
pub use mysql::MysqlAdapter;
pub use oracle::OracleAdapter;
pub use postgres::PostgresAdapter;
pub use sqlite::{RusqliteExecutor, SqliteAdapter};
