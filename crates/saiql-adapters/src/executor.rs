//! The executor seam between adapters and driver layers.
//!
//! Adapters speak SQL through [`SqlExecutor`] and get back result records,
//! never exceptions: a constraint violation is data of the run, not a bug.
//! Rows are mappings of lowercase field name to value; case folding happens
//! here, at the boundary, once.

use std::collections::BTreeMap;
use std::fmt;

/// One column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Bool(b) => Some(*b as i64),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Truthiness across driver representations: native booleans, integer
    /// flags and YES/NO-style catalog strings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(v) => Some(*v != 0),
            Self::Text(s) => match s.to_lowercase().as_str() {
                "yes" | "true" | "t" | "y" | "1" => Some(true),
                "no" | "false" | "f" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Canonical rendering used for seed hashing; stable across runs.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => v.to_string(),
            // Ryu-style shortest form via the standard formatter is stable
            // for a fixed value.
            Self::Real(v) => format!("{v}"),
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Bytes(b) => {
                let mut out = String::with_capacity(2 + b.len() * 2);
                out.push_str("0x");
                for byte in b {
                    out.push_str(&format!("{byte:02x}"));
                }
                out
            }
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A result row: lowercase field name → value.
pub type Row = BTreeMap<String, SqlValue>;

/// Build a row from field/value pairs, folding names to lowercase.
pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    pairs
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.clone()))
        .collect()
}

/// Classified failure category for result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// Constraint violation. Never retried.
    Integrity,
    /// Lock timeout or deadlock. Bounded retry for reads.
    Transient,
    Timeout,
    Connection,
    Other,
}

/// Outcome of one statement. Mutating calls populate `rows_affected`;
/// queries populate `rows`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResult {
    pub success: bool,
    pub rows: Vec<Row>,
    pub rows_affected: Option<u64>,
    pub error: Option<String>,
    pub error_kind: Option<ExecErrorKind>,
}

impl ExecResult {
    pub fn ok_rows(rows: Vec<Row>) -> Self {
        Self {
            success: true,
            rows,
            rows_affected: None,
            error: None,
            error_kind: None,
        }
    }

    pub fn ok_affected(rows_affected: u64) -> Self {
        Self {
            success: true,
            rows: Vec::new(),
            rows_affected: Some(rows_affected),
            error: None,
            error_kind: None,
        }
    }

    pub fn fail(error: impl Into<String>, kind: ExecErrorKind) -> Self {
        Self {
            success: false,
            rows: Vec::new(),
            rows_affected: None,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    pub fn is_integrity_violation(&self) -> bool {
        self.error_kind == Some(ExecErrorKind::Integrity)
    }
}

/// Classify a driver error message into a result-record category.
pub fn classify_error(message: &str) -> ExecErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("unique")
        || lower.contains("constraint")
        || lower.contains("foreign key")
        || lower.contains("duplicate")
        || lower.contains("primary key")
    {
        ExecErrorKind::Integrity
    } else if lower.contains("deadlock") || lower.contains("lock wait") {
        ExecErrorKind::Transient
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ExecErrorKind::Timeout
    } else if lower.contains("connection") || lower.contains("connect") {
        ExecErrorKind::Connection
    } else {
        ExecErrorKind::Other
    }
}

/// The driver seam. One executor is owned by exactly one adapter.
pub trait SqlExecutor: Send {
    /// Run a row-returning statement.
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult;

    /// Run a mutating statement.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult;
}

/// A scripted executor for tests and dry runs: responds to queries by
/// substring match against registered fixtures, in registration order.
#[derive(Debug, Default)]
pub struct FixtureExecutor {
    fixtures: Vec<(String, ExecResult)>,
    /// Every statement seen, in order.
    pub executed: Vec<String>,
}

impl FixtureExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to any statement containing `needle` (case-insensitive).
    pub fn on(mut self, needle: &str, result: ExecResult) -> Self {
        self.fixtures.push((needle.to_lowercase(), result));
        self
    }

    /// Shorthand for a row-returning fixture.
    pub fn on_rows(self, needle: &str, rows: Vec<Row>) -> Self {
        self.on(needle, ExecResult::ok_rows(rows))
    }

    fn respond(&mut self, sql: &str) -> Option<ExecResult> {
        let lowered = sql.to_lowercase();
        self.executed.push(sql.to_string());
        self.fixtures
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, result)| result.clone())
    }
}

impl SqlExecutor for FixtureExecutor {
    fn query(&mut self, sql: &str, _params: &[SqlValue]) -> ExecResult {
        self.respond(sql).unwrap_or_else(|| ExecResult::ok_rows(Vec::new()))
    }

    fn execute(&mut self, sql: &str, _params: &[SqlValue]) -> ExecResult {
        self.respond(sql).unwrap_or_else(|| ExecResult::ok_affected(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_folds_field_names_to_lowercase() {
        let r = row(&[("TABLE_NAME", SqlValue::Text("CUSTOMERS".into()))]);
        assert!(r.contains_key("table_name"));
        assert!(!r.contains_key("TABLE_NAME"));
    }

    #[test]
    fn test_as_bool_coercions() {
        assert_eq!(SqlValue::Text("YES".into()).as_bool(), Some(true));
        assert_eq!(SqlValue::Text("NO".into()).as_bool(), Some(false));
        assert_eq!(SqlValue::Integer(1).as_bool(), Some(true));
        assert_eq!(SqlValue::Bool(false).as_bool(), Some(false));
        assert_eq!(SqlValue::Text("maybe".into()).as_bool(), None);
    }

    #[test]
    fn test_classify_error() {
        assert_eq!(
            classify_error("UNIQUE constraint failed: users.id"),
            ExecErrorKind::Integrity
        );
        assert_eq!(
            classify_error("FOREIGN KEY constraint failed"),
            ExecErrorKind::Integrity
        );
        assert_eq!(classify_error("Lock wait timeout exceeded"), ExecErrorKind::Transient);
        assert_eq!(classify_error("statement timed out"), ExecErrorKind::Timeout);
        assert_eq!(classify_error("connection refused"), ExecErrorKind::Connection);
        assert_eq!(classify_error("syntax error"), ExecErrorKind::Other);
    }

    #[test]
    fn test_fixture_executor_matches_substring() {
        let mut exec = FixtureExecutor::new().on_rows(
            "from information_schema.tables",
            vec![row(&[("table_name", SqlValue::Text("orders".into()))])],
        );
        let result = exec.query(
            "SELECT table_name FROM information_schema.tables ORDER BY table_name",
            &[],
        );
        assert!(result.success);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(exec.executed.len(), 1);
    }

    #[test]
    fn test_fixture_executor_default_empty() {
        let mut exec = FixtureExecutor::new();
        let result = exec.query("SELECT 1", &[]);
        assert!(result.success);
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_render_stability() {
        assert_eq!(SqlValue::Real(150.0).render(), "150");
        assert_eq!(SqlValue::Real(250.5).render(), "250.5");
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).render(), "0xdead");
        assert_eq!(SqlValue::Null.render(), "NULL");
    }
}
