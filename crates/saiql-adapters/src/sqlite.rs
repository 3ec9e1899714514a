//! SQLite adapter: L0, L1, L2 and L4, natively over rusqlite.
//!
//! Every connection gets the PRAGMA baseline (`foreign_keys=ON`,
//! `recursive_triggers=OFF`) applied explicitly; the run bundle records it
//! and never relies on engine defaults. SQLite has no stored routines, so
//! `supports(L3)` is false; its L3 story is the function-dependency
//! analysis exposed as adapter extras.

use crate::adapter::{
    fold_name, AdapterStatistics, DataExtract, DialectAdapter, ExtractStats, SessionInfo,
};
use crate::error::AdapterError;
use crate::executor::{classify_error, ExecResult, Row, SqlExecutor, SqlValue};
use rusqlite::Connection;
use saiql_core::analyzer::functions::{self, FunctionDependencyAnalysis};
use saiql_core::analyzer::TriggerAnalyzer;
use saiql_core::{
    registry, Classification, Column, Dialect, ForeignKey, IndexDef, MigrationLevel, ReasonCode,
    TableSchema, Trigger, TriggerEvent, TriggerScope, TriggerTiming, UniqueConstraint, ViewDef,
    ViewDependency,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// [`SqlExecutor`] over a rusqlite connection.
pub struct RusqliteExecutor {
    conn: Connection,
}

impl RusqliteExecutor {
    pub fn open(path: &Path) -> Result<Self, AdapterError> {
        let conn =
            Connection::open(path).map_err(|e| AdapterError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, AdapterError> {
        let conn =
            Connection::open_in_memory().map_err(|e| AdapterError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

fn to_rusqlite(value: &SqlValue) -> rusqlite::types::Value {
    use rusqlite::types::Value;
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Real(v) => Value::Real(*v),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bool(b) => Value::Integer(*b as i64),
        SqlValue::Bytes(b) => Value::Blob(b.clone()),
    }
}

fn from_rusqlite(value: rusqlite::types::Value) -> SqlValue {
    use rusqlite::types::Value;
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(v),
        Value::Real(v) => SqlValue::Real(v),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Bytes(b),
    }
}

impl SqlExecutor for RusqliteExecutor {
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        let converted: Vec<rusqlite::types::Value> = params.iter().map(to_rusqlite).collect();

        let mut stmt = match self.conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                let msg = e.to_string();
                let kind = classify_error(&msg);
                return ExecResult::fail(msg, kind);
            }
        };
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_lowercase())
            .collect();

        let mut rows = match stmt.query(rusqlite::params_from_iter(converted)) {
            Ok(rows) => rows,
            Err(e) => {
                let msg = e.to_string();
                let kind = classify_error(&msg);
                return ExecResult::fail(msg, kind);
            }
        };

        let mut out: Vec<Row> = Vec::new();
        loop {
            match rows.next() {
                Ok(Some(r)) => {
                    let mut mapped = Row::new();
                    for (i, name) in names.iter().enumerate() {
                        let value = r
                            .get::<_, rusqlite::types::Value>(i)
                            .map(from_rusqlite)
                            .unwrap_or(SqlValue::Null);
                        mapped.insert(name.clone(), value);
                    }
                    out.push(mapped);
                }
                Ok(None) => break,
                Err(e) => {
                    let msg = e.to_string();
                    let kind = classify_error(&msg);
                    return ExecResult::fail(msg, kind);
                }
            }
        }
        ExecResult::ok_rows(out)
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        // Multi-statement scripts go through the batch API.
        if params.is_empty() && sql.trim_end().trim_end_matches(';').contains(';') {
            return match self.conn.execute_batch(sql) {
                Ok(()) => ExecResult::ok_affected(0),
                Err(e) => {
                    let msg = e.to_string();
                    let kind = classify_error(&msg);
                    ExecResult::fail(msg, kind)
                }
            };
        }

        let converted: Vec<rusqlite::types::Value> = params.iter().map(to_rusqlite).collect();
        match self
            .conn
            .execute(sql, rusqlite::params_from_iter(converted))
        {
            Ok(affected) => ExecResult::ok_affected(affected as u64),
            Err(e) => {
                let msg = e.to_string();
                let kind = classify_error(&msg);
                ExecResult::fail(msg, kind)
            }
        }
    }
}

/// The SQLite dialect adapter.
pub struct SqliteAdapter {
    exec: Box<dyn SqlExecutor>,
    strict_types: bool,
    stats: AdapterStatistics,
}

impl SqliteAdapter {
    /// Open a database file and apply the PRAGMA baseline.
    pub fn open(path: &Path) -> Result<Self, AdapterError> {
        Self::with_executor(Box::new(RusqliteExecutor::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, AdapterError> {
        Self::with_executor(Box::new(RusqliteExecutor::open_in_memory()?))
    }

    /// Wrap any executor (tests use fixtures). The PRAGMA baseline is still
    /// applied through it.
    pub fn with_executor(mut exec: Box<dyn SqlExecutor>) -> Result<Self, AdapterError> {
        for pragma in ["PRAGMA foreign_keys=ON", "PRAGMA recursive_triggers=OFF"] {
            let result = exec.execute(pragma, &[]);
            if !result.success {
                return Err(AdapterError::Connection(format!(
                    "failed to apply {pragma}: {}",
                    result.error.unwrap_or_default()
                )));
            }
        }
        Ok(Self {
            exec,
            strict_types: false,
            stats: AdapterStatistics::default(),
        })
    }

    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    fn run_query(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        self.stats.queries_executed += 1;
        let result = self.exec.query(sql, params);
        if !result.success {
            self.stats.failures += 1;
        }
        result
    }

    fn run_execute(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        self.stats.queries_executed += 1;
        let result = self.exec.execute(sql, params);
        if !result.success {
            self.stats.failures += 1;
        }
        result
    }

    /// The PRAGMA baseline as recorded in the run bundle.
    pub fn pragma_settings(&mut self) -> BTreeMap<String, String> {
        let mut settings = BTreeMap::new();
        for pragma in ["foreign_keys", "recursive_triggers", "journal_mode"] {
            let result = self.run_query(&format!("PRAGMA {pragma}"), &[]);
            if let Some(row) = result.rows.first() {
                if let Some(value) = row.values().next() {
                    settings.insert(pragma.to_string(), value.render());
                }
            }
        }
        settings
    }

    /// Function-dependency analysis for one SQL definition (L3 extra).
    pub fn analyze_function_dependencies(&self, sql: &str) -> FunctionDependencyAnalysis {
        functions::analyze_dependencies(sql)
    }

    /// Function-dependency analysis for every view and trigger in the
    /// database, keyed by object name.
    pub fn all_function_dependencies(
        &mut self,
    ) -> Result<BTreeMap<String, FunctionDependencyAnalysis>, AdapterError> {
        let mut out = BTreeMap::new();
        for view in self.list_views(None)? {
            out.insert(view.name.clone(), functions::analyze_dependencies(&view.definition));
        }
        for trigger in self.list_triggers(None)? {
            out.insert(
                trigger.name.clone(),
                functions::analyze_dependencies(&trigger.definition),
            );
        }
        Ok(out)
    }

    fn object_names(&mut self, kind: &str) -> Result<Vec<String>, AdapterError> {
        let result = self.run_query(
            "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[SqlValue::Text(kind.to_string())],
        );
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }
        Ok(result
            .rows
            .iter()
            .filter_map(|r| r.get("name").and_then(|v| v.as_str()))
            .map(fold_name)
            .collect())
    }

    fn classify_trigger(timing: TriggerTiming, scope: TriggerScope, definition: &str) -> Classification {
        let mut codes = Vec::new();
        match timing {
            TriggerTiming::After => codes.push(ReasonCode::AfterTrigger),
            TriggerTiming::InsteadOf => codes.push(ReasonCode::InsteadOfTrigger),
            TriggerTiming::Before => {}
        }
        if scope == TriggerScope::Statement {
            codes.push(ReasonCode::StatementLevelTrigger);
        }
        if codes.is_empty() {
            let analysis = TriggerAnalyzer::new(Dialect::Sqlite).analyze(definition);
            if analysis.is_supported() {
                Classification::allowed()
            } else {
                Classification::denied(analysis.reason_codes)
            }
        } else {
            Classification::denied(codes)
        }
    }
}

impl DialectAdapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn supports(&self, level: MigrationLevel) -> bool {
        // No stored routines in SQLite; L3 is limited to the dependency
        // analysis extras and is not part of the uniform surface.
        !matches!(level, MigrationLevel::L3)
    }

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError> {
        let mut info = SessionInfo::new(Dialect::Sqlite);
        let result = self.run_query("SELECT sqlite_version() AS version", &[]);
        info.version = result
            .rows
            .first()
            .and_then(|r| r.get("version"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        info.settings = self.pragma_settings();
        Ok(info)
    }

    fn statistics(&self) -> AdapterStatistics {
        self.stats
    }

    fn execute_raw(&mut self, sql: &str) -> ExecResult {
        self.run_execute(sql, &[])
    }

    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        self.run_execute(sql, params)
    }

    fn placeholder(&self, idx: usize) -> String {
        format!("?{idx}")
    }

    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError> {
        self.object_names("table")
    }

    fn get_schema(&mut self, table: &str) -> Result<TableSchema, AdapterError> {
        let result = self.run_query(&format!("PRAGMA table_info('{}')", escape_ident(table)), &[]);
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }

        let mut schema = TableSchema::default();
        // (pk ordinal, column name) so composite keys keep declared order.
        let mut pk_cols: Vec<(i64, String)> = Vec::new();

        for row in &result.rows {
            let name = row
                .get("name")
                .and_then(|v| v.as_str())
                .map(fold_name)
                .unwrap_or_default();
            let native_type = row
                .get("type")
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or("TEXT")
                .to_string();
            let type_info = registry::map_to_ir(Dialect::Sqlite, &native_type);
            let is_unsupported = type_info.is_unknown();

            if is_unsupported {
                if self.strict_types {
                    return Err(AdapterError::StrictType {
                        table: table.to_string(),
                        column: name,
                        native_type,
                    });
                }
                warn!(table, column = name.as_str(), native_type = native_type.as_str(),
                    "unsupported column type flagged");
            }

            let nullable = row.get("notnull").and_then(|v| v.as_i64()) == Some(0);
            let default = row
                .get("dflt_value")
                .filter(|v| !v.is_null())
                .map(|v| v.render());
            let pk_ordinal = row.get("pk").and_then(|v| v.as_i64()).unwrap_or(0);
            if pk_ordinal > 0 {
                pk_cols.push((pk_ordinal, name.clone()));
            }

            schema.columns.push(Column {
                name,
                native_type,
                type_info,
                nullable,
                default,
                is_unsupported,
            });
        }

        pk_cols.sort();
        schema.pk = pk_cols.into_iter().map(|(_, name)| name).collect();

        let fk_result = self.run_query(
            &format!("PRAGMA foreign_key_list('{}')", escape_ident(table)),
            &[],
        );
        for row in &fk_result.rows {
            let id = row.get("id").and_then(|v| v.as_i64()).unwrap_or(0);
            schema.fks.push(ForeignKey {
                constraint_name: format!("fk_{}_{}", fold_name(table), id),
                column: row
                    .get("from")
                    .and_then(|v| v.as_str())
                    .map(fold_name)
                    .unwrap_or_default(),
                ref_table: row
                    .get("table")
                    .and_then(|v| v.as_str())
                    .map(fold_name)
                    .unwrap_or_default(),
                ref_column: row
                    .get("to")
                    .and_then(|v| v.as_str())
                    .map(fold_name)
                    .unwrap_or_default(),
            });
        }

        schema.indexes = self.get_indexes(table)?;
        schema.unique_constraints = schema
            .indexes
            .iter()
            .filter(|ix| ix.unique && !ix.primary)
            .map(|ix| UniqueConstraint {
                name: ix.name.clone(),
                columns: ix.columns.clone(),
            })
            .collect();

        Ok(schema)
    }

    fn extract_data(
        &mut self,
        table: &str,
        order_by: Option<&str>,
        chunk_size: usize,
    ) -> Result<DataExtract, AdapterError> {
        let started = Instant::now();
        let chunk_size = chunk_size.max(1);

        let order_key = match order_by {
            Some(key) => key.to_string(),
            None => {
                let schema = self.get_schema(table)?;
                schema
                    .pk
                    .first()
                    .cloned()
                    .or_else(|| schema.columns.first().map(|c| c.name.clone()))
                    .ok_or_else(|| {
                        AdapterError::Query(format!("table {table} has no columns"))
                    })?
            }
        };

        let mut rows: Vec<Row> = Vec::new();
        let mut chunks = 0usize;
        loop {
            let sql = format!(
                "SELECT * FROM \"{}\" ORDER BY \"{}\" LIMIT {} OFFSET {}",
                escape_ident(table),
                escape_ident(&order_key),
                chunk_size,
                rows.len()
            );
            let result = self.run_query(&sql, &[]);
            if !result.success {
                return Err(AdapterError::Query(result.error.unwrap_or_default()));
            }
            let batch_len = result.rows.len();
            rows.extend(result.rows);
            chunks += 1;
            if batch_len < chunk_size {
                break;
            }
        }

        debug!(table, rows = rows.len(), order_key = order_key.as_str(), "extracted data");
        Ok(DataExtract {
            stats: ExtractStats {
                row_count: rows.len(),
                duration_ms: started.elapsed().as_millis() as u64,
                order_key_used: order_key,
                chunk_size,
                chunks,
            },
            rows,
        })
    }

    fn get_primary_keys(&mut self, table: &str) -> Result<Vec<String>, AdapterError> {
        Ok(self.get_schema(table)?.pk)
    }

    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKey>, AdapterError> {
        Ok(self.get_schema(table)?.fks)
    }

    fn get_unique_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<UniqueConstraint>, AdapterError> {
        Ok(self.get_schema(table)?.unique_constraints)
    }

    fn get_indexes(&mut self, table: &str) -> Result<Vec<IndexDef>, AdapterError> {
        let list = self.run_query(
            &format!("PRAGMA index_list('{}')", escape_ident(table)),
            &[],
        );
        if !list.success {
            return Err(AdapterError::Query(list.error.unwrap_or_default()));
        }

        let mut indexes = Vec::new();
        let index_meta: Vec<(String, bool, String)> = list
            .rows
            .iter()
            .map(|row| {
                (
                    row.get("name")
                        .and_then(|v| v.as_str())
                        .map(fold_name)
                        .unwrap_or_default(),
                    row.get("unique").and_then(|v| v.as_bool()).unwrap_or(false),
                    row.get("origin")
                        .and_then(|v| v.as_str())
                        .unwrap_or("c")
                        .to_string(),
                )
            })
            .collect();
        for (name, unique, origin) in index_meta {
            let info = self.run_query(&format!("PRAGMA index_info('{}')", escape_ident(&name)), &[]);
            let columns: Vec<String> = info
                .rows
                .iter()
                .filter_map(|r| r.get("name").and_then(|v| v.as_str()))
                .map(fold_name)
                .collect();
            indexes.push(IndexDef {
                name,
                columns,
                unique,
                primary: origin == "pk",
            });
        }
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }

    fn list_views(&mut self, _schema: Option<&str>) -> Result<Vec<ViewDef>, AdapterError> {
        let view_names: BTreeSet<String> = self.object_names("view")?.into_iter().collect();
        let table_names: BTreeSet<String> = self.list_tables()?.into_iter().collect();

        let result = self.run_query(
            "SELECT name, sql FROM sqlite_master WHERE type = 'view' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        );
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }

        Ok(result
            .rows
            .iter()
            .map(|row| {
                let name = row
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(fold_name)
                    .unwrap_or_default();
                let definition = row
                    .get("sql")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let dependencies =
                    crate::ddl::scan_view_dependencies(&definition, &table_names, &view_names, &name);
                ViewDef {
                    schema: None,
                    name,
                    definition,
                    dependencies,
                }
            })
            .collect())
    }

    fn get_view_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let result = self.run_query(
            "SELECT sql FROM sqlite_master WHERE type = 'view' AND lower(name) = lower(?1)",
            &[SqlValue::Text(name.to_string())],
        );
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }
        Ok(result
            .rows
            .first()
            .and_then(|r| r.get("sql"))
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn get_view_dependencies(&mut self, name: &str) -> Result<Vec<ViewDependency>, AdapterError> {
        let views = self.list_views(None)?;
        Ok(views
            .into_iter()
            .find(|v| v.name == fold_name(name))
            .map(|v| v.dependencies)
            .unwrap_or_default())
    }

    fn drop_view(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP VIEW IF EXISTS {name}"))
    }

    fn list_triggers(&mut self, _schema: Option<&str>) -> Result<Vec<Trigger>, AdapterError> {
        let result = self.run_query(
            "SELECT name, tbl_name, sql FROM sqlite_master WHERE type = 'trigger' ORDER BY name",
            &[],
        );
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }

        Ok(result
            .rows
            .iter()
            .map(|row| {
                let name = row
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(fold_name)
                    .unwrap_or_default();
                let table = row
                    .get("tbl_name")
                    .and_then(|v| v.as_str())
                    .map(fold_name)
                    .unwrap_or_default();
                let definition = row
                    .get("sql")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let lower = definition.to_lowercase();

                let timing = if lower.contains("instead of") {
                    TriggerTiming::InsteadOf
                } else if lower.contains("after") {
                    TriggerTiming::After
                } else {
                    TriggerTiming::Before
                };
                let mut events = Vec::new();
                if lower.contains("insert") {
                    events.push(TriggerEvent::Insert);
                }
                if lower.contains("update") {
                    events.push(TriggerEvent::Update);
                }
                if lower.contains("delete") {
                    events.push(TriggerEvent::Delete);
                }
                // SQLite triggers are always row-level.
                let scope = TriggerScope::Row;
                let classification = Self::classify_trigger(timing, scope, &definition);
                let body = saiql_core::analyzer::trigger::extract_trigger_body(&definition);

                Trigger {
                    schema: None,
                    name,
                    table,
                    timing,
                    events,
                    scope,
                    body,
                    definition,
                    classification,
                }
            })
            .collect())
    }

    fn get_trigger_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let result = self.run_query(
            "SELECT sql FROM sqlite_master WHERE type = 'trigger' AND lower(name) = lower(?1)",
            &[SqlValue::Text(name.to_string())],
        );
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }
        Ok(result
            .rows
            .first()
            .and_then(|r| r.get("sql"))
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn drop_trigger(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP TRIGGER IF EXISTS {name}"))
    }
}

fn escape_ident(ident: &str) -> String {
    ident.replace('\'', "''").replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteAdapter {
        let mut adapter = SqliteAdapter::open_in_memory().unwrap();
        let setup = r#"
            CREATE TABLE departments (
                id INTEGER PRIMARY KEY,
                name VARCHAR(100) NOT NULL
            );
            CREATE TABLE employees (
                id INTEGER PRIMARY KEY,
                dept_id INTEGER REFERENCES departments(id),
                email TEXT,
                salary NUMERIC(10,2),
                active INTEGER DEFAULT 1
            );
            CREATE UNIQUE INDEX ix_employees_email ON employees(email);
            INSERT INTO departments VALUES (1, 'eng'), (2, 'ops');
            INSERT INTO employees VALUES (3, 1, 'c@x.io', 90.5, 1);
            INSERT INTO employees VALUES (1, 1, 'a@x.io', 100.0, 1);
            INSERT INTO employees VALUES (2, 2, 'b@x.io', 80.0, 0);
        "#;
        let result = adapter.execute_raw(setup);
        assert!(result.success, "{:?}", result.error);
        adapter
    }

    #[test]
    fn test_list_tables_sorted() {
        let mut adapter = seeded();
        assert_eq!(adapter.list_tables().unwrap(), vec!["departments", "employees"]);
    }

    #[test]
    fn test_get_schema_columns_in_ordinal_order() {
        let mut adapter = seeded();
        let schema = adapter.get_schema("employees").unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "dept_id", "email", "salary", "active"]);
        assert_eq!(schema.pk, vec!["id"]);
        assert_eq!(schema.fks.len(), 1);
        assert_eq!(schema.fks[0].ref_table, "departments");
    }

    #[test]
    fn test_unique_index_surfaces_as_constraint() {
        let mut adapter = seeded();
        let schema = adapter.get_schema("employees").unwrap();
        assert!(schema
            .unique_constraints
            .iter()
            .any(|u| u.columns == vec!["email"]));
    }

    #[test]
    fn test_extract_data_is_ordered_and_recorded() {
        let mut adapter = seeded();
        let extract = adapter.extract_data("employees", None, 2).unwrap();
        assert_eq!(extract.stats.order_key_used, "id");
        assert_eq!(extract.stats.row_count, 3);
        let ids: Vec<i64> = extract
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_extract_data_stable_across_runs() {
        let mut adapter = seeded();
        let first = adapter.extract_data("employees", None, 10).unwrap();
        let second = adapter.extract_data("employees", None, 10).unwrap();
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_duplicate_pk_insert_is_integrity_data_not_error() {
        let mut adapter = seeded();
        let result = adapter.execute_raw("INSERT INTO departments VALUES (1, 'dup')");
        assert!(!result.success);
        assert!(result.is_integrity_violation());
    }

    #[test]
    fn test_fk_violation_is_integrity_data() {
        let mut adapter = seeded();
        let result =
            adapter.execute_raw("INSERT INTO employees VALUES (9, 999, 'x@x.io', 1.0, 1)");
        assert!(!result.success);
        assert!(result.is_integrity_violation());
    }

    #[test]
    fn test_pragma_baseline_recorded() {
        let mut adapter = seeded();
        let settings = adapter.pragma_settings();
        assert_eq!(settings.get("foreign_keys").map(String::as_str), Some("1"));
        assert_eq!(
            settings.get("recursive_triggers").map(String::as_str),
            Some("0")
        );
    }

    #[test]
    fn test_session_info_has_version_and_settings() {
        let mut adapter = seeded();
        let info = adapter.session_info().unwrap();
        assert!(info.version.is_some());
        assert!(info.settings.contains_key("foreign_keys"));
    }

    #[test]
    fn test_supports_levels() {
        let adapter = SqliteAdapter::open_in_memory().unwrap();
        assert!(adapter.supports(MigrationLevel::L0));
        assert!(adapter.supports(MigrationLevel::L2));
        assert!(!adapter.supports(MigrationLevel::L3));
        assert!(adapter.supports(MigrationLevel::L4));
    }
}
