//! PostgreSQL adapter: full L0-L4 surface over an [`SqlExecutor`].
//!
//! Introspection reads `information_schema` plus the `pg_catalog` tables
//! where the standard views fall short (indexes, view dependencies,
//! routine definitions).

use crate::adapter::{
    fold_name, AdapterStatistics, DataExtract, DialectAdapter, ExtractStats, SessionInfo,
};
use crate::config::ConnectionConfig;
use crate::ddl;
use crate::error::AdapterError;
use crate::executor::{ExecErrorKind, ExecResult, Row, SqlExecutor, SqlValue};
use saiql_core::analyzer::TriggerAnalyzer;
use saiql_core::{
    registry, Classification, Column, DependencyKind, Dialect, ForeignKey, IndexDef,
    MigrationLevel, ReasonCode, Routine, RoutineKind, RoutineParameter, SecurityMode, TableSchema,
    Trigger, TriggerEvent, TriggerScope, TriggerTiming, UniqueConstraint, ViewDef,
    ViewDependency, Volatility,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct PostgresAdapter {
    exec: Box<dyn SqlExecutor>,
    config: ConnectionConfig,
    schema: String,
    stats: AdapterStatistics,
}

impl PostgresAdapter {
    pub fn new(exec: Box<dyn SqlExecutor>, config: ConnectionConfig) -> Result<Self, AdapterError> {
        config.validate()?;
        Ok(Self {
            exec,
            config,
            schema: "public".to_string(),
            stats: AdapterStatistics::default(),
        })
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Reads retry on transient failures with bounded backoff; mutations
    /// never do.
    fn run_query(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        let mut attempt = 0;
        loop {
            self.stats.queries_executed += 1;
            let result = self.exec.query(sql, params);
            if result.success {
                return result;
            }
            self.stats.failures += 1;
            let retryable = matches!(
                result.error_kind,
                Some(ExecErrorKind::Transient) | Some(ExecErrorKind::Timeout)
            );
            if !retryable || attempt >= self.config.max_retries {
                return result;
            }
            attempt += 1;
            self.stats.retries += 1;
            std::thread::sleep(Duration::from_millis(self.config.retry_delay));
        }
    }

    fn run_execute(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        self.stats.queries_executed += 1;
        let result = self.exec.execute(sql, params);
        if !result.success {
            self.stats.failures += 1;
        }
        result
    }

    fn query_or_err(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AdapterError> {
        let result = self.run_query(sql, params);
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }
        Ok(result.rows)
    }

    fn classify_routine(
        language: &str,
        volatility: Volatility,
        security: SecurityMode,
    ) -> Classification {
        let mut codes = Vec::new();
        if !matches!(language, "sql" | "plpgsql") {
            codes.push(ReasonCode::UnsupportedLanguage);
        }
        if volatility == Volatility::Volatile {
            codes.push(ReasonCode::VolatileFunction);
        }
        if security == SecurityMode::Definer {
            codes.push(ReasonCode::SecurityDefiner);
        }
        if codes.is_empty() {
            Classification::allowed()
        } else {
            Classification::denied(codes)
        }
    }

    fn classify_trigger(
        timing: TriggerTiming,
        scope: TriggerScope,
        statement: &str,
    ) -> Classification {
        let mut codes = Vec::new();
        match timing {
            TriggerTiming::After => codes.push(ReasonCode::AfterTrigger),
            TriggerTiming::InsteadOf => codes.push(ReasonCode::InsteadOfTrigger),
            TriggerTiming::Before => {}
        }
        if scope == TriggerScope::Statement {
            codes.push(ReasonCode::StatementLevelTrigger);
        }
        if !codes.is_empty() {
            return Classification::denied(codes);
        }
        // Inline bodies get the whitelist analysis; EXECUTE FUNCTION
        // references are structurally admissible here and analysed at
        // translation time when the function body is in hand.
        if statement.to_lowercase().contains("begin") {
            let analysis = TriggerAnalyzer::new(Dialect::Postgres).analyze(statement);
            if !analysis.is_supported() {
                return Classification::denied(analysis.reason_codes);
            }
        }
        Classification::allowed()
    }
}

impl DialectAdapter for PostgresAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn supports(&self, _level: MigrationLevel) -> bool {
        true
    }

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError> {
        let mut info = SessionInfo::new(Dialect::Postgres);
        info.user = Some(self.config.user.clone());
        let rows = self.query_or_err(
            "SELECT current_setting('server_version') AS version, \
             current_setting('TimeZone') AS timezone, \
             current_setting('client_encoding') AS client_encoding",
            &[],
        )?;
        if let Some(row) = rows.first() {
            info.version = row
                .get("version")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            for key in ["timezone", "client_encoding"] {
                if let Some(value) = row.get(key).and_then(|v| v.as_str()) {
                    info.settings.insert(key.to_string(), value.to_string());
                }
            }
        }
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
        format!("${idx}")
    }

    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT table_name \
             FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            &[SqlValue::Text(self.schema.clone())],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("table_name").and_then(|v| v.as_str()))
            .map(fold_name)
            .collect())
    }

    fn get_schema(&mut self, table: &str) -> Result<TableSchema, AdapterError> {
        let rows = self.query_or_err(
            "SELECT column_name, data_type, character_maximum_length, \
                    numeric_precision, numeric_scale, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
            &[
                SqlValue::Text(self.schema.clone()),
                SqlValue::Text(fold_name(table)),
            ],
        )?;

        let mut schema = TableSchema::default();
        for row in &rows {
            let name = row
                .get("column_name")
                .and_then(|v| v.as_str())
                .map(fold_name)
                .unwrap_or_default();
            let data_type = row
                .get("data_type")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let native_type = ddl::compose_type_string(
                data_type,
                row.get("character_maximum_length")
                    .and_then(|v| v.as_i64())
                    .map(|v| v as u32),
                row.get("numeric_precision")
                    .and_then(|v| v.as_i64())
                    .map(|v| v as u32),
                row.get("numeric_scale")
                    .and_then(|v| v.as_i64())
                    .map(|v| v as u32),
            );
            let type_info = registry::map_to_ir(Dialect::Postgres, &native_type);
            let is_unsupported = type_info.is_unknown();
            if is_unsupported {
                if self.config.strict_types {
                    return Err(AdapterError::StrictType {
                        table: table.to_string(),
                        column: name,
                        native_type,
                    });
                }
                warn!(table, column = name.as_str(), native_type = native_type.as_str(),
                    "unsupported column type flagged");
            }
            schema.columns.push(Column {
                name,
                native_type,
                type_info,
                nullable: row
                    .get("is_nullable")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true),
                default: row
                    .get("column_default")
                    .filter(|v| !v.is_null())
                    .map(|v| v.render()),
                is_unsupported,
            });
        }

        schema.pk = self.get_primary_keys(table)?;
        schema.fks = self.get_foreign_keys(table)?;
        schema.unique_constraints = self.get_unique_constraints(table)?;
        schema.indexes = self.get_indexes(table)?;
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
                let pk = self.get_primary_keys(table)?;
                match pk.into_iter().next() {
                    Some(col) => col,
                    None => {
                        let schema = self.get_schema(table)?;
                        schema
                            .columns
                            .first()
                            .map(|c| c.name.clone())
                            .ok_or_else(|| {
                                AdapterError::Query(format!("table {table} has no columns"))
                            })?
                    }
                }
            }
        };

        let mut rows: Vec<Row> = Vec::new();
        let mut chunks = 0usize;
        loop {
            let sql = format!(
                "SELECT * FROM {}.{} ORDER BY {} LIMIT {} OFFSET {}",
                self.schema,
                fold_name(table),
                order_key,
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
        let rows = self.query_or_err(
            "SELECT kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' \
               AND tc.table_schema = $1 AND tc.table_name = $2 \
             ORDER BY kcu.ordinal_position",
            &[
                SqlValue::Text(self.schema.clone()),
                SqlValue::Text(fold_name(table)),
            ],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("column_name").and_then(|v| v.as_str()))
            .map(fold_name)
            .collect())
    }

    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKey>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT tc.constraint_name, kcu.column_name, \
                    ccu.table_name AS ref_table, ccu.column_name AS ref_column \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
             JOIN information_schema.constraint_column_usage ccu \
               ON tc.constraint_name = ccu.constraint_name \
             WHERE tc.constraint_type = 'FOREIGN KEY' \
               AND tc.table_schema = $1 AND tc.table_name = $2 \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
            &[
                SqlValue::Text(self.schema.clone()),
                SqlValue::Text(fold_name(table)),
            ],
        )?;
        Ok(rows
            .iter()
            .map(|r| ForeignKey {
                constraint_name: text_field(r, "constraint_name"),
                column: text_field(r, "column_name"),
                ref_table: text_field(r, "ref_table"),
                ref_column: text_field(r, "ref_column"),
            })
            .collect())
    }

    fn get_unique_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<UniqueConstraint>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT tc.constraint_name, kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'UNIQUE' \
               AND tc.table_schema = $1 AND tc.table_name = $2 \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
            &[
                SqlValue::Text(self.schema.clone()),
                SqlValue::Text(fold_name(table)),
            ],
        )?;
        Ok(group_columns(&rows, "constraint_name", "column_name")
            .into_iter()
            .map(|(name, columns)| UniqueConstraint { name, columns })
            .collect())
    }

    fn get_indexes(&mut self, table: &str) -> Result<Vec<IndexDef>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT i.relname AS index_name, a.attname AS column_name, \
                    ix.indisunique AS is_unique, ix.indisprimary AS is_primary \
             FROM pg_class t \
             JOIN pg_index ix ON t.oid = ix.indrelid \
             JOIN pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
             WHERE t.relname = $1 \
             ORDER BY i.relname, a.attnum",
            &[SqlValue::Text(fold_name(table))],
        )?;

        let mut indexes: BTreeMap<String, IndexDef> = BTreeMap::new();
        for row in &rows {
            let name = text_field(row, "index_name");
            let entry = indexes.entry(name.clone()).or_insert_with(|| IndexDef {
                name,
                columns: Vec::new(),
                unique: row.get("is_unique").and_then(|v| v.as_bool()).unwrap_or(false),
                primary: row
                    .get("is_primary")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            });
            entry.columns.push(text_field(row, "column_name"));
        }
        Ok(indexes.into_values().collect())
    }

    fn list_views(&mut self, schema: Option<&str>) -> Result<Vec<ViewDef>, AdapterError> {
        let schema_name = schema.unwrap_or(&self.schema).to_string();
        let rows = self.query_or_err(
            "SELECT table_name AS view_name, view_definition \
             FROM information_schema.views \
             WHERE table_schema = $1 \
             ORDER BY table_name",
            &[SqlValue::Text(schema_name.clone())],
        )?;

        let mut views = Vec::new();
        for row in &rows {
            let name = text_field(row, "view_name");
            let definition = ddl::strip_definer(
                row.get("view_definition")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default(),
            );
            let dependencies = self.get_view_dependencies(&name)?;
            views.push(ViewDef {
                schema: Some(schema_name.clone()),
                name,
                definition,
                dependencies,
            });
        }
        Ok(views)
    }

    fn get_view_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT view_definition \
             FROM information_schema.views \
             WHERE table_schema = $1 AND table_name = $2",
            &[
                SqlValue::Text(self.schema.clone()),
                SqlValue::Text(fold_name(name)),
            ],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("view_definition"))
            .and_then(|v| v.as_str())
            .map(ddl::strip_definer))
    }

    fn get_view_dependencies(&mut self, name: &str) -> Result<Vec<ViewDependency>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT DISTINCT c.relname AS ref_name, c.relkind AS ref_kind \
             FROM pg_rewrite r \
             JOIN pg_class v ON r.ev_class = v.oid \
             JOIN pg_depend d ON r.oid = d.objid \
             JOIN pg_class c ON d.refobjid = c.oid \
             WHERE v.relname = $1 AND c.relname <> $1 AND c.relkind IN ('r', 'v') \
             ORDER BY c.relname",
            &[SqlValue::Text(fold_name(name))],
        )?;
        Ok(rows
            .iter()
            .map(|r| ViewDependency {
                kind: match r.get("ref_kind").and_then(|v| v.as_str()) {
                    Some("v") => DependencyKind::View,
                    _ => DependencyKind::Table,
                },
                name: text_field(r, "ref_name"),
            })
            .collect())
    }

    fn list_routines(&mut self, schema: Option<&str>) -> Result<Vec<Routine>, AdapterError> {
        let schema_name = schema.unwrap_or(&self.schema).to_string();
        let rows = self.query_or_err(
            "SELECT p.proname AS name, l.lanname AS language, \
                    p.provolatile AS volatility, p.prosecdef AS security_definer, \
                    p.prokind AS kind, \
                    pg_get_function_result(p.oid) AS return_type, \
                    pg_get_function_arguments(p.oid) AS arguments, \
                    pg_get_functiondef(p.oid) AS definition \
             FROM pg_proc p \
             JOIN pg_language l ON p.prolang = l.oid \
             JOIN pg_namespace n ON p.pronamespace = n.oid \
             WHERE n.nspname = $1 \
             ORDER BY p.proname",
            &[SqlValue::Text(schema_name.clone())],
        )?;

        Ok(rows
            .iter()
            .map(|row| {
                let language = row
                    .get("language")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_lowercase();
                let volatility = match row.get("volatility").and_then(|v| v.as_str()) {
                    Some("i") => Volatility::Immutable,
                    Some("s") => Volatility::Stable,
                    _ => Volatility::Volatile,
                };
                let security = if row
                    .get("security_definer")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
                {
                    SecurityMode::Definer
                } else {
                    SecurityMode::Invoker
                };
                let definition = ddl::strip_definer(
                    row.get("definition")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default(),
                );
                Routine {
                    schema: Some(schema_name.clone()),
                    name: text_field(row, "name"),
                    kind: match row.get("kind").and_then(|v| v.as_str()) {
                        Some("p") => RoutineKind::Procedure,
                        _ => RoutineKind::Function,
                    },
                    language: language.clone(),
                    volatility,
                    data_access: saiql_core::DataAccess::Contains,
                    security,
                    parameters: parse_pg_arguments(
                        row.get("arguments").and_then(|v| v.as_str()).unwrap_or(""),
                    ),
                    return_type: row
                        .get("return_type")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    body: saiql_core::analyzer::trigger::extract_trigger_body(&definition),
                    definition,
                    classification: Self::classify_routine(&language, volatility, security),
                }
            })
            .collect())
    }

    fn get_routine_definition(
        &mut self,
        name: &str,
        _kind: RoutineKind,
    ) -> Result<Option<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT pg_get_functiondef(p.oid) AS definition \
             FROM pg_proc p \
             JOIN pg_namespace n ON p.pronamespace = n.oid \
             WHERE n.nspname = $1 AND p.proname = $2",
            &[
                SqlValue::Text(self.schema.clone()),
                SqlValue::Text(fold_name(name)),
            ],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("definition"))
            .and_then(|v| v.as_str())
            .map(ddl::strip_definer))
    }

    fn list_triggers(&mut self, schema: Option<&str>) -> Result<Vec<Trigger>, AdapterError> {
        let schema_name = schema.unwrap_or(&self.schema).to_string();
        let rows = self.query_or_err(
            "SELECT trigger_name, event_manipulation, action_timing, \
                    action_orientation, event_object_table, action_statement \
             FROM information_schema.triggers \
             WHERE trigger_schema = $1 \
             ORDER BY trigger_name, event_manipulation",
            &[SqlValue::Text(schema_name.clone())],
        )?;

        // Multi-event triggers arrive as one row per event.
        let mut grouped: BTreeMap<String, Trigger> = BTreeMap::new();
        for row in &rows {
            let name = text_field(row, "trigger_name");
            let event = match row
                .get("event_manipulation")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase()
                .as_str()
            {
                "INSERT" => TriggerEvent::Insert,
                "UPDATE" => TriggerEvent::Update,
                _ => TriggerEvent::Delete,
            };
            if let Some(existing) = grouped.get_mut(&name) {
                if !existing.events.contains(&event) {
                    existing.events.push(event);
                    existing.events.sort();
                }
                continue;
            }

            let timing = match row
                .get("action_timing")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase()
                .as_str()
            {
                "BEFORE" => TriggerTiming::Before,
                "INSTEAD OF" => TriggerTiming::InsteadOf,
                _ => TriggerTiming::After,
            };
            let scope = match row
                .get("action_orientation")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase()
                .as_str()
            {
                "ROW" => TriggerScope::Row,
                _ => TriggerScope::Statement,
            };
            let statement = ddl::strip_definer(
                row.get("action_statement")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default(),
            );
            let classification = Self::classify_trigger(timing, scope, &statement);
            grouped.insert(
                name.clone(),
                Trigger {
                    schema: Some(schema_name.clone()),
                    name,
                    table: text_field(row, "event_object_table"),
                    timing,
                    events: vec![event],
                    scope,
                    body: statement.clone(),
                    definition: statement,
                    classification,
                },
            );
        }
        Ok(grouped.into_values().collect())
    }

    fn get_trigger_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT pg_get_triggerdef(t.oid) AS definition \
             FROM pg_trigger t \
             JOIN pg_class c ON t.tgrelid = c.oid \
             WHERE t.tgname = $1 AND NOT t.tgisinternal",
            &[SqlValue::Text(fold_name(name))],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("definition"))
            .and_then(|v| v.as_str())
            .map(ddl::strip_definer))
    }

    fn drop_view(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP VIEW IF EXISTS {name} CASCADE"))
    }

    fn drop_trigger(&mut self, name: &str) -> ExecResult {
        // Postgres drops triggers per table; resolve the table first.
        let lookup = self.run_query(
            "SELECT c.relname AS table_name \
             FROM pg_trigger t \
             JOIN pg_class c ON t.tgrelid = c.oid \
             WHERE t.tgname = $1 AND NOT t.tgisinternal",
            &[SqlValue::Text(fold_name(name))],
        );
        let table = lookup
            .rows
            .first()
            .and_then(|r| r.get("table_name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        match table {
            Some(table) => self.execute_raw(&format!("DROP TRIGGER IF EXISTS {name} ON {table}")),
            None => ExecResult::fail(
                format!("trigger {name} not found"),
                ExecErrorKind::Other,
            ),
        }
    }
}

fn text_field(row: &Row, field: &str) -> String {
    row.get(field)
        .and_then(|v| v.as_str())
        .map(fold_name)
        .unwrap_or_default()
}

/// Group ordered (key, column) rows into per-key column lists, keys sorted.
fn group_columns(rows: &[Row], key_field: &str, column_field: &str) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(text_field(row, key_field))
            .or_default()
            .push(text_field(row, column_field));
    }
    grouped
}

/// Parse `pg_get_function_arguments` output ("a integer, b text DEFAULT 1").
fn parse_pg_arguments(arguments: &str) -> Vec<RoutineParameter> {
    arguments
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut parts = p.splitn(2, ' ');
            let first = parts.next().unwrap_or_default();
            match parts.next() {
                Some(rest) => RoutineParameter {
                    name: fold_name(first),
                    mode: None,
                    data_type: rest.split(" DEFAULT ").next().unwrap_or(rest).to_string(),
                },
                None => RoutineParameter {
                    name: String::new(),
                    mode: None,
                    data_type: first.to_string(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{row, FixtureExecutor};

    fn config() -> ConnectionConfig {
        ConnectionConfig::new(Dialect::Postgres, "localhost", "testdb").with_user("migrator")
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    fn five_view_fixture() -> FixtureExecutor {
        let names = [
            "v_active_employees",
            "v_dept_employee_count",
            "v_employee_details",
            "v_high_salary_employees",
            "v_project_summary",
        ];
        let view_rows: Vec<Row> = names
            .iter()
            .map(|n| {
                row(&[
                    ("view_name", text(n)),
                    ("view_definition", text("SELECT id FROM employees")),
                ])
            })
            .collect();

        FixtureExecutor::new()
            .on_rows("from information_schema.views", view_rows)
            // v_high_salary_employees reads v_active_employees.
            .on_rows(
                "where v.relname = $1 and c.relname <> $1",
                Vec::new(),
            )
    }

    #[test]
    fn test_list_tables_folds_case() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.tables",
            vec![
                row(&[("table_name", text("Customers"))]),
                row(&[("table_name", text("ORDERS"))]),
            ],
        );
        let mut adapter = PostgresAdapter::new(Box::new(exec), config()).unwrap();
        assert_eq!(adapter.list_tables().unwrap(), vec!["customers", "orders"]);
    }

    #[test]
    fn test_get_schema_flags_unknown_types() {
        let exec = FixtureExecutor::new()
            .on_rows(
                "from information_schema.columns",
                vec![
                    row(&[
                        ("column_name", text("id")),
                        ("data_type", text("integer")),
                        ("character_maximum_length", SqlValue::Null),
                        ("numeric_precision", SqlValue::Integer(32)),
                        ("numeric_scale", SqlValue::Integer(0)),
                        ("is_nullable", text("NO")),
                        ("column_default", SqlValue::Null),
                    ]),
                    row(&[
                        ("column_name", text("search")),
                        ("data_type", text("tsvector")),
                        ("character_maximum_length", SqlValue::Null),
                        ("numeric_precision", SqlValue::Null),
                        ("numeric_scale", SqlValue::Null),
                        ("is_nullable", text("YES")),
                        ("column_default", SqlValue::Null),
                    ]),
                ],
            );
        let mut adapter = PostgresAdapter::new(Box::new(exec), config()).unwrap();
        let schema = adapter.get_schema("docs").unwrap();
        assert!(!schema.columns[0].is_unsupported);
        assert!(schema.columns[1].is_unsupported);
        assert!(!schema.columns[0].nullable);
    }

    #[test]
    fn test_strict_types_aborts_on_unknown() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.columns",
            vec![row(&[
                ("column_name", text("search")),
                ("data_type", text("tsvector")),
                ("character_maximum_length", SqlValue::Null),
                ("numeric_precision", SqlValue::Null),
                ("numeric_scale", SqlValue::Null),
                ("is_nullable", text("YES")),
                ("column_default", SqlValue::Null),
            ])],
        );
        let mut adapter =
            PostgresAdapter::new(Box::new(exec), config().with_strict_types(true)).unwrap();
        assert!(matches!(
            adapter.get_schema("docs"),
            Err(AdapterError::StrictType { .. })
        ));
    }

    #[test]
    fn test_five_view_fixture_lists_all() {
        let mut adapter = PostgresAdapter::new(Box::new(five_view_fixture()), config()).unwrap();
        let views = adapter.list_views(None).unwrap();
        let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "v_active_employees",
                "v_dept_employee_count",
                "v_employee_details",
                "v_high_salary_employees",
                "v_project_summary",
            ]
        );
    }

    #[test]
    fn test_safe_routine_classification() {
        let exec = FixtureExecutor::new().on_rows(
            "from pg_proc",
            vec![
                row(&[
                    ("name", text("calc_discount")),
                    ("language", text("plpgsql")),
                    ("volatility", text("i")),
                    ("security_definer", SqlValue::Bool(false)),
                    ("kind", text("f")),
                    ("return_type", text("integer")),
                    ("arguments", text("p_amount integer")),
                    ("definition", text("CREATE FUNCTION calc_discount(p_amount integer) RETURNS integer AS $$ BEGIN RETURN p_amount / 10; END $$ LANGUAGE plpgsql")),
                ]),
                row(&[
                    ("name", text("random_audit")),
                    ("language", text("plpgsql")),
                    ("volatility", text("v")),
                    ("security_definer", SqlValue::Bool(true)),
                    ("kind", text("f")),
                    ("return_type", text("void")),
                    ("arguments", text("")),
                    ("definition", text("CREATE FUNCTION random_audit() ...")),
                ]),
                row(&[
                    ("name", text("v8_thing")),
                    ("language", text("plv8")),
                    ("volatility", text("s")),
                    ("security_definer", SqlValue::Bool(false)),
                    ("kind", text("f")),
                    ("return_type", text("void")),
                    ("arguments", text("")),
                    ("definition", text("CREATE FUNCTION v8_thing() ...")),
                ]),
            ],
        );
        let mut adapter = PostgresAdapter::new(Box::new(exec), config()).unwrap();

        let safe = adapter.list_safe_routines(None).unwrap();
        assert_eq!(safe.len(), 1);
        assert_eq!(safe[0].name, "calc_discount");

        let skipped = adapter.list_skipped_routines(None).unwrap();
        assert_eq!(skipped.len(), 2);
        for routine in &skipped {
            assert!(!routine.classification.reason_codes.is_empty());
        }
        let volatile = skipped.iter().find(|r| r.name == "random_audit").unwrap();
        assert!(volatile
            .classification
            .reason_codes
            .contains(&ReasonCode::VolatileFunction));
        assert!(volatile
            .classification
            .reason_codes
            .contains(&ReasonCode::SecurityDefiner));
        let v8 = skipped.iter().find(|r| r.name == "v8_thing").unwrap();
        assert!(v8
            .classification
            .reason_codes
            .contains(&ReasonCode::UnsupportedLanguage));
    }

    #[test]
    fn test_trigger_classification_structural() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.triggers",
            vec![
                row(&[
                    ("trigger_name", text("trg_before_ins")),
                    ("event_manipulation", text("INSERT")),
                    ("action_timing", text("BEFORE")),
                    ("action_orientation", text("ROW")),
                    ("event_object_table", text("customers")),
                    ("action_statement", text("EXECUTE FUNCTION normalize_email()")),
                ]),
                row(&[
                    ("trigger_name", text("trg_audit")),
                    ("event_manipulation", text("INSERT")),
                    ("action_timing", text("AFTER")),
                    ("action_orientation", text("ROW")),
                    ("event_object_table", text("customers")),
                    ("action_statement", text("EXECUTE FUNCTION audit_row()")),
                ]),
            ],
        );
        let mut adapter = PostgresAdapter::new(Box::new(exec), config()).unwrap();

        let safe = adapter.list_safe_triggers(None).unwrap();
        assert_eq!(safe.len(), 1);
        assert_eq!(safe[0].name, "trg_before_ins");

        let skipped = adapter.list_skipped_triggers(None).unwrap();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0]
            .classification
            .reason_codes
            .contains(&ReasonCode::AfterTrigger));
    }

    #[test]
    fn test_multi_event_trigger_grouped() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.triggers",
            vec![
                row(&[
                    ("trigger_name", text("trg_norm")),
                    ("event_manipulation", text("INSERT")),
                    ("action_timing", text("BEFORE")),
                    ("action_orientation", text("ROW")),
                    ("event_object_table", text("customers")),
                    ("action_statement", text("EXECUTE FUNCTION norm()")),
                ]),
                row(&[
                    ("trigger_name", text("trg_norm")),
                    ("event_manipulation", text("UPDATE")),
                    ("action_timing", text("BEFORE")),
                    ("action_orientation", text("ROW")),
                    ("event_object_table", text("customers")),
                    ("action_statement", text("EXECUTE FUNCTION norm()")),
                ]),
            ],
        );
        let mut adapter = PostgresAdapter::new(Box::new(exec), config()).unwrap();
        let triggers = adapter.list_triggers(None).unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(
            triggers[0].events,
            vec![TriggerEvent::Insert, TriggerEvent::Update]
        );
    }

    #[test]
    fn test_extract_data_records_order_key() {
        let exec = FixtureExecutor::new()
            .on_rows(
                "constraint_type = 'primary key'",
                vec![row(&[("column_name", text("id"))])],
            )
            .on_rows(
                "select * from public.orders order by id",
                vec![
                    row(&[("id", SqlValue::Integer(1))]),
                    row(&[("id", SqlValue::Integer(2))]),
                ],
            );
        let mut adapter = PostgresAdapter::new(Box::new(exec), config()).unwrap();
        let extract = adapter.extract_data("orders", None, 100).unwrap();
        assert_eq!(extract.stats.order_key_used, "id");
        assert_eq!(extract.stats.row_count, 2);
    }

    #[test]
    fn test_placeholder_style() {
        let adapter =
            PostgresAdapter::new(Box::new(FixtureExecutor::new()), config()).unwrap();
        assert_eq!(adapter.placeholder(1), "$1");
        assert_eq!(adapter.placeholder(3), "$3");
    }
}
