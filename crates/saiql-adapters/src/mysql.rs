//! MySQL/MariaDB adapter: full L0-L4 surface over an [`SqlExecutor`].
//!
//! Everything reads `information_schema`, with `DATABASE()` as the implicit
//! schema filter. DDL-returning calls strip `DEFINER=` clauses before the
//! text leaves the adapter.

use crate::adapter::{
    fold_name, AdapterStatistics, DataExtract, DialectAdapter, ExtractStats, SessionInfo,
};
use crate::config::ConnectionConfig;
use crate::ddl;
use crate::error::AdapterError;
use crate::executor::{ExecErrorKind, ExecResult, Row, SqlExecutor, SqlValue};
use saiql_core::{
    registry, Classification, Column, DataAccess, Dialect, ForeignKey, IndexDef, MigrationLevel,
    ReasonCode, Routine, RoutineKind, RoutineParameter, SecurityMode, TableSchema, Trigger,
    TriggerEvent, TriggerScope, TriggerTiming, UniqueConstraint, ViewDef, ViewDependency,
    Volatility,
};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Function patterns whose presence in a trigger body disqualifies it.
const UNSAFE_TRIGGER_PATTERNS: &[&str] = &[
    "SLEEP(",
    "BENCHMARK(",
    "LOAD_FILE(",
    "INTO OUTFILE",
    "INTO DUMPFILE",
];

pub struct MysqlAdapter {
    exec: Box<dyn SqlExecutor>,
    config: ConnectionConfig,
    stats: AdapterStatistics,
}

impl MysqlAdapter {
    pub fn new(exec: Box<dyn SqlExecutor>, config: ConnectionConfig) -> Result<Self, AdapterError> {
        config.validate()?;
        Ok(Self {
            exec,
            config,
            stats: AdapterStatistics::default(),
        })
    }

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

    /// Parameter metadata from `information_schema.PARAMETERS`.
    pub fn routine_parameters(
        &mut self,
        routine: &str,
    ) -> Result<Vec<RoutineParameter>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT PARAMETER_NAME, PARAMETER_MODE, DTD_IDENTIFIER \
             FROM information_schema.PARAMETERS \
             WHERE SPECIFIC_SCHEMA = DATABASE() AND SPECIFIC_NAME = ? \
               AND PARAMETER_NAME IS NOT NULL \
             ORDER BY ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(routine))],
        )?;
        Ok(rows
            .iter()
            .map(|row| RoutineParameter {
                name: text_field(row, "parameter_name"),
                mode: match row
                    .get("parameter_mode")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .as_str()
                {
                    "IN" => Some(saiql_core::ParameterMode::In),
                    "OUT" => Some(saiql_core::ParameterMode::Out),
                    "INOUT" => Some(saiql_core::ParameterMode::InOut),
                    _ => None,
                },
                data_type: row
                    .get("dtd_identifier")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }

    /// Safe subset per the MySQL L3 rules: deterministic (functions),
    /// read-only data access, invoker security, no dynamic SQL.
    fn classify_routine(
        kind: RoutineKind,
        is_deterministic: bool,
        data_access: DataAccess,
        security: SecurityMode,
        body: &str,
    ) -> Classification {
        let mut codes = Vec::new();

        // Procedures cannot be declared DETERMINISTIC; read-only ones pass.
        let read_only = !matches!(data_access, DataAccess::Modifies);
        let procedure_exempt = kind == RoutineKind::Procedure && read_only;
        if !is_deterministic && !procedure_exempt {
            codes.push(ReasonCode::NotDeterministic);
        }
        if data_access == DataAccess::Modifies {
            codes.push(ReasonCode::ModifiesSqlData);
        }
        if security == SecurityMode::Definer {
            codes.push(ReasonCode::SecurityDefiner);
        }
        let upper = body.to_uppercase();
        if upper.contains("PREPARE") || upper.contains("EXECUTE IMMEDIATE") {
            codes.push(ReasonCode::DynamicSql);
        }

        if codes.is_empty() {
            Classification::allowed()
        } else {
            Classification::denied(codes)
        }
    }

    /// Safe subset per the MySQL L4 rules: row-level, not AFTER, no dynamic
    /// SQL, no unsafe function patterns.
    fn classify_trigger(timing: TriggerTiming, scope: TriggerScope, body: &str) -> Classification {
        let mut codes = Vec::new();
        if scope != TriggerScope::Row {
            codes.push(ReasonCode::StatementLevelTrigger);
        }
        if timing == TriggerTiming::After {
            codes.push(ReasonCode::AfterTrigger);
        }
        let upper = body.to_uppercase();
        if upper.contains("PREPARE") || upper.contains("EXECUTE IMMEDIATE") {
            codes.push(ReasonCode::DynamicSql);
        }
        if UNSAFE_TRIGGER_PATTERNS.iter().any(|p| upper.contains(p)) {
            codes.push(ReasonCode::DisallowedFunction);
        }

        if codes.is_empty() {
            Classification::allowed()
        } else {
            Classification::denied(codes)
        }
    }
}

impl DialectAdapter for MysqlAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn supports(&self, _level: MigrationLevel) -> bool {
        true
    }

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError> {
        let mut info = SessionInfo::new(Dialect::Mysql);
        info.user = Some(self.config.user.clone());
        let rows = self.query_or_err(
            "SELECT VERSION() AS version, @@sql_mode AS sql_mode, \
             @@character_set_connection AS charset",
            &[],
        )?;
        if let Some(row) = rows.first() {
            info.version = row
                .get("version")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            for key in ["sql_mode", "charset"] {
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

    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT TABLE_NAME \
             FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
             ORDER BY TABLE_NAME",
            &[],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("table_name").and_then(|v| v.as_str()))
            .map(fold_name)
            .collect())
    }

    fn get_schema(&mut self, table: &str) -> Result<TableSchema, AdapterError> {
        let rows = self.query_or_err(
            "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA \
             FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(table))],
        )?;

        let mut schema = TableSchema::default();
        for row in &rows {
            let name = text_field(row, "column_name");
            // COLUMN_TYPE carries the full spelling (`tinyint(1)`,
            // `int unsigned`) that the registry keys on.
            let native_type = row
                .get("column_type")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let type_info = registry::map_to_ir(Dialect::Mysql, &native_type);
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
                "SELECT * FROM `{}` ORDER BY `{}` LIMIT {} OFFSET {}",
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
            "SELECT COLUMN_NAME \
             FROM information_schema.KEY_COLUMN_USAGE \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
               AND CONSTRAINT_NAME = 'PRIMARY' \
             ORDER BY ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(table))],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("column_name").and_then(|v| v.as_str()))
            .map(fold_name)
            .collect())
    }

    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKey>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT CONSTRAINT_NAME, COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
             FROM information_schema.KEY_COLUMN_USAGE \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
               AND REFERENCED_TABLE_NAME IS NOT NULL \
             ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(table))],
        )?;
        Ok(rows
            .iter()
            .map(|r| ForeignKey {
                constraint_name: text_field(r, "constraint_name"),
                column: text_field(r, "column_name"),
                ref_table: text_field(r, "referenced_table_name"),
                ref_column: text_field(r, "referenced_column_name"),
            })
            .collect())
    }

    fn get_unique_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<UniqueConstraint>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT tc.CONSTRAINT_NAME, kcu.COLUMN_NAME \
             FROM information_schema.TABLE_CONSTRAINTS tc \
             JOIN information_schema.KEY_COLUMN_USAGE kcu \
               ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
              AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA \
              AND tc.TABLE_NAME = kcu.TABLE_NAME \
             WHERE tc.TABLE_SCHEMA = DATABASE() AND tc.TABLE_NAME = ? \
               AND tc.CONSTRAINT_TYPE = 'UNIQUE' \
             ORDER BY tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(table))],
        )?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in &rows {
            grouped
                .entry(text_field(row, "constraint_name"))
                .or_default()
                .push(text_field(row, "column_name"));
        }
        Ok(grouped
            .into_iter()
            .map(|(name, columns)| UniqueConstraint { name, columns })
            .collect())
    }

    fn get_indexes(&mut self, table: &str) -> Result<Vec<IndexDef>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE \
             FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
            &[SqlValue::Text(fold_name(table))],
        )?;

        let mut indexes: BTreeMap<String, IndexDef> = BTreeMap::new();
        for row in &rows {
            let name = text_field(row, "index_name");
            let primary = name == "primary";
            let entry = indexes.entry(name.clone()).or_insert_with(|| IndexDef {
                name,
                columns: Vec::new(),
                unique: row
                    .get("non_unique")
                    .and_then(|v| v.as_bool())
                    .map(|non_unique| !non_unique)
                    .unwrap_or(false),
                primary,
            });
            entry.columns.push(text_field(row, "column_name"));
        }
        Ok(indexes.into_values().collect())
    }

    fn list_views(&mut self, _schema: Option<&str>) -> Result<Vec<ViewDef>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT TABLE_NAME, VIEW_DEFINITION \
             FROM information_schema.VIEWS \
             WHERE TABLE_SCHEMA = DATABASE() \
             ORDER BY TABLE_NAME",
            &[],
        )?;

        let view_names: BTreeSet<String> =
            rows.iter().map(|r| text_field(r, "table_name")).collect();
        let table_names: BTreeSet<String> = self.list_tables()?.into_iter().collect();

        Ok(rows
            .iter()
            .map(|row| {
                let name = text_field(row, "table_name");
                let definition = ddl::strip_definer(
                    row.get("view_definition")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default(),
                );
                let dependencies =
                    ddl::scan_view_dependencies(&definition, &table_names, &view_names, &name);
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
        let rows = self.query_or_err(
            "SELECT VIEW_DEFINITION \
             FROM information_schema.VIEWS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
            &[SqlValue::Text(fold_name(name))],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("view_definition"))
            .and_then(|v| v.as_str())
            .map(ddl::strip_definer))
    }

    fn get_view_dependencies(&mut self, name: &str) -> Result<Vec<ViewDependency>, AdapterError> {
        Ok(self
            .list_views(None)?
            .into_iter()
            .find(|v| v.name == fold_name(name))
            .map(|v| v.dependencies)
            .unwrap_or_default())
    }

    fn list_routines(&mut self, _schema: Option<&str>) -> Result<Vec<Routine>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT ROUTINE_NAME, ROUTINE_SCHEMA, ROUTINE_TYPE, DTD_IDENTIFIER, \
                    ROUTINE_DEFINITION, IS_DETERMINISTIC, SQL_DATA_ACCESS, SECURITY_TYPE \
             FROM information_schema.ROUTINES \
             WHERE ROUTINE_SCHEMA = DATABASE() \
             ORDER BY ROUTINE_TYPE, ROUTINE_NAME",
            &[],
        )?;

        Ok(rows
            .iter()
            .map(|row| {
                let kind = match row
                    .get("routine_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .as_str()
                {
                    "PROCEDURE" => RoutineKind::Procedure,
                    _ => RoutineKind::Function,
                };
                let is_deterministic = row
                    .get("is_deterministic")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let data_access = match row
                    .get("sql_data_access")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .as_str()
                {
                    "NO SQL" => DataAccess::None,
                    "READS SQL DATA" => DataAccess::Reads,
                    "MODIFIES SQL DATA" => DataAccess::Modifies,
                    _ => DataAccess::Contains,
                };
                let security = match row
                    .get("security_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .as_str()
                {
                    "DEFINER" => SecurityMode::Definer,
                    _ => SecurityMode::Invoker,
                };
                let body = row
                    .get("routine_definition")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                Routine {
                    schema: row
                        .get("routine_schema")
                        .and_then(|v| v.as_str())
                        .map(fold_name),
                    name: text_field(row, "routine_name"),
                    kind,
                    language: "sql".to_string(),
                    // MySQL has no volatility column; DETERMINISTIC is the
                    // closest notion.
                    volatility: if is_deterministic {
                        Volatility::Immutable
                    } else {
                        Volatility::Volatile
                    },
                    data_access,
                    security,
                    parameters: Vec::new(),
                    return_type: row
                        .get("dtd_identifier")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    body: body.clone(),
                    definition: ddl::strip_definer(&body),
                    classification: Self::classify_routine(
                        kind,
                        is_deterministic,
                        data_access,
                        security,
                        &body,
                    ),
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
            "SELECT ROUTINE_DEFINITION \
             FROM information_schema.ROUTINES \
             WHERE ROUTINE_SCHEMA = DATABASE() AND ROUTINE_NAME = ?",
            &[SqlValue::Text(fold_name(name))],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("routine_definition"))
            .and_then(|v| v.as_str())
            .map(ddl::strip_definer))
    }

    fn list_triggers(&mut self, _schema: Option<&str>) -> Result<Vec<Trigger>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT TRIGGER_NAME, ACTION_TIMING, EVENT_MANIPULATION, \
                    EVENT_OBJECT_TABLE, ACTION_ORIENTATION, ACTION_STATEMENT \
             FROM information_schema.TRIGGERS \
             WHERE TRIGGER_SCHEMA = DATABASE() \
             ORDER BY TRIGGER_NAME",
            &[],
        )?;

        Ok(rows
            .iter()
            .map(|row| {
                let timing = match row
                    .get("action_timing")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .as_str()
                {
                    "BEFORE" => TriggerTiming::Before,
                    _ => TriggerTiming::After,
                };
                let scope = match row
                    .get("action_orientation")
                    .and_then(|v| v.as_str())
                    .unwrap_or("ROW")
                    .to_uppercase()
                    .as_str()
                {
                    "ROW" => TriggerScope::Row,
                    _ => TriggerScope::Statement,
                };
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
                let body = ddl::strip_definer(
                    row.get("action_statement")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default(),
                );
                let classification = Self::classify_trigger(timing, scope, &body);

                Trigger {
                    schema: None,
                    name: text_field(row, "trigger_name"),
                    table: text_field(row, "event_object_table"),
                    timing,
                    events: vec![event],
                    scope,
                    body: body.clone(),
                    definition: body,
                    classification,
                }
            })
            .collect())
    }

    fn get_trigger_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT ACTION_STATEMENT \
             FROM information_schema.TRIGGERS \
             WHERE TRIGGER_SCHEMA = DATABASE() AND TRIGGER_NAME = ?",
            &[SqlValue::Text(fold_name(name))],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("action_statement"))
            .and_then(|v| v.as_str())
            .map(ddl::strip_definer))
    }

    fn drop_view(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP VIEW IF EXISTS {name}"))
    }

    fn drop_trigger(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP TRIGGER IF EXISTS {name}"))
    }
}

fn text_field(row: &Row, field: &str) -> String {
    row.get(field)
        .and_then(|v| v.as_str())
        .map(fold_name)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{row, FixtureExecutor};

    fn config() -> ConnectionConfig {
        ConnectionConfig::new(Dialect::Mysql, "localhost", "appdb").with_user("migrator")
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    fn routine_row(
        name: &str,
        kind: &str,
        deterministic: &str,
        data_access: &str,
        security: &str,
    ) -> Row {
        row(&[
            ("ROUTINE_NAME", text(name)),
            ("ROUTINE_SCHEMA", text("appdb")),
            ("ROUTINE_TYPE", text(kind)),
            ("DTD_IDENTIFIER", text("int")),
            ("ROUTINE_DEFINITION", text("RETURN 1")),
            ("IS_DETERMINISTIC", text(deterministic)),
            ("SQL_DATA_ACCESS", text(data_access)),
            ("SECURITY_TYPE", text(security)),
        ])
    }

    /// Five safe routines and two unsafe ones, per the L3 subset rules.
    fn routines_fixture() -> FixtureExecutor {
        FixtureExecutor::new().on_rows(
            "from information_schema.routines",
            vec![
                routine_row("fn_add", "FUNCTION", "YES", "NO SQL", "INVOKER"),
                routine_row("fn_upper_name", "FUNCTION", "YES", "CONTAINS SQL", "INVOKER"),
                routine_row("fn_tax", "FUNCTION", "YES", "READS SQL DATA", "INVOKER"),
                routine_row("sp_count_orders", "PROCEDURE", "NO", "READS SQL DATA", "INVOKER"),
                routine_row("sp_lookup", "PROCEDURE", "NO", "CONTAINS SQL", "INVOKER"),
                routine_row("fn_rand_token", "FUNCTION", "NO", "NO SQL", "INVOKER"),
                routine_row("sp_purge_audit", "PROCEDURE", "NO", "MODIFIES SQL DATA", "INVOKER"),
            ],
        )
    }

    #[test]
    fn test_safe_routines_subset() {
        let mut adapter = MysqlAdapter::new(Box::new(routines_fixture()), config()).unwrap();
        let safe = adapter.list_safe_routines(None).unwrap();
        let names: Vec<&str> = safe.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["fn_add", "fn_upper_name", "fn_tax", "sp_count_orders", "sp_lookup"]
        );
    }

    #[test]
    fn test_skipped_routines_carry_reason_codes() {
        let mut adapter = MysqlAdapter::new(Box::new(routines_fixture()), config()).unwrap();
        let skipped = adapter.list_skipped_routines(None).unwrap();
        assert_eq!(skipped.len(), 2);

        let rand = skipped.iter().find(|r| r.name == "fn_rand_token").unwrap();
        assert!(rand
            .classification
            .reason_codes
            .iter()
            .any(|c| c.as_str() == "not deterministic"));

        let purge = skipped.iter().find(|r| r.name == "sp_purge_audit").unwrap();
        assert!(purge
            .classification
            .reason_codes
            .iter()
            .any(|c| c.as_str() == "modifies sql data"));
    }

    #[test]
    fn test_definer_routine_skipped() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.routines",
            vec![routine_row("fn_sys", "FUNCTION", "YES", "NO SQL", "DEFINER")],
        );
        let mut adapter = MysqlAdapter::new(Box::new(exec), config()).unwrap();
        let skipped = adapter.list_skipped_routines(None).unwrap();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0]
            .classification
            .reason_codes
            .contains(&ReasonCode::SecurityDefiner));
    }

    fn trigger_row(name: &str, timing: &str, event: &str, statement: &str) -> Row {
        row(&[
            ("TRIGGER_NAME", text(name)),
            ("ACTION_TIMING", text(timing)),
            ("EVENT_MANIPULATION", text(event)),
            ("EVENT_OBJECT_TABLE", text("customers")),
            ("ACTION_ORIENTATION", text("ROW")),
            ("ACTION_STATEMENT", text(statement)),
        ])
    }

    #[test]
    fn test_after_audit_trigger_skipped_with_reason() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.triggers",
            vec![
                trigger_row(
                    "trg_audit_insert",
                    "AFTER",
                    "INSERT",
                    "INSERT INTO audit_log (op) VALUES ('INSERT')",
                ),
                trigger_row(
                    "trg_clamp_credit",
                    "BEFORE",
                    "UPDATE",
                    "IF NEW.credit_limit < 0 THEN SET NEW.credit_limit = 0; END IF",
                ),
                trigger_row(
                    "trg_lowercase_email",
                    "BEFORE",
                    "INSERT",
                    "SET NEW.email = LOWER(NEW.email)",
                ),
            ],
        );
        let mut adapter = MysqlAdapter::new(Box::new(exec), config()).unwrap();

        let safe = adapter.list_safe_triggers(None).unwrap();
        let safe_names: Vec<&str> = safe.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(safe_names, vec!["trg_clamp_credit", "trg_lowercase_email"]);

        let skipped = adapter.list_skipped_triggers(None).unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "trg_audit_insert");
        assert!(skipped[0]
            .classification
            .reason_codes
            .iter()
            .any(|c| c.as_str() == "after trigger"));
    }

    #[test]
    fn test_dynamic_sql_trigger_skipped() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.triggers",
            vec![trigger_row(
                "trg_dyn",
                "BEFORE",
                "INSERT",
                "PREPARE stmt FROM @sql",
            )],
        );
        let mut adapter = MysqlAdapter::new(Box::new(exec), config()).unwrap();
        let skipped = adapter.list_skipped_triggers(None).unwrap();
        assert!(skipped[0]
            .classification
            .reason_codes
            .contains(&ReasonCode::DynamicSql));
    }

    #[test]
    fn test_tinyint1_maps_to_boolean() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.columns",
            vec![row(&[
                ("COLUMN_NAME", text("active")),
                ("COLUMN_TYPE", text("tinyint(1)")),
                ("IS_NULLABLE", text("NO")),
                ("COLUMN_DEFAULT", text("1")),
                ("EXTRA", text("")),
            ])],
        );
        let mut adapter = MysqlAdapter::new(Box::new(exec), config()).unwrap();
        let schema = adapter.get_schema("customers").unwrap();
        assert_eq!(schema.columns[0].type_info.ir_type, saiql_core::IrType::Boolean);
    }

    #[test]
    fn test_view_definition_strips_definer() {
        let exec = FixtureExecutor::new().on_rows(
            "from information_schema.views",
            vec![row(&[
                ("TABLE_NAME", text("v_customers")),
                (
                    "VIEW_DEFINITION",
                    text("CREATE DEFINER=`root`@`localhost` VIEW v_customers AS SELECT id FROM customers"),
                ),
            ])],
        );
        let mut adapter = MysqlAdapter::new(Box::new(exec), config()).unwrap();
        let definition = adapter.get_view_definition("v_customers").unwrap().unwrap();
        assert!(!definition.to_uppercase().contains("DEFINER"));
    }
}
