//! Oracle adapter: full L0-L4 surface over an [`SqlExecutor`].
//!
//! Introspection reads the `USER_*` data-dictionary views, so the adapter
//! sees exactly what the connected (dedicated, non-SYS) user owns. Oracle
//! folds identifiers to uppercase; this adapter folds them back to
//! lowercase at the boundary like every other engine.

use crate::adapter::{
    fold_name, AdapterStatistics, DataExtract, DialectAdapter, ExtractStats, SessionInfo,
};
use crate::config::ConnectionConfig;
use crate::error::AdapterError;
use crate::executor::{ExecErrorKind, ExecResult, Row, SqlExecutor, SqlValue};
use saiql_core::analyzer::{PackageAnalyzer, TriggerAnalyzer};
use saiql_core::{
    registry, Classification, Column, DataAccess, DependencyKind, Dialect, ForeignKey, IndexDef,
    MigrationLevel, ReasonCode, Routine, RoutineKind, SecurityMode, TableSchema, Trigger,
    TriggerEvent, TriggerScope, TriggerTiming, UniqueConstraint, ViewDef, ViewDependency,
    Volatility,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Routines scoring above this are refused automatic migration.
const COMPLEXITY_THRESHOLD: u32 = 40;

pub struct OracleAdapter {
    exec: Box<dyn SqlExecutor>,
    config: ConnectionConfig,
    stats: AdapterStatistics,
}

impl OracleAdapter {
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

    /// Assemble a routine's source text from `USER_SOURCE` lines.
    fn routine_source(&mut self, name: &str, object_type: &str) -> Result<String, AdapterError> {
        let rows = self.query_or_err(
            "SELECT text FROM user_source \
             WHERE name = UPPER(:1) AND type = :2 \
             ORDER BY line",
            &[
                SqlValue::Text(name.to_string()),
                SqlValue::Text(object_type.to_string()),
            ],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("text").and_then(|v| v.as_str()))
            .collect::<String>())
    }

    /// Explicit per-routine classification, complexity-scored. Packages are
    /// never admitted; standalone routines pass when they stay under the
    /// complexity threshold and avoid dynamic SQL and cursors.
    fn classify_routine(kind: RoutineKind, body: &str) -> Classification {
        if kind == RoutineKind::Package {
            return Classification::denied(vec![ReasonCode::PackageObject]);
        }

        let mut codes = Vec::new();
        let upper = body.to_uppercase();
        if upper.contains("EXECUTE IMMEDIATE") {
            codes.push(ReasonCode::DynamicSql);
        }
        if upper.contains("CURSOR") {
            codes.push(ReasonCode::LoopOrCursor);
        }
        let complexity = PackageAnalyzer::new("postgres")
            .analyze(body, "routine")
            .complexity_score;
        if complexity > COMPLEXITY_THRESHOLD {
            codes.push(ReasonCode::ComplexityExceeded);
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
        definition: &str,
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
        let analysis = TriggerAnalyzer::new(Dialect::Oracle).analyze(definition);
        if analysis.is_supported() {
            Classification::allowed()
        } else {
            Classification::denied(analysis.reason_codes)
        }
    }
}

impl DialectAdapter for OracleAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn supports(&self, _level: MigrationLevel) -> bool {
        true
    }

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError> {
        let mut info = SessionInfo::new(Dialect::Oracle);
        info.user = Some(self.config.user.clone());
        let version_rows = self.query_or_err(
            "SELECT banner AS version FROM v$version WHERE ROWNUM = 1",
            &[],
        )?;
        info.version = version_rows
            .first()
            .and_then(|r| r.get("version"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let nls_rows = self.query_or_err(
            "SELECT parameter, value FROM nls_session_parameters ORDER BY parameter",
            &[],
        )?;
        for row in &nls_rows {
            if let (Some(parameter), Some(value)) = (
                row.get("parameter").and_then(|v| v.as_str()),
                row.get("value").and_then(|v| v.as_str()),
            ) {
                info.settings
                    .insert(parameter.to_lowercase(), value.to_string());
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
        format!(":{idx}")
    }

    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT table_name FROM user_tables ORDER BY table_name",
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
            "SELECT column_name, data_type, data_length, data_precision, \
                    data_scale, nullable, data_default \
             FROM user_tab_columns \
             WHERE table_name = UPPER(:1) \
             ORDER BY column_id",
            &[SqlValue::Text(table.to_string())],
        )?;

        let mut schema = TableSchema::default();
        for row in &rows {
            let name = text_field(row, "column_name");
            let data_type = row
                .get("data_type")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let native_type = compose_oracle_type(
                &data_type,
                row.get("data_length").and_then(|v| v.as_i64()),
                row.get("data_precision").and_then(|v| v.as_i64()),
                row.get("data_scale").and_then(|v| v.as_i64()),
            );
            let type_info = registry::map_to_ir(Dialect::Oracle, &native_type);
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
                    .get("nullable")
                    .and_then(|v| v.as_str())
                    .map(|v| v.eq_ignore_ascii_case("Y"))
                    .unwrap_or(true),
                default: row
                    .get("data_default")
                    .filter(|v| !v.is_null())
                    .map(|v| v.render().trim().to_string()),
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
                "SELECT * FROM {} ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                table.to_uppercase(),
                order_key,
                rows.len(),
                chunk_size
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
            "SELECT cc.column_name \
             FROM user_constraints c \
             JOIN user_cons_columns cc ON c.constraint_name = cc.constraint_name \
             WHERE c.constraint_type = 'P' AND c.table_name = UPPER(:1) \
             ORDER BY cc.position",
            &[SqlValue::Text(table.to_string())],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("column_name").and_then(|v| v.as_str()))
            .map(fold_name)
            .collect())
    }

    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKey>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT c.constraint_name, cc.column_name, \
                    rc.table_name AS ref_table, rcc.column_name AS ref_column \
             FROM user_constraints c \
             JOIN user_cons_columns cc ON c.constraint_name = cc.constraint_name \
             JOIN user_constraints rc ON c.r_constraint_name = rc.constraint_name \
             JOIN user_cons_columns rcc ON rc.constraint_name = rcc.constraint_name \
              AND rcc.position = cc.position \
             WHERE c.constraint_type = 'R' AND c.table_name = UPPER(:1) \
             ORDER BY c.constraint_name, cc.position",
            &[SqlValue::Text(table.to_string())],
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
            "SELECT c.constraint_name, cc.column_name \
             FROM user_constraints c \
             JOIN user_cons_columns cc ON c.constraint_name = cc.constraint_name \
             WHERE c.constraint_type = 'U' AND c.table_name = UPPER(:1) \
             ORDER BY c.constraint_name, cc.position",
            &[SqlValue::Text(table.to_string())],
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
            "SELECT i.index_name, ic.column_name, i.uniqueness \
             FROM user_indexes i \
             JOIN user_ind_columns ic ON i.index_name = ic.index_name \
             WHERE i.table_name = UPPER(:1) \
             ORDER BY i.index_name, ic.column_position",
            &[SqlValue::Text(table.to_string())],
        )?;

        let pk_cols = self.get_primary_keys(table)?;
        let mut indexes: BTreeMap<String, IndexDef> = BTreeMap::new();
        for row in &rows {
            let name = text_field(row, "index_name");
            let entry = indexes.entry(name.clone()).or_insert_with(|| IndexDef {
                name,
                columns: Vec::new(),
                unique: row
                    .get("uniqueness")
                    .and_then(|v| v.as_str())
                    .map(|u| u.eq_ignore_ascii_case("UNIQUE"))
                    .unwrap_or(false),
                primary: false,
            });
            entry.columns.push(text_field(row, "column_name"));
        }
        let mut out: Vec<IndexDef> = indexes.into_values().collect();
        for index in &mut out {
            index.primary = index.unique && index.columns == pk_cols;
        }
        Ok(out)
    }

    fn list_views(&mut self, _schema: Option<&str>) -> Result<Vec<ViewDef>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT view_name, text FROM user_views ORDER BY view_name",
            &[],
        )?;

        let mut views = Vec::new();
        for row in &rows {
            let name = text_field(row, "view_name");
            let definition = row
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let dependencies = self.get_view_dependencies(&name)?;
            views.push(ViewDef {
                schema: None,
                name,
                definition,
                dependencies,
            });
        }
        Ok(views)
    }

    fn get_view_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT text FROM user_views WHERE view_name = UPPER(:1)",
            &[SqlValue::Text(name.to_string())],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get("text"))
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn get_view_dependencies(&mut self, name: &str) -> Result<Vec<ViewDependency>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT referenced_name, referenced_type \
             FROM user_dependencies \
             WHERE name = UPPER(:1) AND type = 'VIEW' \
               AND referenced_type IN ('TABLE', 'VIEW') \
             ORDER BY referenced_name",
            &[SqlValue::Text(name.to_string())],
        )?;
        Ok(rows
            .iter()
            .map(|r| ViewDependency {
                kind: match r
                    .get("referenced_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .as_str()
                {
                    "VIEW" => DependencyKind::View,
                    _ => DependencyKind::Table,
                },
                name: text_field(r, "referenced_name"),
            })
            .collect())
    }

    fn list_routines(&mut self, _schema: Option<&str>) -> Result<Vec<Routine>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT object_name, object_type FROM user_objects \
             WHERE object_type IN ('FUNCTION', 'PROCEDURE', 'PACKAGE') \
             ORDER BY object_type, object_name",
            &[],
        )?;

        let mut routines = Vec::new();
        for row in &rows {
            let name = text_field(row, "object_name");
            let object_type = row
                .get("object_type")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase();
            let kind = match object_type.as_str() {
                "PROCEDURE" => RoutineKind::Procedure,
                "PACKAGE" => RoutineKind::Package,
                _ => RoutineKind::Function,
            };
            let body = self.routine_source(&name, &object_type)?;
            let definition = format!("CREATE OR REPLACE {body}");
            routines.push(Routine {
                schema: None,
                name,
                kind,
                language: "plsql".to_string(),
                volatility: Volatility::Volatile,
                data_access: DataAccess::Contains,
                security: SecurityMode::Invoker,
                parameters: Vec::new(),
                return_type: None,
                body: body.clone(),
                definition,
                classification: Self::classify_routine(kind, &body),
            });
        }
        Ok(routines)
    }

    fn get_routine_definition(
        &mut self,
        name: &str,
        kind: RoutineKind,
    ) -> Result<Option<String>, AdapterError> {
        let object_type = match kind {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Package => "PACKAGE",
        };
        let body = self.routine_source(name, object_type)?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("CREATE OR REPLACE {body}")))
    }

    fn list_triggers(&mut self, _schema: Option<&str>) -> Result<Vec<Trigger>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT trigger_name, trigger_type, triggering_event, \
                    table_name, trigger_body, description \
             FROM user_triggers \
             ORDER BY trigger_name",
            &[],
        )?;

        Ok(rows
            .iter()
            .map(|row| {
                let trigger_type = row
                    .get("trigger_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase();
                let timing = if trigger_type.starts_with("INSTEAD OF") {
                    TriggerTiming::InsteadOf
                } else if trigger_type.starts_with("AFTER") {
                    TriggerTiming::After
                } else {
                    TriggerTiming::Before
                };
                let scope = if trigger_type.contains("EACH ROW") {
                    TriggerScope::Row
                } else {
                    TriggerScope::Statement
                };
                let events = row
                    .get("triggering_event")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_uppercase()
                    .split(" OR ")
                    .filter_map(|event| match event.trim() {
                        "INSERT" => Some(TriggerEvent::Insert),
                        "UPDATE" => Some(TriggerEvent::Update),
                        "DELETE" => Some(TriggerEvent::Delete),
                        _ => None,
                    })
                    .collect();
                let body = row
                    .get("trigger_body")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let description = row
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                let definition = format!("CREATE OR REPLACE TRIGGER {description}\n{body}");
                let classification = Self::classify_trigger(timing, scope, &definition);

                Trigger {
                    schema: None,
                    name: text_field(row, "trigger_name"),
                    table: text_field(row, "table_name"),
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
        let triggers = self.list_triggers(None)?;
        Ok(triggers
            .into_iter()
            .find(|t| t.name == fold_name(name))
            .map(|t| t.definition))
    }
}

fn text_field(row: &Row, field: &str) -> String {
    row.get(field)
        .and_then(|v| v.as_str())
        .map(fold_name)
        .unwrap_or_default()
}

/// Oracle reports length for character types and precision/scale only for
/// NUMBER; everything else renders bare.
fn compose_oracle_type(
    data_type: &str,
    length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
) -> String {
    let upper = data_type.to_uppercase();
    match upper.as_str() {
        "VARCHAR2" | "NVARCHAR2" | "CHAR" | "NCHAR" | "RAW" => match length {
            Some(len) => format!("{upper}({len})"),
            None => upper,
        },
        "NUMBER" => match (precision, scale) {
            (Some(p), Some(s)) if s > 0 => format!("NUMBER({p},{s})"),
            (Some(p), _) => format!("NUMBER({p})"),
            _ => upper,
        },
        _ => upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{row, FixtureExecutor};

    fn config() -> ConnectionConfig {
        ConnectionConfig::new(Dialect::Oracle, "localhost", "XEPDB1").with_user("saiql_mig")
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn test_list_tables_folds_uppercase_names() {
        let exec = FixtureExecutor::new().on_rows(
            "from user_tables",
            vec![
                row(&[("TABLE_NAME", text("AUDIT_LOG"))]),
                row(&[("TABLE_NAME", text("CUSTOMERS"))]),
                row(&[("TABLE_NAME", text("ORDERS"))]),
            ],
        );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        assert_eq!(
            adapter.list_tables().unwrap(),
            vec!["audit_log", "customers", "orders"]
        );
    }

    #[test]
    fn test_schema_number_and_varchar2_mapping() {
        let exec = FixtureExecutor::new().on_rows(
            "from user_tab_columns",
            vec![
                row(&[
                    ("COLUMN_NAME", text("ID")),
                    ("DATA_TYPE", text("NUMBER")),
                    ("DATA_LENGTH", SqlValue::Integer(22)),
                    ("DATA_PRECISION", SqlValue::Integer(10)),
                    ("DATA_SCALE", SqlValue::Integer(0)),
                    ("NULLABLE", text("N")),
                    ("DATA_DEFAULT", SqlValue::Null),
                ]),
                row(&[
                    ("COLUMN_NAME", text("NAME")),
                    ("DATA_TYPE", text("VARCHAR2")),
                    ("DATA_LENGTH", SqlValue::Integer(100)),
                    ("DATA_PRECISION", SqlValue::Null),
                    ("DATA_SCALE", SqlValue::Null),
                    ("NULLABLE", text("Y")),
                    ("DATA_DEFAULT", SqlValue::Null),
                ]),
            ],
        );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        let schema = adapter.get_schema("customers").unwrap();
        assert_eq!(schema.columns[0].native_type, "NUMBER(10)");
        assert_eq!(schema.columns[0].type_info.ir_type, saiql_core::IrType::Decimal);
        assert!(!schema.columns[0].nullable);
        assert_eq!(schema.columns[1].native_type, "VARCHAR2(100)");
        assert_eq!(schema.columns[1].type_info.length, Some(100));
    }

    #[test]
    fn test_view_on_view_dependency() {
        let exec = FixtureExecutor::new()
            .on_rows(
                "from user_views",
                vec![
                    row(&[
                        ("VIEW_NAME", text("V_CUSTOMER_SUMMARY")),
                        ("TEXT", text("SELECT id, name FROM customers")),
                    ]),
                    row(&[
                        ("VIEW_NAME", text("V_TOP_CUSTOMERS")),
                        ("TEXT", text("SELECT id FROM v_customer_summary WHERE total > 100")),
                    ]),
                ],
            )
            .on(
                "from user_dependencies",
                ExecResult::ok_rows(vec![row(&[
                    ("REFERENCED_NAME", text("V_CUSTOMER_SUMMARY")),
                    ("REFERENCED_TYPE", text("VIEW")),
                ])]),
            );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        let ordered = adapter.topologically_order_views(None).unwrap();
        let names: Vec<&str> = ordered.iter().map(|v| v.name.as_str()).collect();
        let summary = names.iter().position(|n| *n == "v_customer_summary").unwrap();
        let top = names.iter().position(|n| *n == "v_top_customers").unwrap();
        assert!(summary < top);
    }

    #[test]
    fn test_package_routines_always_denied() {
        let exec = FixtureExecutor::new()
            .on_rows(
                "from user_objects",
                vec![row(&[
                    ("OBJECT_NAME", text("ORDER_MGMT")),
                    ("OBJECT_TYPE", text("PACKAGE")),
                ])],
            )
            .on_rows(
                "from user_source",
                vec![row(&[("TEXT", text("PACKAGE order_mgmt AS PROCEDURE p; END;"))])],
            );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        let skipped = adapter.list_skipped_routines(None).unwrap();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0]
            .classification
            .reason_codes
            .contains(&ReasonCode::PackageObject));
    }

    #[test]
    fn test_dynamic_sql_routine_denied() {
        let exec = FixtureExecutor::new()
            .on_rows(
                "from user_objects",
                vec![row(&[
                    ("OBJECT_NAME", text("RUN_ANY")),
                    ("OBJECT_TYPE", text("PROCEDURE")),
                ])],
            )
            .on_rows(
                "from user_source",
                vec![row(&[(
                    "TEXT",
                    text("PROCEDURE run_any(p_sql VARCHAR2) IS BEGIN EXECUTE IMMEDIATE p_sql; END;"),
                )])],
            );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        let skipped = adapter.list_skipped_routines(None).unwrap();
        assert!(skipped[0]
            .classification
            .reason_codes
            .contains(&ReasonCode::DynamicSql));
    }

    #[test]
    fn test_after_row_trigger_skipped() {
        let exec = FixtureExecutor::new().on_rows(
            "from user_triggers",
            vec![row(&[
                ("TRIGGER_NAME", text("TRG_AUDIT_CUSTOMERS")),
                ("TRIGGER_TYPE", text("AFTER EACH ROW")),
                ("TRIGGERING_EVENT", text("INSERT")),
                ("TABLE_NAME", text("CUSTOMERS")),
                (
                    "TRIGGER_BODY",
                    text("BEGIN INSERT INTO audit_log (operation, new_id) VALUES ('INSERT', :NEW.id); END;"),
                ),
                (
                    "DESCRIPTION",
                    text("TRG_AUDIT_CUSTOMERS AFTER INSERT ON CUSTOMERS FOR EACH ROW"),
                ),
            ])],
        );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        let skipped = adapter.list_skipped_triggers(None).unwrap();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0]
            .classification
            .reason_codes
            .contains(&ReasonCode::AfterTrigger));
        assert_eq!(skipped[0].events, vec![TriggerEvent::Insert]);
        assert_eq!(skipped[0].table, "customers");
    }

    #[test]
    fn test_before_normalize_trigger_safe() {
        let exec = FixtureExecutor::new().on_rows(
            "from user_triggers",
            vec![row(&[
                ("TRIGGER_NAME", text("TRG_LOWER_EMAIL")),
                ("TRIGGER_TYPE", text("BEFORE EACH ROW")),
                ("TRIGGERING_EVENT", text("INSERT")),
                ("TABLE_NAME", text("CUSTOMERS")),
                (
                    "TRIGGER_BODY",
                    text("BEGIN :NEW.email := LOWER(:NEW.email); END;"),
                ),
                (
                    "DESCRIPTION",
                    text("TRG_LOWER_EMAIL BEFORE INSERT ON CUSTOMERS FOR EACH ROW"),
                ),
            ])],
        );
        let mut adapter = OracleAdapter::new(Box::new(exec), config()).unwrap();
        let safe = adapter.list_safe_triggers(None).unwrap();
        assert_eq!(safe.len(), 1);
        assert_eq!(safe[0].name, "trg_lower_email");
    }

    #[test]
    fn test_compose_oracle_type() {
        assert_eq!(
            compose_oracle_type("NUMBER", Some(22), Some(10), Some(2)),
            "NUMBER(10,2)"
        );
        assert_eq!(
            compose_oracle_type("VARCHAR2", Some(50), None, None),
            "VARCHAR2(50)"
        );
        assert_eq!(compose_oracle_type("CLOB", Some(4000), None, None), "CLOB");
    }
}
