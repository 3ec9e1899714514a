//! SAP HANA adapter: L0 and L1 over an [`SqlExecutor`].
//!
//! HANA is a source engine here; the type registry's three-tier class
//! (exact / lossy / partial) governs what survives extraction. Geometry,
//! ALPHANUM and full-text types map to UNKNOWN and either abort under
//! `strict_types` or ride along flagged.

use crate::adapter::{
    fold_name, AdapterStatistics, DataExtract, DialectAdapter, ExtractStats, SessionInfo,
};
use crate::config::ConnectionConfig;
use crate::error::AdapterError;
use crate::executor::{ExecErrorKind, ExecResult, Row, SqlExecutor, SqlValue};
use saiql_core::{
    registry, Column, Dialect, ForeignKey, IndexDef, MigrationLevel, TableSchema,
    UniqueConstraint,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct HanaAdapter {
    exec: Box<dyn SqlExecutor>,
    config: ConnectionConfig,
    stats: AdapterStatistics,
}

impl HanaAdapter {
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

    fn query_or_err(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AdapterError> {
        let result = self.run_query(sql, params);
        if !result.success {
            return Err(AdapterError::Query(result.error.unwrap_or_default()));
        }
        Ok(result.rows)
    }
}

impl DialectAdapter for HanaAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Hana
    }

    fn supports(&self, level: MigrationLevel) -> bool {
        matches!(level, MigrationLevel::L0 | MigrationLevel::L1)
    }

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError> {
        let mut info = SessionInfo::new(Dialect::Hana);
        info.user = Some(self.config.user.clone());
        let rows = self.query_or_err("SELECT VERSION FROM SYS.M_DATABASE", &[])?;
        info.version = rows
            .first()
            .and_then(|r| r.get("version"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(info)
    }

    fn statistics(&self) -> AdapterStatistics {
        self.stats
    }

    fn execute_raw(&mut self, sql: &str) -> ExecResult {
        self.stats.queries_executed += 1;
        let result = self.exec.execute(sql, &[]);
        if !result.success {
            self.stats.failures += 1;
        }
        result
    }

    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult {
        self.stats.queries_executed += 1;
        let result = self.exec.execute(sql, params);
        if !result.success {
            self.stats.failures += 1;
        }
        result
    }

    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT TABLE_NAME FROM SYS.TABLES \
             WHERE SCHEMA_NAME = CURRENT_SCHEMA AND IS_SYSTEM_TABLE = 'FALSE' \
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
            "SELECT COLUMN_NAME, DATA_TYPE_NAME, LENGTH, SCALE, IS_NULLABLE, DEFAULT_VALUE \
             FROM SYS.TABLE_COLUMNS \
             WHERE SCHEMA_NAME = CURRENT_SCHEMA AND TABLE_NAME = UPPER(?) \
             ORDER BY POSITION",
            &[SqlValue::Text(table.to_string())],
        )?;

        let mut schema = TableSchema::default();
        for row in &rows {
            let name = text_field(row, "column_name");
            let data_type = row
                .get("data_type_name")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let native_type = compose_hana_type(
                data_type,
                row.get("length").and_then(|v| v.as_i64()),
                row.get("scale").and_then(|v| v.as_i64()),
            );
            let type_info = registry::map_to_ir(Dialect::Hana, &native_type);
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
                    .get("default_value")
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
                "SELECT * FROM {} ORDER BY {} LIMIT {} OFFSET {}",
                table.to_uppercase(),
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
            "SELECT COLUMN_NAME FROM SYS.CONSTRAINTS \
             WHERE SCHEMA_NAME = CURRENT_SCHEMA AND TABLE_NAME = UPPER(?) \
               AND IS_PRIMARY_KEY = 'TRUE' \
             ORDER BY POSITION",
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
            "SELECT CONSTRAINT_NAME, COLUMN_NAME, \
                    REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
             FROM SYS.REFERENTIAL_CONSTRAINTS \
             WHERE SCHEMA_NAME = CURRENT_SCHEMA AND TABLE_NAME = UPPER(?) \
             ORDER BY CONSTRAINT_NAME, POSITION",
            &[SqlValue::Text(table.to_string())],
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
            "SELECT CONSTRAINT_NAME, COLUMN_NAME FROM SYS.CONSTRAINTS \
             WHERE SCHEMA_NAME = CURRENT_SCHEMA AND TABLE_NAME = UPPER(?) \
               AND IS_UNIQUE_KEY = 'TRUE' AND IS_PRIMARY_KEY = 'FALSE' \
             ORDER BY CONSTRAINT_NAME, POSITION",
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
            "SELECT i.INDEX_NAME, ic.COLUMN_NAME, i.CONSTRAINT \
             FROM SYS.INDEXES i \
             JOIN SYS.INDEX_COLUMNS ic \
               ON i.SCHEMA_NAME = ic.SCHEMA_NAME AND i.INDEX_NAME = ic.INDEX_NAME \
             WHERE i.SCHEMA_NAME = CURRENT_SCHEMA AND i.TABLE_NAME = UPPER(?) \
             ORDER BY i.INDEX_NAME, ic.POSITION",
            &[SqlValue::Text(table.to_string())],
        )?;

        let mut indexes: BTreeMap<String, IndexDef> = BTreeMap::new();
        for row in &rows {
            let name = text_field(row, "index_name");
            let constraint = row
                .get("constraint")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase();
            let entry = indexes.entry(name.clone()).or_insert_with(|| IndexDef {
                name,
                columns: Vec::new(),
                unique: constraint.contains("UNIQUE") || constraint.contains("PRIMARY"),
                primary: constraint.contains("PRIMARY"),
            });
            entry.columns.push(text_field(row, "column_name"));
        }
        Ok(indexes.into_values().collect())
    }
}

fn text_field(row: &Row, field: &str) -> String {
    row.get(field)
        .and_then(|v| v.as_str())
        .map(fold_name)
        .unwrap_or_default()
}

/// HANA reports LENGTH for character/decimal types and SCALE for decimals.
fn compose_hana_type(data_type: &str, length: Option<i64>, scale: Option<i64>) -> String {
    let upper = data_type.to_uppercase();
    match upper.as_str() {
        "VARCHAR" | "NVARCHAR" | "CHAR" | "NCHAR" | "SHORTTEXT" | "VARBINARY" | "BINARY" => {
            match length {
                Some(len) => format!("{upper}({len})"),
                None => upper,
            }
        }
        "DECIMAL" => match (length, scale) {
            (Some(p), Some(s)) if s > 0 => format!("DECIMAL({p},{s})"),
            (Some(p), _) => format!("DECIMAL({p})"),
            _ => upper,
        },
        _ => upper,
    }
}
