//! SQL Server adapter: L0 and L1 over an [`SqlExecutor`].
//!
//! Higher levels are advertised as unsupported through the capability
//! flags; the harness skips them instead of probing.

use crate::adapter::{
    fold_name, AdapterStatistics, DataExtract, DialectAdapter, ExtractStats, SessionInfo,
};
use crate::config::ConnectionConfig;
use crate::ddl;
use crate::error::AdapterError;
use crate::executor::{ExecErrorKind, ExecResult, Row, SqlExecutor, SqlValue};
use saiql_core::{
    registry, Column, Dialect, ForeignKey, IndexDef, MigrationLevel, TableSchema,
    UniqueConstraint,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct MssqlAdapter {
    exec: Box<dyn SqlExecutor>,
    config: ConnectionConfig,
    stats: AdapterStatistics,
}

impl MssqlAdapter {
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

impl DialectAdapter for MssqlAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    fn supports(&self, level: MigrationLevel) -> bool {
        matches!(level, MigrationLevel::L0 | MigrationLevel::L1)
    }

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError> {
        let mut info = SessionInfo::new(Dialect::Mssql);
        info.user = Some(self.config.user.clone());
        let rows = self.query_or_err("SELECT @@VERSION AS version", &[])?;
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

    fn placeholder(&self, idx: usize) -> String {
        format!("@p{idx}")
    }

    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError> {
        let rows = self.query_or_err(
            "SELECT TABLE_NAME \
             FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = 'dbo' \
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
            "SELECT COLUMN_NAME, DATA_TYPE, CHARACTER_MAXIMUM_LENGTH, \
                    NUMERIC_PRECISION, NUMERIC_SCALE, IS_NULLABLE, COLUMN_DEFAULT \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = 'dbo' AND TABLE_NAME = @p1 \
             ORDER BY ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(table))],
        )?;

        let mut schema = TableSchema::default();
        for row in &rows {
            let name = text_field(row, "column_name");
            let data_type = row
                .get("data_type")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let native_type = ddl::compose_type_string(
                data_type,
                row.get("character_maximum_length")
                    .and_then(|v| v.as_i64())
                    .filter(|len| *len > 0)
                    .map(|v| v as u32),
                row.get("numeric_precision")
                    .and_then(|v| v.as_i64())
                    .map(|v| v as u32),
                row.get("numeric_scale")
                    .and_then(|v| v.as_i64())
                    .map(|v| v as u32),
            );
            let type_info = registry::map_to_ir(Dialect::Mssql, &native_type);
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
                "SELECT * FROM dbo.{} ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                fold_name(table),
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
            "SELECT kcu.COLUMN_NAME \
             FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
               ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_NAME = @p1 \
             ORDER BY kcu.ORDINAL_POSITION",
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
            "SELECT rc.CONSTRAINT_NAME, kcu.COLUMN_NAME, \
                    kcu2.TABLE_NAME AS REF_TABLE, kcu2.COLUMN_NAME AS REF_COLUMN \
             FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
               ON rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu2 \
               ON rc.UNIQUE_CONSTRAINT_NAME = kcu2.CONSTRAINT_NAME \
              AND kcu.ORDINAL_POSITION = kcu2.ORDINAL_POSITION \
             WHERE kcu.TABLE_NAME = @p1 \
             ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION",
            &[SqlValue::Text(fold_name(table))],
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
            "SELECT tc.CONSTRAINT_NAME, kcu.COLUMN_NAME \
             FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
               ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
             WHERE tc.CONSTRAINT_TYPE = 'UNIQUE' AND tc.TABLE_NAME = @p1 \
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
            "SELECT i.name AS index_name, c.name AS column_name, \
                    i.is_unique, i.is_primary_key \
             FROM sys.indexes i \
             JOIN sys.index_columns ic \
               ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
             JOIN sys.columns c \
               ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
             WHERE i.object_id = OBJECT_ID(@p1) AND i.name IS NOT NULL \
             ORDER BY i.name, ic.key_ordinal",
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
                    .get("is_primary_key")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
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
