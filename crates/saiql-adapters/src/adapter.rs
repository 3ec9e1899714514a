//! The uniform capability surface every dialect adapter presents.
//!
//! The harness never branches on adapter type: optional capabilities are
//! advertised through [`DialectAdapter::supports`], and asking anyway yields
//! a reasoned [`AdapterError::NotSupported`], never a panic.

use crate::error::AdapterError;
use crate::executor::{ExecResult, Row, SqlValue};
use saiql_core::order::topo_order_views;
use saiql_core::{
    Dialect, ForeignKey, IndexDef, MigrationLevel, Routine, RoutineKind, TableSchema, Trigger,
    UniqueConstraint, ViewDef, ViewDependency,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Statistics for one L0 extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub row_count: usize,
    pub duration_ms: u64,
    /// The ordering key actually used; recorded so repeated extraction is
    /// provably over the same total order.
    pub order_key_used: String,
    pub chunk_size: usize,
    pub chunks: usize,
}

/// Ordered row stream plus its extraction statistics.
#[derive(Debug, Clone)]
pub struct DataExtract {
    pub rows: Vec<Row>,
    pub stats: ExtractStats,
}

/// Outcome of a bulk emission pass. Partial failure aborts the object,
/// records it, and proceeds to the next.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub created: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BulkOutcome {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-adapter counters, surfaced in the run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdapterStatistics {
    pub queries_executed: u64,
    pub failures: u64,
    pub retries: u64,
}

/// Engine version plus session settings (PRAGMA, NLS, sql_mode) recorded in
/// the run manifest.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub dialect: Dialect,
    pub version: Option<String>,
    pub user: Option<String>,
    pub settings: BTreeMap<String, String>,
}

impl SessionInfo {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            version: None,
            user: None,
            settings: BTreeMap::new(),
        }
    }
}

/// The L0-L4 capability surface over one engine.
///
/// Mutating calls return [`ExecResult`] records; constraint violations are
/// data, not errors. Introspection calls return `Result` because a lost
/// connection genuinely ends the operation.
pub trait DialectAdapter {
    fn dialect(&self) -> Dialect;

    /// Capability flag per level; consulted instead of discovered by error.
    fn supports(&self, level: MigrationLevel) -> bool;

    fn session_info(&mut self) -> Result<SessionInfo, AdapterError>;

    fn statistics(&self) -> AdapterStatistics;

    /// Run one raw statement against the engine. The escape hatch the
    /// harness uses for composed DDL; returns a result record like every
    /// other mutating call.
    fn execute_raw(&mut self, sql: &str) -> ExecResult;

    /// As [`Self::execute_raw`] with bound parameters in this dialect's
    /// placeholder style (see [`Self::placeholder`]).
    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> ExecResult;

    /// Positional placeholder for 1-based parameter `idx`.
    fn placeholder(&self, idx: usize) -> String {
        let _ = idx;
        "?".to_string()
    }

    // ----- L0: tables ------------------------------------------------------

    /// User tables only, ascending by name; system schemas excluded.
    fn list_tables(&mut self) -> Result<Vec<String>, AdapterError>;

    fn get_schema(&mut self, table: &str) -> Result<TableSchema, AdapterError>;

    /// Ordered, chunked, single-pass extraction. When `order_by` is absent
    /// the adapter picks the primary key, else the first column, and records
    /// the choice in the stats.
    fn extract_data(
        &mut self,
        table: &str,
        order_by: Option<&str>,
        chunk_size: usize,
    ) -> Result<DataExtract, AdapterError>;

    // ----- L1: constraints and physical structure --------------------------

    fn get_primary_keys(&mut self, table: &str) -> Result<Vec<String>, AdapterError> {
        let _ = table;
        Err(self.not_supported(MigrationLevel::L1))
    }

    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKey>, AdapterError> {
        let _ = table;
        Err(self.not_supported(MigrationLevel::L1))
    }

    fn get_unique_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<UniqueConstraint>, AdapterError> {
        let _ = table;
        Err(self.not_supported(MigrationLevel::L1))
    }

    fn get_indexes(&mut self, table: &str) -> Result<Vec<IndexDef>, AdapterError> {
        let _ = table;
        Err(self.not_supported(MigrationLevel::L1))
    }

    // ----- L2: views -------------------------------------------------------

    fn list_views(&mut self, schema: Option<&str>) -> Result<Vec<ViewDef>, AdapterError> {
        let _ = schema;
        Err(self.not_supported(MigrationLevel::L2))
    }

    fn get_view_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let _ = name;
        Err(self.not_supported(MigrationLevel::L2))
    }

    fn get_view_dependencies(
        &mut self,
        name: &str,
    ) -> Result<Vec<ViewDependency>, AdapterError> {
        let _ = name;
        Err(self.not_supported(MigrationLevel::L2))
    }

    /// Views in creation order: topological over view-to-view dependencies,
    /// lexical tie-break, cycles broken loudly.
    fn topologically_order_views(
        &mut self,
        schema: Option<&str>,
    ) -> Result<Vec<ViewDef>, AdapterError> {
        let views = self.list_views(schema)?;
        let ordering = topo_order_views(&views);
        for broken in &ordering.cycle_breaks {
            warn!(view = broken.as_str(), "cyclic view dependency broken");
        }
        let by_name: BTreeMap<&str, &ViewDef> =
            views.iter().map(|v| (v.name.as_str(), v)).collect();
        Ok(ordering
            .order
            .iter()
            .filter_map(|name| by_name.get(name.as_str()).map(|v| (*v).clone()))
            .collect())
    }

    /// `definition` is the view's query text; the adapter wraps it.
    fn create_view(&mut self, name: &str, definition: &str) -> ExecResult {
        let sql = if definition.trim_start().to_uppercase().starts_with("CREATE") {
            definition.to_string()
        } else {
            format!("CREATE VIEW {name} AS {definition}")
        };
        self.execute_raw(&sql)
    }

    fn drop_view(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP VIEW {name}"))
    }

    fn bulk_create_views_in_order(&mut self, views: &[ViewDef]) -> BulkOutcome {
        let ordering = topo_order_views(views);
        let by_name: BTreeMap<&str, &ViewDef> =
            views.iter().map(|v| (v.name.as_str(), v)).collect();

        let mut outcome = BulkOutcome::default();
        for name in &ordering.order {
            let Some(view) = by_name.get(name.as_str()) else {
                continue;
            };
            let definition = view.definition.clone();
            let result = self.create_view(name, &definition);
            if result.success {
                outcome.created.push(name.clone());
            } else {
                outcome.failed.push((
                    name.clone(),
                    result.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
        }
        outcome
    }

    // ----- L3: routines ----------------------------------------------------

    fn list_routines(&mut self, schema: Option<&str>) -> Result<Vec<Routine>, AdapterError> {
        let _ = schema;
        Err(self.not_supported(MigrationLevel::L3))
    }

    fn get_routine_definition(
        &mut self,
        name: &str,
        kind: RoutineKind,
    ) -> Result<Option<String>, AdapterError> {
        let _ = (name, kind);
        Err(self.not_supported(MigrationLevel::L3))
    }

    /// Routines inside the dialect's safe subset.
    fn list_safe_routines(&mut self, schema: Option<&str>) -> Result<Vec<Routine>, AdapterError> {
        Ok(self
            .list_routines(schema)?
            .into_iter()
            .filter(|r| r.classification.allowed)
            .collect())
    }

    /// Routines outside the subset; every entry carries non-empty reasons.
    fn list_skipped_routines(
        &mut self,
        schema: Option<&str>,
    ) -> Result<Vec<Routine>, AdapterError> {
        Ok(self
            .list_routines(schema)?
            .into_iter()
            .filter(|r| !r.classification.allowed)
            .collect())
    }

    fn create_routine(&mut self, definition: &str) -> ExecResult {
        self.execute_raw(definition)
    }

    fn drop_routine(&mut self, name: &str, kind: RoutineKind) -> ExecResult {
        let keyword = match kind {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Package => "PACKAGE",
        };
        self.execute_raw(&format!("DROP {keyword} {name}"))
    }

    /// Dependency information for routines is advisory at best; emission
    /// order is lexical by name.
    fn bulk_create_routines_in_order(&mut self, routines: &[Routine]) -> BulkOutcome {
        let mut sorted: Vec<&Routine> = routines.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut outcome = BulkOutcome::default();
        for routine in sorted {
            let result = self.create_routine(&routine.definition);
            if result.success {
                outcome.created.push(routine.name.clone());
            } else {
                outcome.failed.push((
                    routine.name.clone(),
                    result.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
        }
        outcome
    }

    // ----- L4: triggers ----------------------------------------------------

    fn list_triggers(&mut self, schema: Option<&str>) -> Result<Vec<Trigger>, AdapterError> {
        let _ = schema;
        Err(self.not_supported(MigrationLevel::L4))
    }

    fn get_trigger_definition(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let _ = name;
        Err(self.not_supported(MigrationLevel::L4))
    }

    fn list_safe_triggers(&mut self, schema: Option<&str>) -> Result<Vec<Trigger>, AdapterError> {
        Ok(self
            .list_triggers(schema)?
            .into_iter()
            .filter(|t| t.classification.allowed)
            .collect())
    }

    fn list_skipped_triggers(
        &mut self,
        schema: Option<&str>,
    ) -> Result<Vec<Trigger>, AdapterError> {
        Ok(self
            .list_triggers(schema)?
            .into_iter()
            .filter(|t| !t.classification.allowed)
            .collect())
    }

    fn create_trigger(&mut self, definition: &str) -> ExecResult {
        self.execute_raw(definition)
    }

    fn drop_trigger(&mut self, name: &str) -> ExecResult {
        self.execute_raw(&format!("DROP TRIGGER {name}"))
    }

    // ----- helpers ---------------------------------------------------------

    fn not_supported(&self, level: MigrationLevel) -> AdapterError {
        AdapterError::NotSupported {
            dialect: self.dialect(),
            level,
        }
    }
}

/// Case folding at the adapter boundary: every schema-level object name is
/// lower-cased once, here, and preserved case-folded downstream.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_name() {
        assert_eq!(fold_name("CUSTOMERS"), "customers");
        assert_eq!(fold_name("V_Top_Customers"), "v_top_customers");
    }

    #[test]
    fn test_bulk_outcome_success() {
        let mut outcome = BulkOutcome::default();
        assert!(outcome.success());
        outcome.failed.push(("v".into(), "boom".into()));
        assert!(!outcome.success());
    }
}
