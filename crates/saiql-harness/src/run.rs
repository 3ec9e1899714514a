//! The run harness: one full migration pass, L0 through L4, against a
//! paired source and target adapter.
//!
//! State is fully per-run. Levels execute sequentially; within a level,
//! objects are processed sequentially in their canonical order, which keeps
//! every report and the seed hash deterministic.

use crate::emit;
use crate::error::HarnessError;
use chrono::{DateTime, Utc};
use saiql_adapters::{
    AdapterError, DialectAdapter, RedactedEndpoint, SessionInfo, SqlValue,
};
use saiql_core::analyzer::ViewAnalyzer;
use saiql_core::{
    Dialect, MigrationLevel, ObjectType, TranslateMode, Translator,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Identities refused outright for server engines. Runs require a
/// documented dedicated migration user.
const FORBIDDEN_USERS: &[&str] = &["sys", "system", "root", "sa"];

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Explicit run id; generated from the wall clock when absent.
    pub run_id: Option<String>,
    pub levels: Vec<MigrationLevel>,
    pub chunk_size: usize,
    /// Per-run object-name prefix for shared targets where schema creation
    /// needs elevated privileges. Fresh-file targets leave this unset.
    pub object_prefix: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_id: None,
            levels: MigrationLevel::ALL.to_vec(),
            chunk_size: 500,
            object_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "INCOMPLETE")]
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelStatus {
    Pass,
    Fail,
    /// The adapter pair does not support this level; nothing was attempted.
    Skipped,
}

/// Outcome of one level within one run.
#[derive(Debug, Clone, Serialize)]
pub struct LevelResult {
    pub status: LevelStatus,
    pub migrated: usize,
    pub skipped: usize,
    /// Reason-code histogram for skipped objects.
    pub reasons: BTreeMap<String, usize>,
    pub errors: Vec<String>,
}

impl LevelResult {
    fn new() -> Self {
        Self {
            status: LevelStatus::Pass,
            migrated: 0,
            skipped: 0,
            reasons: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    fn skipped_level() -> Self {
        Self {
            status: LevelStatus::Skipped,
            ..Self::new()
        }
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        *self.reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    /// One skipped object carrying several reason codes: counted once,
    /// every reason recorded.
    fn skip_object(&mut self, reasons: &[&str]) {
        self.skipped += 1;
        for reason in reasons {
            *self.reasons.entry((*reason).to_string()).or_insert(0) += 1;
        }
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
        self.status = LevelStatus::Fail;
    }
}

/// A denial recorded for the limitations report.
#[derive(Debug, Clone, Serialize)]
pub struct Limitation {
    pub level: MigrationLevel,
    pub object_name: String,
    pub reason: String,
}

/// One emitted or analyzed object's DDL artifact.
#[derive(Debug, Clone, Serialize)]
pub struct DdlArtifact {
    /// File name under `ddl/`, `<OBJTYPE>_<name>.sql`.
    pub file_name: String,
    pub content: String,
}

/// The full evidence of one run, accumulated throughout and flushed once
/// at the end. Contains no secrets by construction.
#[derive(Debug, Clone, Serialize)]
pub struct RunBundle {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source: RedactedEndpoint,
    pub target: RedactedEndpoint,
    pub source_session: SessionInfo,
    pub target_session: SessionInfo,
    /// SHA-256 over the ordered extracted rows; proves cross-run
    /// determinism of the seed data.
    pub seed_hash: String,
    pub levels: BTreeMap<String, LevelResult>,
    #[serde(skip)]
    pub ddl_artifacts: Vec<DdlArtifact>,
    pub limitations: Vec<Limitation>,
    pub errors: Vec<String>,
    pub overall_status: RunStatus,
    #[serde(skip)]
    pub log_lines: Vec<String>,
}

impl RunBundle {
    fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.log_lines.push(line);
    }
}

pub struct RunHarness {
    options: RunOptions,
}

impl RunHarness {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Execute a full migration pass. Object processing failures are
    /// recorded and the run continues; only configuration and connection
    /// problems abort.
    pub fn execute(
        &self,
        source: &mut dyn DialectAdapter,
        source_endpoint: RedactedEndpoint,
        target: &mut dyn DialectAdapter,
        target_endpoint: RedactedEndpoint,
    ) -> Result<RunBundle, HarnessError> {
        refuse_overprivileged(&source_endpoint)?;
        refuse_overprivileged(&target_endpoint)?;

        let run_id = self
            .options
            .run_id
            .clone()
            .unwrap_or_else(generate_run_id);
        let started_at = Utc::now();

        let source_session = source.session_info()?;
        let target_session = target.session_info()?;

        let mut bundle = RunBundle {
            run_id: run_id.clone(),
            started_at,
            finished_at: started_at,
            source: source_endpoint,
            target: target_endpoint,
            source_session,
            target_session,
            seed_hash: String::new(),
            levels: BTreeMap::new(),
            ddl_artifacts: Vec::new(),
            limitations: Vec::new(),
            errors: Vec::new(),
            overall_status: RunStatus::Pass,
            log_lines: Vec::new(),
        };
        bundle.log(format!("run {run_id} started"));

        let mut seed_hasher = Sha256::new();

        for level in &self.options.levels {
            let result = match level {
                MigrationLevel::L0 => self.run_l0(source, target, &mut bundle, &mut seed_hasher),
                MigrationLevel::L1 => self.run_l1(source, target, &mut bundle),
                MigrationLevel::L2 => self.run_l2(source, target, &mut bundle),
                MigrationLevel::L3 => self.run_l3(source, target, &mut bundle),
                MigrationLevel::L4 => self.run_l4(source, target, &mut bundle),
            };
            let result = match result {
                Ok(result) => result,
                Err(e) => {
                    let mut failed = LevelResult::new();
                    failed.error(e.to_string());
                    bundle.errors.push(format!("{level}: {e}"));
                    failed
                }
            };
            bundle.log(format!(
                "{level}: status={:?} migrated={} skipped={}",
                result.status, result.migrated, result.skipped
            ));
            bundle.levels.insert(level.as_str().to_string(), result);
        }

        bundle.seed_hash = hex::encode(seed_hasher.finalize());
        bundle.finished_at = Utc::now();
        bundle.overall_status = overall_status(&bundle);
        let source_stats = source.statistics();
        let target_stats = target.statistics();
        bundle.log(format!(
            "source adapter: {} queries, {} failures, {} retries",
            source_stats.queries_executed, source_stats.failures, source_stats.retries
        ));
        bundle.log(format!(
            "target adapter: {} queries, {} failures, {} retries",
            target_stats.queries_executed, target_stats.failures, target_stats.retries
        ));
        bundle.log(format!(
            "run {run_id} finished: {:?}",
            bundle.overall_status
        ));
        Ok(bundle)
    }

    fn target_name(&self, name: &str) -> String {
        match &self.options.object_prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }

    fn run_l0(
        &self,
        source: &mut dyn DialectAdapter,
        target: &mut dyn DialectAdapter,
        bundle: &mut RunBundle,
        seed_hasher: &mut Sha256,
    ) -> Result<LevelResult, HarnessError> {
        let mut result = LevelResult::new();
        let with_constraints = self.options.levels.contains(&MigrationLevel::L1);

        let tables = source.list_tables()?;
        bundle.log(format!("l0: {} tables discovered", tables.len()));

        for table in &tables {
            let schema = match source.get_schema(table) {
                Ok(schema) => schema,
                Err(e @ AdapterError::StrictType { .. }) => {
                    // Strict mode: the unsupported type is fatal to the run.
                    result.error(e.to_string());
                    bundle.errors.push(e.to_string());
                    return Ok(result);
                }
                Err(e) => {
                    result.error(format!("{table}: {e}"));
                    continue;
                }
            };

            for column in schema.unsupported_columns() {
                result.skip("unsupported type");
                bundle.limitations.push(Limitation {
                    level: MigrationLevel::L0,
                    object_name: format!("{table}.{}", column.name),
                    reason: format!("unsupported type: {}", column.native_type),
                });
            }

            let target_table = self.target_name(table);
            let create = emit::build_create_table(
                target.dialect(),
                &target_table,
                &schema,
                with_constraints,
            );
            bundle.ddl_artifacts.push(DdlArtifact {
                file_name: format!("TABLE_{table}.sql"),
                content: format!("{create};\n"),
            });

            let created = target.execute_raw(&create);
            if !created.success {
                result.error(format!(
                    "{table}: create failed: {}",
                    created.error.unwrap_or_default()
                ));
                continue;
            }

            let extract = source.extract_data(table, None, self.options.chunk_size)?;
            bundle.log(format!(
                "l0: {table} extracted {} rows ordered by {}",
                extract.stats.row_count, extract.stats.order_key_used
            ));

            seed_hasher.update(table.as_bytes());
            for row in &extract.rows {
                for (name, value) in row {
                    seed_hasher.update(name.as_bytes());
                    seed_hasher.update(b"=");
                    seed_hasher.update(value.render().as_bytes());
                    seed_hasher.update(b";");
                }
                seed_hasher.update(b"\n");
            }

            let columns: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
            let insert = emit::build_insert(target, &target_table, &columns);
            let mut load_failed = false;
            for row in &extract.rows {
                let params: Vec<SqlValue> = columns
                    .iter()
                    .map(|col| row.get(col).cloned().unwrap_or(SqlValue::Null))
                    .collect();
                let outcome = target.execute_with_params(&insert, &params);
                if !outcome.success {
                    result.error(format!(
                        "{table}: row load failed: {}",
                        outcome.error.unwrap_or_default()
                    ));
                    load_failed = true;
                    break;
                }
            }
            if !load_failed {
                result.migrated += 1;
            }
        }

        Ok(result)
    }

    fn run_l1(
        &self,
        source: &mut dyn DialectAdapter,
        target: &mut dyn DialectAdapter,
        bundle: &mut RunBundle,
    ) -> Result<LevelResult, HarnessError> {
        if !source.supports(MigrationLevel::L1) || !target.supports(MigrationLevel::L1) {
            return Ok(LevelResult::skipped_level());
        }
        let mut result = LevelResult::new();

        for table in source.list_tables()? {
            let target_table = self.target_name(&table);

            for index in source.get_indexes(&table)? {
                if index.primary {
                    // Owned by the table declaration.
                    continue;
                }
                let sql = emit::build_create_index(&target_table, &index);
                bundle.ddl_artifacts.push(DdlArtifact {
                    file_name: format!("INDEX_{}.sql", index.name),
                    content: format!("{sql};\n"),
                });
                let outcome = target.execute_raw(&sql);
                if outcome.success {
                    result.migrated += 1;
                } else {
                    result.error(format!(
                        "{}: index failed: {}",
                        index.name,
                        outcome.error.unwrap_or_default()
                    ));
                }
            }

            for fk in source.get_foreign_keys(&table)? {
                if target.dialect() == Dialect::Sqlite {
                    // Declared inline at table creation; SQLite cannot add
                    // constraints afterwards.
                    result.migrated += 1;
                    continue;
                }
                let ref_table = self.target_name(&fk.ref_table);
                let renamed = saiql_core::ForeignKey {
                    ref_table,
                    ..fk.clone()
                };
                let sql = emit::build_add_foreign_key(&target_table, &renamed);
                bundle.ddl_artifacts.push(DdlArtifact {
                    file_name: format!("FK_{}.sql", fk.constraint_name),
                    content: format!("{sql};\n"),
                });
                let outcome = target.execute_raw(&sql);
                if outcome.success {
                    result.migrated += 1;
                } else {
                    result.error(format!(
                        "{}: foreign key failed: {}",
                        fk.constraint_name,
                        outcome.error.unwrap_or_default()
                    ));
                }
            }
        }

        Ok(result)
    }

    fn run_l2(
        &self,
        source: &mut dyn DialectAdapter,
        target: &mut dyn DialectAdapter,
        bundle: &mut RunBundle,
    ) -> Result<LevelResult, HarnessError> {
        if !source.supports(MigrationLevel::L2) || !target.supports(MigrationLevel::L2) {
            return Ok(LevelResult::skipped_level());
        }
        let mut result = LevelResult::new();
        let analyzer = ViewAnalyzer::new(source.dialect());
        let mut translator = Translator::new(
            TranslateMode::SubsetTranslate,
            source.dialect(),
            target.dialect(),
        );

        let views = source.topologically_order_views(None)?;
        bundle.log(format!("l2: {} views in dependency order", views.len()));

        for view in &views {
            let translation = translator.translate_object(
                ObjectType::View,
                &view.name,
                &view.definition,
                BTreeMap::new(),
            );
            let sql = translation.sql_output.clone().unwrap_or_default();
            bundle.ddl_artifacts.push(DdlArtifact {
                file_name: format!("VIEW_{}.sql", view.name),
                content: sql.clone(),
            });

            if translation.is_stubbed() {
                let analysis = analyzer.analyze(&view.definition);
                if analysis.reason_codes.is_empty() {
                    result.skip("manual rewrite required");
                } else {
                    let codes: Vec<&str> =
                        analysis.reason_codes.iter().map(|c| c.as_str()).collect();
                    result.skip_object(&codes);
                }
                bundle.limitations.push(Limitation {
                    level: MigrationLevel::L2,
                    object_name: view.name.clone(),
                    reason: analysis
                        .reason
                        .unwrap_or_else(|| "manual rewrite required".to_string()),
                });
                continue;
            }

            let outcome = target.execute_raw(&sql);
            if outcome.success {
                result.migrated += 1;
            } else {
                result.error(format!(
                    "{}: view creation failed: {}",
                    view.name,
                    outcome.error.unwrap_or_default()
                ));
            }
        }

        Ok(result)
    }

    fn run_l3(
        &self,
        source: &mut dyn DialectAdapter,
        target: &mut dyn DialectAdapter,
        bundle: &mut RunBundle,
    ) -> Result<LevelResult, HarnessError> {
        if !source.supports(MigrationLevel::L3) || !target.supports(MigrationLevel::L3) {
            return Ok(LevelResult::skipped_level());
        }
        let mut result = LevelResult::new();
        let mut translator = Translator::new(
            TranslateMode::SubsetTranslate,
            source.dialect(),
            target.dialect(),
        );

        let safe = source.list_safe_routines(None)?;
        let skipped = source.list_skipped_routines(None)?;
        bundle.log(format!(
            "l3: {} safe routines, {} skipped",
            safe.len(),
            skipped.len()
        ));

        for routine in &safe {
            if source.dialect() == target.dialect() {
                bundle.ddl_artifacts.push(DdlArtifact {
                    file_name: format!("ROUTINE_{}.sql", routine.name),
                    content: format!("{}\n", routine.definition),
                });
                let outcome = target.create_routine(&routine.definition);
                if outcome.success {
                    result.migrated += 1;
                } else {
                    result.error(format!(
                        "{}: routine creation failed: {}",
                        routine.name,
                        outcome.error.unwrap_or_default()
                    ));
                }
            } else {
                // No routine subset translation exists; cross-dialect
                // emission stubs and defers to the operator.
                let object_type = match routine.kind {
                    saiql_core::RoutineKind::Procedure => ObjectType::Procedure,
                    saiql_core::RoutineKind::Package => ObjectType::Package,
                    saiql_core::RoutineKind::Function => ObjectType::Function,
                };
                let translation = translator.translate_object(
                    object_type,
                    &routine.name,
                    &routine.definition,
                    BTreeMap::new(),
                );
                bundle.ddl_artifacts.push(DdlArtifact {
                    file_name: format!("ROUTINE_{}.sql", routine.name),
                    content: translation.sql_output.clone().unwrap_or_default(),
                });
                result.skip("manual rewrite required");
                bundle.limitations.push(Limitation {
                    level: MigrationLevel::L3,
                    object_name: routine.name.clone(),
                    reason: "cross-dialect routine translation is not performed".to_string(),
                });
            }
        }

        for routine in &skipped {
            let codes: Vec<&str> = routine
                .classification
                .reason_codes
                .iter()
                .map(|c| c.as_str())
                .collect();
            result.skip_object(&codes);
            bundle.ddl_artifacts.push(DdlArtifact {
                file_name: format!("ROUTINE_{}.sql", routine.name),
                content: skipped_artifact(&routine.name, &codes),
            });
            bundle.limitations.push(Limitation {
                level: MigrationLevel::L3,
                object_name: routine.name.clone(),
                reason: codes.join(", "),
            });
        }

        Ok(result)
    }

    fn run_l4(
        &self,
        source: &mut dyn DialectAdapter,
        target: &mut dyn DialectAdapter,
        bundle: &mut RunBundle,
    ) -> Result<LevelResult, HarnessError> {
        if !source.supports(MigrationLevel::L4) || !target.supports(MigrationLevel::L4) {
            return Ok(LevelResult::skipped_level());
        }
        let mut result = LevelResult::new();
        let mut translator = Translator::new(
            TranslateMode::SubsetTranslate,
            source.dialect(),
            target.dialect(),
        );

        let safe = source.list_safe_triggers(None)?;
        let skipped = source.list_skipped_triggers(None)?;
        bundle.log(format!(
            "l4: {} safe triggers, {} skipped",
            safe.len(),
            skipped.len()
        ));

        for trigger in &safe {
            if source.dialect() == target.dialect() {
                bundle.ddl_artifacts.push(DdlArtifact {
                    file_name: format!("TRIGGER_{}.sql", trigger.name),
                    content: format!("{}\n", trigger.definition),
                });
                let outcome = target.create_trigger(&trigger.definition);
                if outcome.success {
                    result.migrated += 1;
                } else {
                    result.error(format!(
                        "{}: trigger creation failed: {}",
                        trigger.name,
                        outcome.error.unwrap_or_default()
                    ));
                }
                continue;
            }

            let translation = translator.translate_object(
                ObjectType::Trigger,
                &trigger.name,
                &trigger.definition,
                BTreeMap::new(),
            );
            let sql = translation.sql_output.clone().unwrap_or_default();
            bundle.ddl_artifacts.push(DdlArtifact {
                file_name: format!("TRIGGER_{}.sql", trigger.name),
                content: sql.clone(),
            });
            if translation.is_stubbed() {
                result.skip("manual rewrite required");
                bundle.limitations.push(Limitation {
                    level: MigrationLevel::L4,
                    object_name: trigger.name.clone(),
                    reason: "trigger translation unavailable for this target".to_string(),
                });
                continue;
            }
            let outcome = target.execute_raw(&sql);
            if outcome.success {
                result.migrated += 1;
            } else {
                result.error(format!(
                    "{}: trigger creation failed: {}",
                    trigger.name,
                    outcome.error.unwrap_or_default()
                ));
            }
        }

        for trigger in &skipped {
            let codes: Vec<&str> = trigger
                .classification
                .reason_codes
                .iter()
                .map(|c| c.as_str())
                .collect();
            result.skip_object(&codes);
            bundle.ddl_artifacts.push(DdlArtifact {
                file_name: format!("TRIGGER_{}.sql", trigger.name),
                content: skipped_artifact(&trigger.name, &codes),
            });
            bundle.limitations.push(Limitation {
                level: MigrationLevel::L4,
                object_name: trigger.name.clone(),
                reason: codes.join(", "),
            });
        }

        Ok(result)
    }
}

/// Artifact body for an object the classifiers kept out of the run.
fn skipped_artifact(name: &str, reasons: &[&str]) -> String {
    format!(
        "-- SKIPPED: {name}\n-- Not in the automatically-migratable subset.\n-- Reasons: {}\n",
        reasons.join(", ")
    )
}

fn refuse_overprivileged(endpoint: &RedactedEndpoint) -> Result<(), HarnessError> {
    if endpoint.dialect == Dialect::Sqlite {
        return Ok(());
    }
    let user = endpoint.user.to_lowercase();
    if FORBIDDEN_USERS.contains(&user.as_str()) {
        warn!(user = user.as_str(), "refusing overprivileged identity");
        return Err(HarnessError::OverprivilegedIdentity { user });
    }
    Ok(())
}

fn overall_status(bundle: &RunBundle) -> RunStatus {
    let any_failed = !bundle.errors.is_empty()
        || bundle
            .levels
            .values()
            .any(|l| l.status == LevelStatus::Fail);
    if any_failed {
        return RunStatus::Fail;
    }
    let any_skipped_level = bundle
        .levels
        .values()
        .any(|l| l.status == LevelStatus::Skipped);
    if any_skipped_level {
        RunStatus::Incomplete
    } else {
        RunStatus::Pass
    }
}

/// Fresh, collision-resistant run id from the wall clock.
fn generate_run_id() -> String {
    let now = Utc::now();
    let mut hasher = Sha256::new();
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    hasher.update(std::process::id().to_be_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}_{}", now.format("%Y%m%d%H%M%S"), &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(dialect: Dialect, user: &str) -> RedactedEndpoint {
        RedactedEndpoint {
            dialect,
            host: "localhost".into(),
            port: 5432,
            database: "db".into(),
            user: user.into(),
        }
    }

    #[test]
    fn test_refuses_admin_identities() {
        for user in ["SYSTEM", "sys", "root", "SA"] {
            let err = refuse_overprivileged(&endpoint(Dialect::Oracle, user)).unwrap_err();
            assert!(err.to_string().contains("dedicated migration user"));
        }
    }

    #[test]
    fn test_dedicated_user_accepted() {
        assert!(refuse_overprivileged(&endpoint(Dialect::Postgres, "saiql_mig")).is_ok());
    }

    #[test]
    fn test_sqlite_has_no_identity_gate() {
        assert!(refuse_overprivileged(&endpoint(Dialect::Sqlite, "root")).is_ok());
    }

    #[test]
    fn test_run_id_shape() {
        let id = generate_run_id();
        let (stamp, digest) = id.split_once('_').unwrap();
        assert_eq!(stamp.len(), 14);
        assert_eq!(digest.len(), 8);
    }

    #[test]
    fn test_default_options_cover_all_levels() {
        let options = RunOptions::default();
        assert_eq!(options.levels, MigrationLevel::ALL.to_vec());
        assert!(options.chunk_size > 0);
    }
}
