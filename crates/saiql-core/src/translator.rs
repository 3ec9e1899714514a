//! The translation engine for higher-order objects (L2-L4).
//!
//! Three explicit capability modes gate everything:
//!
//! - [`TranslateMode::Analyze`]: parse + report, no SQL output, ever.
//! - [`TranslateMode::Stub`]: deliberately non-functional DDL that fails
//!   loudly where the target permits, and says so where it cannot.
//! - [`TranslateMode::SubsetTranslate`]: mechanical translation of
//!   proven-safe patterns; stub behaviour for everything else, with the
//!   requested mode preserved on the result so the audit trail is honest.
//!
//! For a fixed input and mode the output is byte-identical across runs.

use crate::analyzer::{PackageAnalyzer, TriggerAnalyzer, ViewAnalyzer, ViewPattern};
use crate::order;
use crate::report::TranslationReport;
use crate::types::{
    Dialect, ManualStep, ObjectType, RiskLevel, TranslateMode, TranslationResult, Warning,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Conservative higher-order object translator.
///
/// Owns its results vector exclusively; the report generator reads it.
#[derive(Debug)]
pub struct Translator {
    mode: TranslateMode,
    source: Dialect,
    target: Dialect,
    results: Vec<TranslationResult>,
}

impl Translator {
    pub fn new(mode: TranslateMode, source: Dialect, target: Dialect) -> Self {
        Self {
            mode,
            source,
            target,
            results: Vec::new(),
        }
    }

    pub fn mode(&self) -> TranslateMode {
        self.mode
    }

    pub fn results(&self) -> &[TranslationResult] {
        &self.results
    }

    /// Translate one object under the configured mode.
    ///
    /// The result is appended to the translator's result list and returned.
    pub fn translate_object(
        &mut self,
        object_type: ObjectType,
        object_name: &str,
        definition: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> TranslationResult {
        debug!(
            object_type = object_type.as_str(),
            object_name,
            mode = self.mode.as_str(),
            "translating object"
        );

        let mut result = match self.mode {
            TranslateMode::Analyze => self.analyze_only(object_type, object_name, definition),
            TranslateMode::Stub => self.generate_stub(object_type, object_name, TranslateMode::Stub),
            TranslateMode::SubsetTranslate => {
                self.subset_translate(object_type, object_name, definition)
            }
        };
        result.metadata.extend(metadata);

        order::sort_warnings(&mut result.warnings);
        result.manual_steps = order::dedup_and_sort_steps(std::mem::take(&mut result.manual_steps));

        self.results.push(result.clone());
        result
    }

    /// Fold the accumulated results into a report.
    pub fn report(&self) -> TranslationReport {
        TranslationReport::generate(&self.results, self.mode, Some(self.source), Some(self.target))
    }

    /// Analyze mode: classify and report. `sql_output` stays absent.
    fn analyze_only(
        &self,
        object_type: ObjectType,
        object_name: &str,
        definition: &str,
    ) -> TranslationResult {
        let mut result = TranslationResult::new(object_type, object_name, TranslateMode::Analyze);

        if object_type == ObjectType::Package {
            let analysis =
                PackageAnalyzer::new(self.target.as_str()).analyze(definition, object_name);

            result.metadata.insert(
                "package_analysis".to_string(),
                serde_json::json!({
                    "has_spec": analysis.has_spec,
                    "has_body": analysis.has_body,
                    "procedure_count": analysis.procedures.len(),
                    "function_count": analysis.functions.len(),
                    "dependencies": analysis.dependencies,
                    "complexity_score": analysis.complexity_score,
                }),
            );
            for warning in &analysis.warnings {
                result.warnings.push(Warning::new(
                    RiskLevel::High,
                    object_name,
                    warning.clone(),
                    "Package analysis detected complexity or Oracle-specific features",
                ));
            }
            for step in &analysis.manual_steps {
                result.manual_steps.push(ManualStep::new(
                    object_name,
                    step.clone(),
                    "Package requires manual migration",
                ));
            }
            info!(
                object_name,
                complexity = analysis.complexity_score,
                "analyzed package"
            );
        } else {
            result.manual_steps.push(ManualStep::new(
                object_name,
                format!("Manual review required for {object_type}"),
                "Object analyzed but not translated (mode=analyze)",
            ));
        }

        result
    }

    /// Stub mode: emit a stub that fails loudly where the target permits.
    ///
    /// `reported_mode` differs from `Stub` when a subset translation fell
    /// back here: the result keeps the caller's mode for audit honesty.
    fn generate_stub(
        &self,
        object_type: ObjectType,
        object_name: &str,
        reported_mode: TranslateMode,
    ) -> TranslationResult {
        let mut result = TranslationResult::new(object_type, object_name, reported_mode);
        result.sql_output = Some(self.stub_sql(object_type, object_name));
        result.risk_level = RiskLevel::Critical;

        result.warnings.push(Warning::new(
            RiskLevel::Critical,
            object_name,
            format!("Generated stub for {object_type} (not functional)"),
            "Object not in supported translation subset",
        ));
        result.manual_steps.push(ManualStep::new(
            object_name,
            format!("Manually rewrite {object_type}"),
            "Stub generated - not semantically equivalent to source",
        ));

        result
    }

    /// Subset-translate mode: translate proven-safe patterns, stub the rest.
    fn subset_translate(
        &self,
        object_type: ObjectType,
        object_name: &str,
        definition: &str,
    ) -> TranslationResult {
        let translated = match object_type {
            ObjectType::View => self.translate_view(object_name, definition),
            // Trigger translation is Oracle-to-Postgres only.
            ObjectType::Trigger if self.target == Dialect::Postgres => {
                self.translate_trigger(object_name, definition)
            }
            _ => None,
        };

        match translated {
            Some((sql, risk_level)) => {
                let mut result = TranslationResult::new(
                    object_type,
                    object_name,
                    TranslateMode::SubsetTranslate,
                );
                result.sql_output = Some(sql);
                result.risk_level = risk_level;

                // The unverified-syntax warning is a contract: every non-stub
                // translation carries it, emitted at exactly this one site.
                result.warnings.push(Warning::new(
                    RiskLevel::Low,
                    object_name,
                    "Translated SQL syntax unverified (no compile-check)",
                    "Manual verification required - automated compile-check not implemented",
                ));
                if matches!(risk_level, RiskLevel::Low | RiskLevel::Medium) {
                    result.warnings.push(Warning::new(
                        risk_level,
                        object_name,
                        format!("{object_type} translated with {risk_level} risk"),
                        "Manual review recommended",
                    ));
                }
                info!(object_name, risk = risk_level.as_str(), "translated object");
                result
            }
            None => self.generate_stub(object_type, object_name, TranslateMode::SubsetTranslate),
        }
    }

    /// Translate a view if it matches the supported subset.
    fn translate_view(&self, view_name: &str, definition: &str) -> Option<(String, RiskLevel)> {
        let analysis = ViewAnalyzer::new(self.source).analyze(definition);

        let risk = match analysis.pattern {
            ViewPattern::SimpleSelect => RiskLevel::Safe,
            ViewPattern::SelectWhere => RiskLevel::Low,
            ViewPattern::BasicJoin => RiskLevel::Medium,
            ViewPattern::Unsupported => return None,
        };

        // Oracle (+) outer-join syntax can slip past a permissive parse.
        if definition.contains("(+)") {
            return None;
        }

        let mut sql = strip_source_keywords(definition);

        // Boolean literals disagree between Oracle and Postgres.
        if self.source == Dialect::Oracle && self.target == Dialect::Postgres {
            sql = eq_one_re().replace_all(&sql, "= true").into_owned();
            sql = eq_zero_re().replace_all(&sql, "= false").into_owned();
        }

        if !sql.trim_start().to_uppercase().starts_with("CREATE") {
            sql = format!("CREATE VIEW {view_name} AS\n{}", sql.trim());
        }

        Some((sql.trim().to_string(), risk))
    }

    /// Translate a trigger if it matches the normalization subset.
    fn translate_trigger(
        &self,
        trigger_name: &str,
        definition: &str,
    ) -> Option<(String, RiskLevel)> {
        let analysis = TriggerAnalyzer::new(self.source).analyze(definition);
        if !analysis.is_supported() {
            return None;
        }

        let mut sql = strip_source_keywords(definition);

        if self.source == Dialect::Oracle && self.target == Dialect::Postgres {
            sql = colon_new_re().replace_all(&sql, "NEW.").into_owned();
            sql = colon_old_re().replace_all(&sql, "OLD.").into_owned();
            sql = sql.replace(":=", "=");

            if !sql.to_lowercase().contains("for each row") {
                sql = for_each_row_re()
                    .replace(&sql, "FOR EACH ROW $1")
                    .into_owned();
            }

            // Oracle inline bodies become a plpgsql function + trigger pair.
            if sql.to_lowercase().contains("begin")
                && !sql.to_lowercase().contains("execute function")
            {
                let event = if sql.to_lowercase().contains("before update") {
                    "UPDATE"
                } else {
                    "INSERT"
                };
                sql = convert_to_postgres_function_trigger(trigger_name, &sql, event);
            }
        }

        Some((sql.trim().to_string(), RiskLevel::Low))
    }

    /// Dialect-aware stub DDL. Contains the literal `STUB` token; fails
    /// loudly where the target makes that possible and warns where it does
    /// not.
    fn stub_sql(&self, object_type: ObjectType, name: &str) -> String {
        match object_type {
            ObjectType::View | ObjectType::MaterializedView => match self.target {
                Dialect::Postgres => format!(
                    r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence

-- Helper function that raises exception
CREATE OR REPLACE FUNCTION {name}_stub_error()
RETURNS TABLE (error_message TEXT) AS $$
BEGIN
    RAISE EXCEPTION 'Manual rewrite required: View "{name}" is a non-functional stub generated by SAIQL';
    RETURN;
END;
$$ LANGUAGE plpgsql;

-- View that calls the error function
CREATE VIEW {name} AS
SELECT * FROM {name}_stub_error();
"#
                ),
                Dialect::Oracle => format!(
                    r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
CREATE VIEW {name} AS
SELECT
    'Manual rewrite required: View "{name}" is a non-functional stub' AS error_message,
    1/0 AS force_error;
"#
                ),
                Dialect::Mssql => format!(
                    r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
-- LIMITATION: This stub may return NULL instead of raising an error
--             (depends on MSSQL session settings: ARITHIGNORE, ARITHABORT)
CREATE VIEW {name} AS
SELECT
    'Manual rewrite required: View "{name}" is a non-functional stub' AS error_message,
    1/0 AS force_error;
"#
                ),
                Dialect::Mysql => format!(
                    r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
-- LIMITATION: This stub may return NULL instead of raising an error
--             (depends on MySQL sql_mode configuration)
CREATE VIEW {name} AS
SELECT
    'Manual rewrite required: View "{name}" is a non-functional stub' AS error_message,
    1/0 AS force_error;
"#
                ),
                Dialect::Sqlite => format!(
                    r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
-- LIMITATION: SQLite returns NULL for division by zero (does not fail loudly)
--             This stub will NOT prevent silent breakage
CREATE VIEW {name} AS
SELECT
    'Manual rewrite required: View "{name}" is a non-functional stub' AS error_message,
    1/0 AS force_error;
"#
                ),
                Dialect::Hana => format!(
                    r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
-- LIMITATION: Stub failure behaviour not verified for this dialect
CREATE VIEW {name} AS
SELECT
    'Manual rewrite required: View "{name}" is a non-functional stub' AS error_message,
    1/0 AS force_error;
"#
                ),
            },
            ObjectType::Procedure | ObjectType::Function => {
                if self.target == Dialect::Postgres {
                    format!(
                        r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
CREATE OR REPLACE FUNCTION {name}()
RETURNS void AS $$
BEGIN
    RAISE EXCEPTION 'Manual rewrite required: {name} is a non-functional stub';
END;
$$ LANGUAGE plpgsql;
"#
                    )
                } else {
                    format!(
                        r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
-- LIMITATION: Stored procedure/function stubs only supported for Postgres target
-- For {}, manual rewrite required
"#,
                        self.target
                    )
                }
            }
            ObjectType::Trigger => {
                if self.target == Dialect::Postgres {
                    format!(
                        r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
CREATE OR REPLACE FUNCTION {name}_stub_func()
RETURNS trigger AS $$
BEGIN
    RAISE EXCEPTION 'Manual rewrite required: {name} is a non-functional stub';
    RETURN NULL;
END;
$$ LANGUAGE plpgsql;
"#
                    )
                } else {
                    format!(
                        r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
-- LIMITATION: Trigger stubs only supported for Postgres target
-- For {}, manual rewrite required
"#,
                        self.target
                    )
                }
            }
            ObjectType::Package => format!(
                r#"-- STUB: {name}
-- WARNING: This is a non-functional stub generated by SAIQL
-- Manual rewrite required for semantic equivalence
--
-- PACKAGE MIGRATION NOTES:
-- Oracle packages are dialect-specific and cannot be automatically translated.
-- This package must be manually refactored into target dialect constructs.
--
-- Recommended approach:
-- 1. Extract procedures/functions into separate schema objects
-- 2. Rewrite logic in target dialect syntax
-- 3. Consider target dialect's module/schema organization
--
-- LIMITATION: No automatic package translation available
-- Target dialect: {}
"#,
                self.target
            ),
        }
    }
}

fn strip_source_keywords(sql: &str) -> String {
    static FORCE_RE: OnceLock<Regex> = OnceLock::new();
    static EDITIONABLE_RE: OnceLock<Regex> = OnceLock::new();
    let force = FORCE_RE.get_or_init(|| Regex::new(r"(?i)\bFORCE\b\s*").expect("invalid regex"));
    let editionable = EDITIONABLE_RE
        .get_or_init(|| Regex::new(r"(?i)\bEDITIONABLE\b\s*").expect("invalid regex"));
    let sql = force.replace_all(sql.trim(), "");
    editionable.replace_all(&sql, "").into_owned()
}

fn eq_one_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"=\s*1\b").expect("invalid regex"))
}

fn eq_zero_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"=\s*0\b").expect("invalid regex"))
}

fn colon_new_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i):NEW\.").expect("invalid regex"))
}

fn colon_old_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i):OLD\.").expect("invalid regex"))
}

fn for_each_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(EXECUTE\s+(?:PROCEDURE|FUNCTION))").expect("invalid regex"))
}

/// Convert an Oracle inline trigger into a Postgres trigger function plus
/// `CREATE TRIGGER ... EXECUTE FUNCTION` pair.
fn convert_to_postgres_function_trigger(trigger_name: &str, sql: &str, event: &str) -> String {
    static ON_TABLE_RE: OnceLock<Regex> = OnceLock::new();

    let mut body = crate::analyzer::trigger::extract_trigger_body(sql);
    body = colon_new_re().replace_all(&body, "NEW.").into_owned();
    body = colon_old_re().replace_all(&body, "OLD.").into_owned();
    body = body.replace(":=", "=");
    let body = body.trim().trim_end_matches(';').trim();

    let table_re = ON_TABLE_RE
        .get_or_init(|| Regex::new(r"(?i)\bon\s+(\w+)").expect("invalid regex"));
    let table_name = table_re
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("unknown_table");

    let func_name = format!("{trigger_name}_func");

    format!(
        r#"-- Trigger function for {trigger_name}
CREATE OR REPLACE FUNCTION {func_name}()
RETURNS trigger AS $$
BEGIN
    {body};
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

-- Trigger
CREATE TRIGGER {trigger_name}
BEFORE {event} ON {table_name}
FOR EACH ROW
EXECUTE FUNCTION {func_name}();
"#
    )
}
