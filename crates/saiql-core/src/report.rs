//! Deterministic translation reports.
//!
//! Folds a list of [`TranslationResult`] into a machine report (a nested,
//! key-sorted structure) and a columnar text report. Two runs over the same
//! results produce byte-identical output in both forms.

use crate::order;
use crate::types::{ManualStep, RiskLevel, TranslateMode, TranslationResult, Warning};
use crate::Dialect;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Object counts by category and type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportCounts {
    /// Total objects processed.
    pub detected: usize,
    /// Objects with non-stub SQL output.
    pub translated: usize,
    /// Objects whose SQL output contains the literal `STUB` token.
    pub stubbed: usize,
    /// Objects with no SQL output at all.
    pub analyzed_only: usize,
    /// Per-object-type counts, keys sorted.
    pub by_type: BTreeMap<String, usize>,
}

/// Counts per risk level. Zero levels are present here and omitted only
/// from the text report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RiskSummary {
    pub safe: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl RiskSummary {
    fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Safe => self.safe,
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }

    fn bump(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Safe => self.safe += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }
}

/// A warning entry in the machine report. Carries the canonical
/// `object_name` key plus the legacy `object` alias for consumers of the
/// old report schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportWarning {
    pub severity: RiskLevel,
    pub object_name: String,
    pub message: String,
    pub reason: String,
    /// Legacy alias of `object_name`.
    pub object: String,
}

impl From<&Warning> for ReportWarning {
    fn from(w: &Warning) -> Self {
        Self {
            severity: w.severity,
            object_name: w.object_name.clone(),
            message: w.message.clone(),
            reason: w.reason.clone(),
            object: w.object_name.clone(),
        }
    }
}

/// A manual-step entry in the machine report, with the legacy alias key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportStep {
    pub object_name: String,
    pub action: String,
    pub reason: String,
    /// Legacy alias of `object_name`.
    pub object: String,
}

impl From<&ManualStep> for ReportStep {
    fn from(s: &ManualStep) -> Self {
        Self {
            object_name: s.object_name.clone(),
            action: s.action.clone(),
            reason: s.reason.clone(),
            object: s.object_name.clone(),
        }
    }
}

/// The full translation report.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct TranslationReport {
    pub mode: TranslateMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dialect: Option<Dialect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dialect: Option<Dialect>,
    pub counts: ReportCounts,
    pub risk_summary: RiskSummary,
    pub warnings: Vec<ReportWarning>,
    pub manual_steps: Vec<ReportStep>,
    /// Legacy alias of `counts.detected`.
    pub total_objects: usize,
    /// Legacy alias of `counts.by_type`.
    pub objects_by_type: BTreeMap<String, usize>,
}

impl TranslationReport {
    /// Fold results into a report. The results list is consumed read-only.
    pub fn generate(
        results: &[TranslationResult],
        mode: TranslateMode,
        source_dialect: Option<Dialect>,
        target_dialect: Option<Dialect>,
    ) -> Self {
        let mut counts = ReportCounts {
            detected: results.len(),
            ..Default::default()
        };
        let mut risk_summary = RiskSummary::default();
        let mut warnings: Vec<Warning> = Vec::new();
        let mut steps: Vec<ManualStep> = Vec::new();

        for result in results {
            *counts
                .by_type
                .entry(result.object_type.as_str().to_string())
                .or_insert(0) += 1;

            match result.sql_output.as_deref() {
                None => counts.analyzed_only += 1,
                Some(sql) if sql.contains("STUB") => counts.stubbed += 1,
                Some(_) => counts.translated += 1,
            }

            risk_summary.bump(result.risk_level);
            warnings.extend(result.warnings.iter().cloned());
            steps.extend(result.manual_steps.iter().cloned());
        }

        order::sort_warnings(&mut warnings);
        let steps = order::dedup_and_sort_steps(steps);

        let total_objects = counts.detected;
        let objects_by_type = counts.by_type.clone();

        Self {
            mode,
            source_dialect,
            target_dialect,
            counts,
            risk_summary,
            warnings: warnings.iter().map(ReportWarning::from).collect(),
            manual_steps: steps.iter().map(ReportStep::from).collect(),
            total_objects,
            objects_by_type,
        }
    }

    /// Machine report as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("report serialization cannot fail")
    }

    /// Stable, columnar, header-separated text report.
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let heavy = "=".repeat(80);
        let light = "-".repeat(40);

        lines.push(heavy.clone());
        lines.push("SAIQL Translation Report".to_string());
        lines.push(heavy.clone());
        lines.push(format!("Mode: {}", self.mode));
        lines.push(String::new());

        lines.push("Object Counts".to_string());
        lines.push(light.clone());
        lines.push(format!("  Detected:      {}", self.counts.detected));
        match self.mode {
            TranslateMode::SubsetTranslate => {
                lines.push(format!("  Translated:    {}", self.counts.translated));
                lines.push(format!("  Stubbed:       {}", self.counts.stubbed));
            }
            TranslateMode::Stub => {
                lines.push(format!("  Stubbed:       {}", self.counts.stubbed));
            }
            TranslateMode::Analyze => {
                lines.push(format!("  Analyzed Only: {}", self.counts.analyzed_only));
            }
        }
        lines.push(String::new());

        if !self.counts.by_type.is_empty() {
            lines.push("  By Type:".to_string());
            for (object_type, count) in &self.counts.by_type {
                lines.push(format!("    {object_type:<15} {count}"));
            }
            lines.push(String::new());
        }

        lines.push("Risk Summary".to_string());
        lines.push(light.clone());
        for level in RiskLevel::ALL {
            let count = self.risk_summary.count(level);
            if count > 0 {
                lines.push(format!("  {:<10} {}", level.as_str().to_uppercase(), count));
            }
        }
        lines.push(String::new());

        if !self.warnings.is_empty() {
            lines.push("Warnings".to_string());
            lines.push(light.clone());
            for (i, warning) in self.warnings.iter().enumerate() {
                lines.push(format!(
                    "  {}. [{}] {}",
                    i + 1,
                    warning.severity.as_str().to_uppercase(),
                    warning.object_name
                ));
                lines.push(format!("     {}", warning.message));
                if !warning.reason.is_empty() {
                    lines.push(format!("     Reason: {}", warning.reason));
                }
                lines.push(String::new());
            }
        }

        if !self.manual_steps.is_empty() {
            lines.push("Manual Steps Checklist".to_string());
            lines.push(light);
            for (i, step) in self.manual_steps.iter().enumerate() {
                lines.push(format!("  {}. {}: {}", i + 1, step.object_name, step.action));
                if !step.reason.is_empty() {
                    lines.push(format!("     Reason: {}", step.reason));
                }
                lines.push(String::new());
            }
        }

        lines.push(heavy.clone());
        lines.push("End of Report".to_string());
        lines.push(heavy);

        lines.join("\n")
    }
}
