//! Machine-readable reports derived from a finished [`RunBundle`].
//!
//! The parity summary is the primary machine-verifiable proof of a run:
//! migrated-vs-skipped per level with reason-code histograms.

use crate::run::{Limitation, LevelStatus, RunBundle, RunStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-level pass/fail plus counters.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub levels: BTreeMap<String, LevelValidation>,
    pub overall_status: RunStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelValidation {
    pub status: LevelStatus,
    pub migrated: usize,
    pub skipped: usize,
    pub error_count: usize,
}

impl ValidationReport {
    pub fn from_bundle(bundle: &RunBundle) -> Self {
        Self {
            run_id: bundle.run_id.clone(),
            levels: bundle
                .levels
                .iter()
                .map(|(level, result)| {
                    (
                        level.clone(),
                        LevelValidation {
                            status: result.status,
                            migrated: result.migrated,
                            skipped: result.skipped,
                            error_count: result.errors.len(),
                        },
                    )
                })
                .collect(),
            overall_status: bundle.overall_status,
        }
    }
}

/// Denial reason-code histograms plus every recorded limitation.
#[derive(Debug, Clone, Serialize)]
pub struct LimitationsReport {
    pub run_id: String,
    pub reason_histogram: BTreeMap<String, usize>,
    pub entries: Vec<Limitation>,
}

impl LimitationsReport {
    pub fn from_bundle(bundle: &RunBundle) -> Self {
        let mut reason_histogram: BTreeMap<String, usize> = BTreeMap::new();
        for result in bundle.levels.values() {
            for (reason, count) in &result.reasons {
                *reason_histogram.entry(reason.clone()).or_insert(0) += count;
            }
        }
        Self {
            run_id: bundle.run_id.clone(),
            reason_histogram,
            entries: bundle.limitations.clone(),
        }
    }
}

/// Migrated-vs-skipped per level, with the overall parity verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ParitySummary {
    pub run_id: String,
    pub levels: BTreeMap<String, LevelParity>,
    pub summary: ParityVerdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelParity {
    pub migrated: usize,
    pub skipped: usize,
    pub reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParityVerdict {
    /// `COMPLETE` when no level recorded an error; skips are accounted
    /// for, not failures.
    pub parity_status: String,
    pub total_migrated: usize,
    pub total_skipped: usize,
}

impl ParitySummary {
    pub fn from_bundle(bundle: &RunBundle) -> Self {
        let levels: BTreeMap<String, LevelParity> = bundle
            .levels
            .iter()
            .map(|(level, result)| {
                (
                    level.clone(),
                    LevelParity {
                        migrated: result.migrated,
                        skipped: result.skipped,
                        reasons: result.reasons.clone(),
                    },
                )
            })
            .collect();

        let total_migrated = levels.values().map(|l| l.migrated).sum();
        let total_skipped = levels.values().map(|l| l.skipped).sum();
        let clean = bundle.errors.is_empty()
            && bundle
                .levels
                .values()
                .all(|l| l.status != LevelStatus::Fail);

        Self {
            run_id: bundle.run_id.clone(),
            levels,
            summary: ParityVerdict {
                parity_status: if clean { "COMPLETE" } else { "PARTIAL" }.to_string(),
                total_migrated,
                total_skipped,
            },
        }
    }
}
