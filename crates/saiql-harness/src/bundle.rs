//! Evidence-bundle writer.
//!
//! The bundle is staged into a hidden sibling directory and renamed into
//! place once complete, so a crashed run never leaves a half-written
//! `run_<id>/` directory behind. Every byte passes through the secret
//! scrubber on the way out.

use crate::error::HarnessError;
use crate::redact::scrub;
use crate::reports::{LimitationsReport, ParitySummary, ValidationReport};
use crate::run::RunBundle;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the bundle under `parent_dir/run_<run_id>/`.
///
/// `secrets` are the sensitive strings of the run (passwords, tokens);
/// none of them survives into any artifact.
pub fn write_bundle(
    bundle: &RunBundle,
    parent_dir: &Path,
    secrets: &[String],
) -> Result<PathBuf, HarnessError> {
    let final_dir = parent_dir.join(format!("run_{}", bundle.run_id));
    if final_dir.exists() {
        return Err(HarnessError::BundleExists(
            final_dir.display().to_string(),
        ));
    }

    let staging = parent_dir.join(format!(".staging_{}", bundle.run_id));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(staging.join("ddl"))?;
    fs::create_dir_all(staging.join("reports"))?;
    fs::create_dir_all(staging.join("logs"))?;

    write_json(&staging.join("run_manifest.json"), bundle, secrets)?;

    for artifact in &bundle.ddl_artifacts {
        let path = staging.join("ddl").join(&artifact.file_name);
        fs::write(path, scrub(&artifact.content, secrets))?;
    }

    write_json(
        &staging.join("reports").join("validation_report.json"),
        &ValidationReport::from_bundle(bundle),
        secrets,
    )?;
    write_json(
        &staging.join("reports").join("limitations_report.json"),
        &LimitationsReport::from_bundle(bundle),
        secrets,
    )?;
    write_json(
        &staging.join("reports").join("parity_summary.json"),
        &ParitySummary::from_bundle(bundle),
        secrets,
    )?;

    let log = bundle.log_lines.join("\n");
    fs::write(
        staging.join("logs").join("harness_run.log"),
        scrub(&log, secrets) + "\n",
    )?;

    fs::rename(&staging, &final_dir)?;
    info!(bundle = %final_dir.display(), "bundle written");
    Ok(final_dir)
}

fn write_json<T: serde::Serialize>(
    path: &Path,
    value: &T,
    secrets: &[String],
) -> Result<(), HarnessError> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, scrub(&text, secrets) + "\n")?;
    Ok(())
}
