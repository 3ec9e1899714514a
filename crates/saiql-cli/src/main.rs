mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Command, OutputFormat};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use saiql_adapters::{DialectAdapter, RedactedEndpoint, SqliteAdapter};
use saiql_core::{Dialect, Translator};
use saiql_harness::{write_bundle, RunHarness, RunOptions, RunStatus};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Analyze {
            files,
            source_dialect,
            target_dialect,
            mode,
            object_type,
            format,
        } => analyze(
            &files,
            source_dialect.into(),
            target_dialect.into(),
            mode.into(),
            object_type.into(),
            format,
        ),
        Command::Migrate {
            source,
            source_url,
            target,
            output,
            run_id,
        } => migrate(
            source.as_deref(),
            source_url.as_deref(),
            &target,
            &output,
            run_id,
        ),
    }
}

fn analyze(
    files: &[PathBuf],
    source: Dialect,
    target: Dialect,
    mode: saiql_core::TranslateMode,
    object_type: saiql_core::ObjectType,
    format: OutputFormat,
) -> Result<()> {
    let mut translator = Translator::new(mode, source, target);

    for file in files {
        let definition = fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let object_name = file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "object".to_string());
        translator.translate_object(object_type, &object_name, &definition, BTreeMap::new());
    }

    let report = translator.report();
    match format {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
    }
    Ok(())
}

fn migrate(
    source: Option<&Path>,
    source_url: Option<&str>,
    target_path: &Path,
    output: &Path,
    run_id: Option<String>,
) -> Result<()> {
    if target_path.exists() {
        bail!(
            "target database {} already exists; each run needs a fresh target file",
            target_path.display()
        );
    }

    let (mut source_adapter, source_endpoint, secrets) = open_source(source, source_url)?;
    let mut target = SqliteAdapter::open(target_path)
        .with_context(|| format!("failed to create target {}", target_path.display()))?;

    let harness = RunHarness::new(RunOptions {
        run_id,
        ..RunOptions::default()
    });
    let bundle = harness.execute(
        source_adapter.as_mut(),
        source_endpoint,
        &mut target,
        sqlite_endpoint(target_path),
    )?;

    fs::create_dir_all(output)?;
    let bundle_dir = write_bundle(&bundle, output, &secrets)?;

    let status = match bundle.overall_status {
        RunStatus::Pass => "PASS",
        RunStatus::Fail => "FAIL",
        RunStatus::Incomplete => "INCOMPLETE",
    };
    if std::io::stdout().is_terminal() {
        let colored = match bundle.overall_status {
            RunStatus::Pass => status.green().to_string(),
            RunStatus::Fail => status.red().to_string(),
            RunStatus::Incomplete => status.yellow().to_string(),
        };
        println!("run {}: {} -> {}", bundle.run_id, colored, bundle_dir.display());
    } else {
        println!("run {}: {} -> {}", bundle.run_id, status, bundle_dir.display());
    }

    if bundle.overall_status == RunStatus::Fail {
        std::process::exit(1);
    }
    Ok(())
}

/// Open the migration source: a SQLite file, or a live Postgres/MySQL
/// endpoint when `--source-url` is given. Returns the adapter, its
/// redacted endpoint, and any secrets the bundle writer must scrub.
fn open_source(
    path: Option<&Path>,
    url: Option<&str>,
) -> Result<(Box<dyn DialectAdapter>, RedactedEndpoint, Vec<String>)> {
    if let Some(url) = url {
        return open_live_source(url);
    }
    let path = path.context("either --source or --source-url is required")?;
    if !path.is_file() {
        bail!("source database {} does not exist", path.display());
    }
    let adapter = SqliteAdapter::open(path)
        .with_context(|| format!("failed to open source {}", path.display()))?;
    Ok((Box::new(adapter), sqlite_endpoint(path), Vec::new()))
}

#[cfg(feature = "live-pool")]
fn open_live_source(
    url: &str,
) -> Result<(Box<dyn DialectAdapter>, RedactedEndpoint, Vec<String>)> {
    use saiql_adapters::{ConnectionConfig, MysqlAdapter, PostgresAdapter, SqlxExecutor};

    let config = ConnectionConfig::from_url(url)?;
    let endpoint = config.redacted();
    let secrets: Vec<String> = config.password.iter().cloned().collect();
    let exec = SqlxExecutor::connect(url, &config)?;
    let adapter: Box<dyn DialectAdapter> = match config.dialect {
        Dialect::Postgres => Box::new(PostgresAdapter::new(Box::new(exec), config)?),
        Dialect::Mysql => Box::new(MysqlAdapter::new(Box::new(exec), config)?),
        other => bail!("live introspection is not available for {other}"),
    };
    Ok((adapter, endpoint, secrets))
}

#[cfg(not(feature = "live-pool"))]
fn open_live_source(
    _url: &str,
) -> Result<(Box<dyn DialectAdapter>, RedactedEndpoint, Vec<String>)> {
    bail!("this build has no live database support; rebuild with the live-pool feature")
}

fn sqlite_endpoint(path: &Path) -> RedactedEndpoint {
    RedactedEndpoint {
        dialect: Dialect::Sqlite,
        host: String::new(),
        port: 0,
        database: path.display().to_string(),
        user: String::new(),
    }
}
