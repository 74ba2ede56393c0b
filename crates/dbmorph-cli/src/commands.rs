//! Subcommand handlers

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};

use dbmorph_core::{MorphError, Schema, snapshot};
use dbmorph_driver_mysql::{ExtractOptions, MySqlConnection};
use dbmorph_schema_tools::{
    MigrationPlanner, apply_plan_with_progress, check_schema, compare, simulate_with,
    structural_warnings,
};

use crate::EXIT_BLOCKED;
use crate::config::DbmorphConfig;
use crate::output::{plan_summary, print_warnings};

/// Where a schema comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Snapshot(PathBuf),
    Database(String),
}

impl SchemaSource {
    /// `*.json` arguments and existing files are snapshots, anything else
    /// is a connection string
    pub fn parse(arg: &str) -> Self {
        let path = Path::new(arg);
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json || path.is_file() {
            SchemaSource::Snapshot(path.to_path_buf())
        } else {
            SchemaSource::Database(arg.to_string())
        }
    }

    pub async fn load(&self, options: &ExtractOptions) -> Result<Schema> {
        match self {
            SchemaSource::Snapshot(path) => snapshot::load(path)
                .with_context(|| format!("Failed to load snapshot {:?}", path)),
            SchemaSource::Database(url) => {
                let connection = MySqlConnection::connect(url).await?;
                let schema = connection.extract_schema(options).await?;
                connection.disconnect().await?;
                Ok(schema)
            }
        }
    }
}

/// Output target: a file path, or stdout when absent
fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub async fn export(config: &DbmorphConfig, connection: &str, output: Option<&Path>) -> Result<ExitCode> {
    let options = config.compare.to_extract_options();
    let connection = MySqlConnection::connect(connection).await?;
    let schema = connection.extract_schema(&options).await?;
    connection.disconnect().await?;

    print_warnings(&structural_warnings(&schema));

    let mut json = snapshot::to_json(&schema)?;
    json.push('\n');
    write_output(output, &json)?;
    Ok(ExitCode::SUCCESS)
}

pub fn validate(config: &DbmorphConfig, path: &Path) -> Result<ExitCode> {
    let schema = snapshot::load(path).with_context(|| format!("Failed to load snapshot {:?}", path))?;
    check_schema(&schema, config.compare.case_sensitive)?;

    let warnings = structural_warnings(&schema);
    print_warnings(&warnings);
    println!(
        "{}: {} entities, {} warning(s)",
        path.display(),
        schema.entity_count(),
        warnings.len()
    );
    Ok(ExitCode::SUCCESS)
}

pub async fn plan(
    config: &DbmorphConfig,
    source: &SchemaSource,
    destination: &SchemaSource,
    force: bool,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let extract = config.compare.to_extract_options();
    let source = source.load(&extract).await.context("Failed to read source schema")?;
    let destination = destination
        .load(&extract)
        .await
        .context("Failed to read destination schema")?;

    let edits = compare(&source, &destination, &config.compare.to_options())?;
    let migration = config.migration.to_config();
    let plan = MigrationPlanner::with_config(migration.clone()).plan(&edits);

    print_warnings(&plan.warnings());
    eprintln!("{}", plan_summary(&plan));
    write_output(output, &plan.to_script(&migration))?;

    if plan.is_blocked(force) {
        eprintln!("Plan is blocked by warnings; review them and rerun with --force to override");
        return Ok(ExitCode::from(EXIT_BLOCKED));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn migrate(
    config: &DbmorphConfig,
    source: &SchemaSource,
    destination: &str,
    execute: bool,
    force: bool,
) -> Result<ExitCode> {
    let SchemaSource::Database(url) = SchemaSource::parse(destination) else {
        bail!("migrate needs a connection string as destination, got {:?}", destination);
    };

    let extract = config.compare.to_extract_options();
    let source = source.load(&extract).await.context("Failed to read source schema")?;
    let connection = MySqlConnection::connect(&url).await?;
    let current = connection.extract_schema(&extract).await?;

    let edits = compare(&source, &current, &config.compare.to_options())?;
    let plan = MigrationPlanner::with_config(config.migration.to_config()).plan(&edits);

    print_warnings(&plan.warnings());
    eprintln!("{}", plan_summary(&plan));

    if plan.is_empty() {
        connection.disconnect().await?;
        return Ok(ExitCode::SUCCESS);
    }

    if !execute {
        simulate_with(&current, &plan, config.compare.case_sensitive)
            .context("Dry run failed")?;
        for (index, step) in plan.steps().iter().enumerate() {
            println!("[{}/{}] {}", index + 1, plan.len(), step.description);
        }
        eprintln!("Dry run only; pass --execute to apply");
        connection.disconnect().await?;
        return Ok(if plan.is_blocked(force) {
            ExitCode::from(EXIT_BLOCKED)
        } else {
            ExitCode::SUCCESS
        });
    }

    let total = plan.len();
    let result = apply_plan_with_progress(&connection, &plan, force, |index, step| {
        println!("[{}/{}] {}", index + 1, total, step.description);
    })
    .await;
    connection.disconnect().await?;

    match result {
        Ok(report) => {
            println!("Applied {} step(s)", report.executed);
            Ok(ExitCode::SUCCESS)
        }
        Err(MorphError::Execution(failure)) => {
            eprintln!("Failed statement:\n{}", failure.statement);
            Err(MorphError::Execution(failure).into())
        }
        Err(err) => Err(err.into()),
    }
}
