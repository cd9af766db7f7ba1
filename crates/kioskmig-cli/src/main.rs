use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kioskmig_common::StepStatus;
use kioskmig_config::DbConfig;
use kioskmig_db::{RunLock, catalog, connection, inspect, runner};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kioskmig",
    version,
    about = "Schema migrations for the event-registration kiosk database"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending steps in declared order
    Run,
    /// List the step catalog
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show ledger and live-schema state for every step
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List tables in the target database with row counts
    Tables {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check connectivity to the target database
    Ping,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match dispatch() {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = kioskmig_config::from_env()?;

    match cli.command {
        Command::Run => cmd_run(&config),
        Command::List { json } => cmd_list(json),
        Command::Status { json } => cmd_status(&config, json),
        Command::Tables { json } => cmd_tables(&config, json),
        Command::Ping => cmd_ping(&config),
    }
}

fn cmd_run(config: &DbConfig) -> anyhow::Result<ExitCode> {
    // Held for the whole run; released on every exit path when dropped.
    let _lock = RunLock::acquire(Path::new(&config.database))?;

    let mut conn = connection::open(config)?;
    let steps = catalog();
    let report = runner::run(&mut conn, &steps)?;

    for outcome in &report.outcomes {
        println!("  {:<28} {}", outcome.name, describe(&outcome.status));
    }

    match report.failed() {
        None => {
            println!(
                "\n{} applied, {} skipped",
                report.recorded_count(),
                report.skipped_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Some((index, _)) => {
            if let Some(err) = report.failure() {
                eprintln!("\nerror: step {index}: {err}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_list(json: bool) -> anyhow::Result<ExitCode> {
    let steps = catalog();

    if json {
        let items: Vec<_> = steps
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name(),
                    "description": s.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (index, step) in steps.iter().enumerate() {
            println!("  {index}. {:<28} {}", step.name(), step.description());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_status(config: &DbConfig, json: bool) -> anyhow::Result<ExitCode> {
    let conn = connection::open(config)?;
    let rows = runner::status(&conn, &catalog())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("  {:<28} {:<22} {}", "step", "recorded at", "live check");
    for row in &rows {
        let recorded = row
            .recorded_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let live = match row.applied_live {
            Some(true) => "applied",
            Some(false) => "pending",
            None => "unknown",
        };
        println!("  {:<28} {recorded:<22} {live}", row.name);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_tables(config: &DbConfig, json: bool) -> anyhow::Result<ExitCode> {
    let conn = connection::open(config)?;
    let tables = inspect::list_tables(&conn).context("failed to list tables")?;

    if json {
        let mut items = Vec::new();
        for table in &tables {
            let rows = inspect::row_count(&conn, table)
                .with_context(|| format!("failed to count rows in {table}"))?;
            items.push(serde_json::json!({ "name": table, "rows": rows }));
        }
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(ExitCode::SUCCESS);
    }

    for table in &tables {
        let rows = inspect::row_count(&conn, table)
            .with_context(|| format!("failed to count rows in {table}"))?;
        println!("  {table:<28} {rows} rows");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_ping(config: &DbConfig) -> anyhow::Result<ExitCode> {
    let conn = connection::open(config)?;
    connection::ping(&conn)?;
    println!("ok: {}", config.database);
    Ok(ExitCode::SUCCESS)
}

fn describe(status: &StepStatus) -> String {
    match status {
        StepStatus::Skipped => "skipped".to_string(),
        StepStatus::Recorded {
            rows_backfilled: Some(rows),
        } => format!("applied ({rows} rows backfilled)"),
        StepStatus::Recorded {
            rows_backfilled: None,
        } => "applied".to_string(),
        StepStatus::CheckFailed { .. } => "check failed".to_string(),
        StepStatus::ApplyFailed { .. } => "apply failed".to_string(),
        StepStatus::BackfillFailed { .. } => "backfill failed".to_string(),
    }
}
