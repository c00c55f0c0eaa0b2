//! Schema Compare CLI
//!
//! Compares the configured source and destination databases and writes a
//! reconciling DDL script for each side that differs. Nothing is executed
//! against either database; the scripts are meant for review.

use clap::Parser;
use schema_compare::config::Settings;
use schema_compare::script::ScriptEmitter;
use schema_compare::{Comparison, ComparisonReport, ConnectionLabel, MySqlCatalog};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Compare two MySQL / MariaDB schemas and generate DDL for both sides.
#[derive(Parser)]
#[command(name = "schema-compare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory for generated scripts (overrides COMPAREDB_OUTPUT_DIR).
    #[arg(short, long, env = "COMPAREDB_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Print the scripts instead of writing them.
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "COMPAREDB_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so env-backed flags see it
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    info!("🚀 Starting schema comparison...");

    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let (source, destination) = tokio::try_join!(
        MySqlCatalog::connect(
            ConnectionLabel::Source,
            settings.source.to_params(),
            settings.max_connections,
        ),
        MySqlCatalog::connect(
            ConnectionLabel::Destination,
            settings.destination.to_params(),
            settings.max_connections,
        ),
    )
    .inspect_err(|e| error!("❌ FATAL: {}", e))?;

    let emitter = ScriptEmitter::new(cli.output_dir.unwrap_or(settings.output.dir));
    let emitter = (!cli.dry_run).then_some(&emitter);

    let report = match Comparison::run(&source, &destination, emitter).await {
        Ok(report) => report,
        Err(e) => {
            error!("❌ Comparison failed during {}: {}", e.stage(), e);
            return Err(e.into());
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, cli.dry_run);
    }

    if report.persistence_failed() {
        warn!("⚠️  Some scripts could not be written; see the report above");
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "info,schema_compare=debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn print_summary(report: &ComparisonReport, dry_run: bool) {
    if !report.has_differences() {
        println!("Schemas match, nothing to generate.");
        return;
    }

    for connection in report.connections() {
        println!(
            "{} ({}): {} differences",
            connection.label,
            connection.database,
            connection.summary.total()
        );

        for (kind, count) in connection.summary.kinds() {
            if count.total() > 0 {
                println!(
                    "  {:<12} {} missing, {} different",
                    kind, count.missing, count.different
                );
            }
        }

        if let Some(script) = &connection.script {
            println!("  script: {}", script.display());
        }
        if let Some(err) = &connection.persistence_error {
            println!("  script not written: {}", err);
        }

        if dry_run && !connection.statements.is_empty() {
            println!();
            println!("{}", ScriptEmitter::render(&connection.statements));
            println!();
        }
    }
}
