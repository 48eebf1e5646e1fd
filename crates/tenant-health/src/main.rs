//! Tenant health CLI.
//!
//! Polls the platform database and deployed service endpoints and
//! reports tenant isolation, capacity utilization, and service health.
//! Exit code 0 means production ready / all healthy; 1 means a
//! violation, an exceeded limit, or a check-level failure.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use tenant_health::config::HealthConfig;
use tenant_health::evaluator::Evaluator;
use tenant_health::postgres::PgRowSource;
use tenant_health::report;
use tenant_health::services::ServiceProber;
use tenant_health::source::RowSource;
use tenant_health::{isolation, IsolationViolation};

/// Tenant isolation and capacity health checks for the platform
#[derive(Parser)]
#[command(name = "tenant-health")]
#[command(about = "Tenant isolation and capacity health checks for the platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (json or text)
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Path to tenant-health.json
    #[arg(long, default_value = "tenant-health.json", global = true)]
    config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    Json,
    #[default]
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pass: isolation check plus capacity classification
    Check,
    /// Isolation check only
    Isolation,
    /// Capacity classification only
    Capacity,
    /// Probe configured service endpoints
    Services,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("tenant_health=debug")
            .init();
    }

    let config = HealthConfig::load(&cli.config)?;
    debug!(config_path = %cli.config, "configuration loaded");

    let code = match cli.command {
        Commands::Check => run_check(&config, cli.format).await?,
        Commands::Isolation => run_isolation(&config, cli.format).await?,
        Commands::Capacity => run_capacity(&config, cli.format).await?,
        Commands::Services => run_services(&config, cli.format).await?,
    };

    std::process::exit(code);
}

/// Connect to the row source, retrying per the configured policy.
async fn connect(config: &HealthConfig) -> Result<PgRowSource> {
    config
        .retry
        .policy()
        .run("database connect", || {
            PgRowSource::connect(&config.database)
        })
        .await
        .context("Row source unreachable after retries")
}

async fn run_check(config: &HealthConfig, format: OutputFormat) -> Result<i32> {
    let source = connect(config).await?;
    let evaluator = Evaluator::new(
        config.evaluation.thresholds,
        config.evaluation.usage_window_days,
    );

    let report = evaluator.run(&source).await?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", report::render_evaluation_text(&report)),
    }
    Ok(report::evaluation_exit_code(&report))
}

async fn run_isolation(config: &HealthConfig, format: OutputFormat) -> Result<i32> {
    let source = connect(config).await?;
    let violations = isolation::normalize(source.find_isolation_violations().await?);

    match format {
        OutputFormat::Json => print_json(&violations)?,
        OutputFormat::Text => print_violations(&violations),
    }
    Ok(i32::from(!violations.is_empty()))
}

async fn run_capacity(config: &HealthConfig, format: OutputFormat) -> Result<i32> {
    let source = connect(config).await?;
    let evaluator = Evaluator::new(
        config.evaluation.thresholds,
        config.evaluation.usage_window_days,
    );

    let pass = evaluator.capacity_pass(&source).await?;
    match format {
        OutputFormat::Json => print_json(&pass)?,
        OutputFormat::Text => print!("{}", report::render_capacity_text(&pass)),
    }
    Ok(i32::from(pass.any_exceeded() || !pass.check_failures.is_empty()))
}

async fn run_services(config: &HealthConfig, format: OutputFormat) -> Result<i32> {
    if config.services.is_empty() {
        println!("{}", "no services configured".dimmed());
        return Ok(0);
    }

    let prober = ServiceProber::new(Duration::from_secs(config.evaluation.probe_timeout_secs));
    let report = prober.probe_all(&config.services).await;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", report::render_services_text(&report)),
    }
    Ok(report::services_exit_code(&report))
}

fn print_violations(violations: &[IsolationViolation]) {
    if violations.is_empty() {
        println!("{}", "no violations".green());
        return;
    }
    for violation in violations {
        println!(
            "{} tenant {} {} x{}",
            "CRITICAL".red().bold(),
            violation.tenant_id,
            violation.kind.as_str(),
            violation.count,
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
