//! Service Availability Checker Binary

use availability_checker::{CheckerError, Config, PeriodicChecker, Result, ServiceChecker};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "availability_checker", version, about = "Monitor the availability of HTTP services")]
struct Cli {
    /// JSON services file
    #[arg(short, long, env = "SERVICES_FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every service once and print the report
    Check,

    /// Check every service periodically until interrupted
    Watch,

    /// Show the monitored services without checking them
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    initialize_tracing(config.json_logs);

    info!("Starting Availability Checker v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Monitoring {} services - timeout: {}s, max connections: {}, interval: {}s",
        config.services.len(),
        config.timeout.as_secs(),
        config.max_connections,
        config.check_interval.as_secs()
    );

    let checker = Arc::new(ServiceChecker::from_config(&config)?);

    match cli.command {
        Command::Check => {
            let report = checker.report().await;
            info!(
                "Manual check completed - {}/{} services up",
                report.summary.up, report.summary.total_services
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Watch => {
            let mut driver = PeriodicChecker::new(Arc::clone(&checker), config.check_interval);
            driver.start()?;

            tokio::signal::ctrl_c().await.map_err(|e| {
                CheckerError::Other(format!("Failed to wait for shutdown signal: {}", e))
            })?;

            info!("Shutting down periodic checks");
            driver.stop().await?;

            let summary = checker.summary().await;
            info!(
                "Final status - {}/{} services up",
                summary.up, summary.total_services
            );
        }
        Command::Status => {
            let status = serde_json::json!({
                "service": "availability-checker",
                "version": env!("CARGO_PKG_VERSION"),
                "monitored_services": config.services.iter().map(|s| &s.name).collect::<Vec<_>>(),
                "check_interval": config.check_interval.as_secs(),
                "timeout": config.timeout.as_secs(),
                "max_connections": config.max_connections,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

/// Initialize structured logging
fn initialize_tracing(json: bool) {
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}
