//! Scrutiny ETL - Main entry point

use clap::Parser;
use scrutiny_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use scrutiny_common::worker;
use scrutiny_etl::{Cli, Commands, EtlConfig, NewsEtl};
use std::process;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        },
        output: LogOutput::Console,
        log_file_prefix: "scrutiny-etl".to_string(),
        ..LogConfig::default()
    };

    // Environment variables take precedence
    let log_config = match log_config.merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {e}");
            process::exit(2);
        },
    };
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e}");
            process::exit(2);
        },
    };

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

    if let Err(e) = execute_command(&cli, &cancel).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn execute_command(cli: &Cli, cancel: &CancellationToken) -> anyhow::Result<()> {
    match cli.command {
        Commands::News {
            once,
            interval_secs,
        } => {
            let mut job = NewsEtl::from_config(EtlConfig::from_env()?)?;

            if once {
                worker::run(&mut job, cancel).await?;
                return Ok(());
            }

            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs, "Scheduling news ETL");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {},
                }

                // A failed pass is retried on the next tick
                if let Err(e) = worker::run(&mut job, cancel).await {
                    error!(job = %e.worker(), error = %e, "ETL pass failed");
                }
            }

            info!("News ETL stopped");
            Ok(())
        },
    }
}

async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, shutting down");
            cancel.cancel();
        },
        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
    }
}
