mod config;
mod telemetry;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use shared::metrics_defs::describe_all;
use std::path::PathBuf;
use std::process::ExitCode;
use telemetry::TelemetryError;

#[derive(Parser)]
#[command(version, about = "Correlated queue extraction services")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the extraction API
    Extractor,
    /// Serve the endpoint that receives notifications
    NotificationSink,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("config has no `{0}` section")]
    MissingSection(&'static str),
    #[error("invalid extractor config: {0}")]
    InvalidExtractorConfig(#[from] extractor::config::ValidationError),
    #[error("invalid notification sink config: {0}")]
    InvalidSinkConfig(#[from] notification_sink::config::ValidationError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Extractor(#[from] extractor::ExtractorError),
    #[error(transparent)]
    NotificationSink(#[from] notification_sink::SinkError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be up yet if the config failed to load
            eprintln!("error: {e}");
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_file(&cli.config)?;
    let _telemetry = telemetry::init(&config.common)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        CliCommand::Extractor => {
            let extractor_config = config
                .extractor
                .ok_or(CliError::MissingSection("extractor"))?;
            extractor_config.validate()?;
            describe_all(extractor::metrics_defs::ALL_METRICS);

            tracing::info!("Starting extractor");
            rt.block_on(extractor::run(extractor_config))?;
        }
        CliCommand::NotificationSink => {
            let sink_config = config
                .notification_sink
                .ok_or(CliError::MissingSection("notification_sink"))?;
            sink_config.validate()?;

            tracing::info!("Starting notification sink");
            rt.block_on(notification_sink::run(sink_config))?;
        }
    }

    Ok(())
}
