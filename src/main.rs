use clap::Parser;
use hoststat::{get_status, OutputFormat, PrivacyLevel, StatusConfig, StatusService};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Prints a one-shot status report for this host.
#[derive(Parser, Debug)]
#[command(name = "hoststat", about = "Host status report")]
struct Args {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bypass the snapshot cache.
    #[arg(short, long)]
    refresh: bool,

    /// Overrides `privacy_level` from the configuration.
    #[arg(short, long, value_enum)]
    privacy: Option<PrivacyLevel>,

    /// Overrides `output_format` from the configuration.
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match StatusConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("No config file given, using defaults");
            StatusConfig::default()
        }
    };
    if let Some(format) = args.format {
        config.output_format = format;
    }

    let service = StatusService::new(config);
    let privacy = args.privacy.unwrap_or_else(|| service.default_privacy());

    match get_status(&service, args.refresh, privacy).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Unable to read server status: {}", e);
            ExitCode::FAILURE
        }
    }
}
