use std::process::ExitCode;

use calisero_kit::cli::AppArgs;
use calisero_kit::config::AppConfig;
use calisero_kit::telemetry::init_telemetry;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = AppArgs::parse();
    let config = AppConfig::load()?;

    init_telemetry(&config.logging);

    args.run(&config).await
}
