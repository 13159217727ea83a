//! Send an SMS through the Calisero gateway.
//!
//! ```bash
//! CALISERO_API_KEY=... cargo run --example send_sms -- --to +40712345678 --text "Hello"
//! ```

use std::sync::Arc;

use anyhow::Context;
use calisero_kit::prelude::*;
use calisero_kit::telemetry::init_telemetry;
use clap::Parser;

#[derive(Parser)]
struct Args {
    /// Recipient in E.164 format
    #[arg(long)]
    to: String,
    /// Sender ID
    #[arg(long)]
    from: Option<String>,
    #[arg(long, default_value = "Hello from Calisero")]
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    init_telemetry(&config.logging);

    let client = CaliseroClient::with_options(config.client_options()?)?;
    let gateway = Calisero::new(Arc::new(client), config.gateway_settings());

    let mut params = SendSmsParams::new(args.to, args.text);
    if let Some(from) = args.from {
        params = params.from(from);
    }
    let response = gateway.send_sms(params).await?;

    let message = response.data();
    println!("Sent {} to {} ({})", message.id, message.recipient, message.status);
    println!("{}", serde_json::to_string_pretty(message)?);
    Ok(())
}
