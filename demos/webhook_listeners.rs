//! Serve the delivery-report webhook and react to each event.
//!
//! ```bash
//! CALISERO_WEBHOOK__ENABLED=true CALISERO_WEBHOOK__SECRET=... cargo run --example webhook_listeners
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use calisero_kit::prelude::*;
use calisero_kit::telemetry::init_telemetry;
use calisero_web_axum::webhook_router;

fn on_event(event: &WebhookEvent) {
    match event {
        WebhookEvent::MessageSent(report) => {
            println!("sent: {}", report.message_id().unwrap_or("?"));
        }
        WebhookEvent::MessageDelivered(report) => {
            println!(
                "delivered: {} to {}",
                report.message_id().unwrap_or("?"),
                report.recipient().unwrap_or("?")
            );
        }
        WebhookEvent::MessageFailed(report) => {
            eprintln!("failed: {}", report.message_id().unwrap_or("?"));
        }
        WebhookEvent::CreditLow { remaining_balance } => {
            println!("credit is running low: {remaining_balance}");
        }
        WebhookEvent::CreditCritical { remaining_balance } => {
            eprintln!("top up now, only {remaining_balance} left");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_telemetry(&config.logging);

    let events = EventBus::new().with(Arc::new(on_event));
    let app = webhook_router(&config.webhook.path, config.webhook_processor(events));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}/{}", addr, config.webhook.path.trim_start_matches('/'));

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
