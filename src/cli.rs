use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use calisero_client::CaliseroClient;
use calisero_core::{EventBus, TracingListener};
use calisero_web_axum::{webhook_router, MountedRoute};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::commands::{self, Console};
use crate::config::AppConfig;
use crate::gateway::{Calisero, SmsGateway};
use crate::params::{VerificationCheckParams, VerificationParams};

#[derive(Args, Debug, Clone)]
pub struct SmsTestArgs {
    /// Recipient in E.164 form
    pub to: String,
    /// Sender ID
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long, default_value = "Hello from Calisero")]
    pub text: String,
}

#[derive(Args, Debug, Clone)]
pub struct SmsStatusArgs {
    /// Message ID
    pub id: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SmsAction {
    /// Send a test SMS
    Test(SmsTestArgs),
    /// Show the status of a sent message
    Status(SmsStatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct VerificationSendArgs {
    /// Phone number in E.164 form
    pub to: String,
    #[arg(long)]
    pub brand: Option<String>,
    /// Template containing `{code}`
    #[arg(long)]
    pub template: Option<String>,
    /// Minutes until the code expires
    #[arg(long)]
    pub expires_in: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct VerificationCheckArgs {
    pub to: String,
    pub code: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum VerificationAction {
    /// Send a verification code
    Send(VerificationSendArgs),
    /// Check a verification code
    Check(VerificationCheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WebhookVerifyArgs {
    /// Hex HMAC-SHA256 signature to check
    pub signature: String,
    /// Raw request body
    #[arg(long, default_value = "{}")]
    pub payload: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum WebhookAction {
    /// Check a webhook signature against the configured secret
    Verify(WebhookVerifyArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum Action {
    #[command(subcommand)]
    Sms(SmsAction),
    #[command(subcommand)]
    Verification(VerificationAction),
    #[command(subcommand)]
    Webhook(WebhookAction),
    /// Show the remaining account credit
    Balance,
    /// Serve the delivery-report webhook
    Serve,
}

/// Calisero SMS operator tool
#[derive(Parser, Debug)]
#[command(name = "calisero", version, about, long_about = None)]
pub struct AppArgs {
    #[command(subcommand)]
    pub action: Action,
}

impl AppArgs {
    pub async fn run(&self, config: &AppConfig) -> anyhow::Result<ExitCode> {
        let mut console = Console::stdio();

        let code = match &self.action {
            Action::Webhook(WebhookAction::Verify(args)) => commands::verify_webhook(
                &mut console,
                config.webhook.secret.as_deref(),
                &args.signature,
                &args.payload,
            )?,
            Action::Serve => return serve(config).await,
            Action::Sms(SmsAction::Test(args)) => {
                let gateway = gateway(config)?;
                commands::send_test_sms(
                    &mut console,
                    gateway.as_ref(),
                    &args.to,
                    args.from.as_deref(),
                    &args.text,
                )
                .await?
            }
            Action::Sms(SmsAction::Status(args)) => {
                let gateway = gateway(config)?;
                commands::sms_status(&mut console, gateway.as_ref(), &args.id).await?
            }
            Action::Verification(VerificationAction::Send(args)) => {
                let gateway = gateway(config)?;
                let params = VerificationParams {
                    to: args.to.clone(),
                    brand: args.brand.clone(),
                    template: args.template.clone(),
                    expires_in: args.expires_in,
                };
                commands::send_verification(&mut console, gateway.as_ref(), params).await?
            }
            Action::Verification(VerificationAction::Check(args)) => {
                let gateway = gateway(config)?;
                let params = VerificationCheckParams::new(&args.to, &args.code);
                commands::check_verification(&mut console, gateway.as_ref(), params).await?
            }
            Action::Balance => {
                let gateway = gateway(config)?;
                commands::balance(&mut console, gateway.as_ref()).await?
            }
        };

        Ok(code)
    }
}

/// Gateway over the HTTP client, with callback URLs pointing at this deployment.
pub fn gateway(config: &AppConfig) -> anyhow::Result<Arc<dyn SmsGateway>> {
    let client = CaliseroClient::with_options(config.client_options()?)?;
    let route = MountedRoute::new(config.app_url.as_str(), &config.webhook.path);
    let gateway = Calisero::new(Arc::new(client), config.gateway_settings()).with_route(Arc::new(route));
    Ok(Arc::new(gateway))
}

async fn serve(config: &AppConfig) -> anyhow::Result<ExitCode> {
    if !config.webhook.enabled {
        anyhow::bail!("webhook is disabled; set CALISERO_WEBHOOK__ENABLED=true to serve it");
    }

    let events = EventBus::new().with(Arc::new(TracingListener));
    let processor = config.webhook_processor(events);
    let app = webhook_router(&config.webhook.path, processor);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host/server.port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    if config.webhook.secret.as_deref().is_none_or(str::is_empty) {
        warn!("webhook secret is not set; signed requests will be rejected with 500");
    }
    info!(%addr, path = %config.webhook.path, guards = ?config.webhook_guards(), "webhook listener started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(ExitCode::SUCCESS)
}
