//! # Calisero Kit
//!
//! Calisero SMS integration for Rust services.
//!
//! ## Features
//!
//! - **Gateway facade**: [`gateway::SmsGateway`] sends SMS, checks delivery status,
//!   runs phone verifications and reads the account balance
//! - **Callback URLs**: outgoing messages point their delivery reports at this
//!   deployment's webhook, with the shared token appended
//! - **Webhook processing**: signature and token guards, typed payloads, status
//!   events and low/critical credit alerts
//! - **Notifications**: an SMS channel for application notifications
//! - **Operator CLI**: the `calisero` binary
//! - **Configuration**: layered files and `CALISERO_*` environment variables
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use calisero_kit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = CaliseroClient::with_options(config.client_options()?)?;
//!     let gateway = Calisero::new(Arc::new(client), config.gateway_settings());
//!
//!     let response = gateway
//!         .send_sms(SendSmsParams::new("+40712345678", "Hello from Calisero"))
//!         .await?;
//!
//!     println!("Message sent with ID: {}", response.data().id);
//!     Ok(())
//! }
//! ```
//!
//! ## Webhooks
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use calisero_kit::prelude::*;
//!
//! let events = EventBus::new().with(Arc::new(|event: &WebhookEvent| {
//!     if let WebhookEvent::CreditCritical { remaining_balance } = event {
//!         eprintln!("top up now: {remaining_balance} left");
//!     }
//! }));
//! let app = calisero_web_axum::webhook_router(
//!     &config.webhook.path,
//!     config.webhook_processor(events),
//! );
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod notification;
pub mod params;
pub mod telemetry;

pub use config::*;

/// Common imports for Calisero Kit usage
pub mod prelude {
    pub use crate::config::{AppConfig, CreditConfig, LoggingConfig, ServerConfig, WebhookConfig};
    pub use crate::gateway::{Calisero, GatewaySettings, SmsGateway};
    pub use crate::notification::{Notifiable, SmsChannel, SmsMessage, SmsNotification};
    pub use crate::params::{SendSmsParams, VerificationCheckParams, VerificationParams};
    pub use calisero_client::{CaliseroClient, ClientOptions};
    pub use calisero_core::*;
    pub use calisero_webhook::{CreditThresholds, WebhookProcessor};
}
